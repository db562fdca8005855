//! End-to-end apply tests against stubbed external collaborators
//!
//! The manifest's argv vectors point at shell stubs inside the test host, so
//! a full provisioning run executes without touching the real system.

mod common;

use common::TestHost;
use predicates::prelude::*;

/// Manifest wired to stub package manager and copy-based fetches
fn provisioned_host() -> TestHost {
    let host = TestHost::new();
    let install = host.stub_script(
        "pkg-install",
        &format!(
            "for p in \"$@\"; do touch {}/stubs/installed-\"$p\"; done",
            host.home.display()
        ),
    );
    let query = host.stub_script(
        "pkg-query",
        &format!("test -f {}/stubs/installed-\"$1\"", host.home.display()),
    );

    host.write_file("sources/runtime.tar.gz", "runtime-bytes");
    host.write_file("sources/en-voice.onnx", "voice-bytes");
    host.write_file("backup/config/settings.yaml", "wake_word: jarvis\n");
    host.write_file(
        "assistant/config/assistant.service",
        "\
[Unit]
Description=Voice assistant
After=sound.target

[Service]
User=pi
WorkingDirectory=/home/pi/assistant
ExecStart=/home/pi/assistant/run.sh
Restart=on-failure

[Install]
WantedBy=default.target
",
    );

    host.write_manifest(&format!(
        "\
packages:
  names: [alsa-utils, git]
  install: [{install}]
  query: [{query}]
audio:
  file: .asoundrc
  rules:
    - {{key: defaults.pcm.card, value: \"1\"}}
downloads:
  - id: runtime
    url: {home}/sources/runtime.tar.gz
    dest: assistant/runtime.tar.gz
    fatal: true
    fetch: [cp, '{{url}}', '{{dest}}']
toolchain:
  names: [python3]
  install: [{install}]
  query: [{query}]
voices:
  - id: en
    url: {home}/sources/en-voice.onnx
    dest: assistant/voices/en.onnx
    fetch: [cp, '{{url}}', '{{dest}}']
restore:
  to: assistant/config
env_file:
  file: assistant/.env
  rules:
    - {{key: TTS_SERVER, value: PIPER}}
    - {{key: VOICE, value: en}}
units:
  - name: assistant.service
    template: assistant/config/assistant.service
",
        home = host.home.display(),
    ));
    host
}

#[test]
fn test_full_apply_converges() {
    let host = provisioned_host();

    host.cmd()
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("+ base-packages"))
        .stdout(predicate::str::contains("+ env-file"))
        .stdout(predicate::str::contains("+ unit-assistant.service"));

    assert!(host.file_exists("stubs/installed-alsa-utils"));
    assert!(host.file_exists("stubs/installed-python3"));
    assert!(host.file_exists("assistant/runtime.tar.gz"));
    assert!(host.file_exists("assistant/voices/en.onnx"));
    assert_eq!(host.read_file(".asoundrc"), "defaults.pcm.card=1\n");
    assert_eq!(
        host.read_file("assistant/.env"),
        "TTS_SERVER=PIPER\nVOICE=en\n"
    );
    assert_eq!(
        host.read_file("assistant/config/settings.yaml"),
        "wake_word: jarvis\n"
    );

    let unit = host.read_file(".config/systemd/user/assistant.service");
    assert!(unit.contains("User=tester"));
    assert!(unit.contains(&format!(
        "WorkingDirectory={}/assistant",
        host.home.display()
    )));
    assert!(!unit.contains("/home/pi"));
    assert!(host.file_exists(".config/systemd/user/default.target.wants/assistant.service"));
}

#[test]
fn test_second_apply_is_a_noop() {
    let host = provisioned_host();
    host.cmd().arg("apply").assert().success();

    let env_before = host.read_file("assistant/.env");
    let unit_before = host.read_file(".config/systemd/user/assistant.service");

    host.cmd()
        .args(["apply", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"applied\": []"))
        .stdout(predicate::str::contains("\"fatal\": null"));

    assert_eq!(host.read_file("assistant/.env"), env_before);
    assert_eq!(
        host.read_file(".config/systemd/user/assistant.service"),
        unit_before
    );
}

#[test]
fn test_env_file_replace_preserves_position() {
    let host = provisioned_host();
    host.write_file(
        "assistant/.env",
        "LOG_LEVEL=info\nTTS_SERVER=OLD\nVOICE=en\n",
    );

    host.cmd().arg("apply").assert().success();

    assert_eq!(
        host.read_file("assistant/.env"),
        "LOG_LEVEL=info\nTTS_SERVER=PIPER\nVOICE=en\n"
    );
}

#[test]
fn test_fatal_download_failure_halts_run() {
    let host = TestHost::new();
    host.write_manifest(
        "\
downloads:
  - id: runtime
    url: /nonexistent/runtime.tar.gz
    dest: assistant/runtime.tar.gz
    fatal: true
    fetch: [cp, '{url}', '{dest}']
env_file:
  file: assistant/.env
  rules:
    - {key: TTS_SERVER, value: PIPER}
",
    );

    host.cmd()
        .arg("apply")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Fatal:"))
        .stdout(predicate::str::contains("download-runtime"));

    // The resource after the fatal one was never attempted
    assert!(!host.file_exists("assistant/.env"));
}

#[test]
fn test_non_fatal_download_failure_warns_and_continues() {
    let host = TestHost::new();
    host.write_manifest(
        "\
voices:
  - id: en
    url: /nonexistent/en.onnx
    dest: assistant/voices/en.onnx
    fetch: [cp, '{url}', '{dest}']
env_file:
  file: assistant/.env
  rules:
    - {key: TTS_SERVER, value: PIPER}
",
    );

    host.cmd()
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("warning(s):"))
        .stdout(predicate::str::contains("voice-en"));

    assert!(host.file_exists("assistant/.env"));
}

#[test]
fn test_driver_pending_reboot_is_warning_not_failure() {
    let host = TestHost::new();
    let install = host.stub_script("pkg-install", "exit 0");
    host.write_manifest(&format!(
        "\
driver:
  packages: [seeed-voicecard]
  install: [{install}]
  device: {}/dev-missing-card
",
        host.home.display()
    ));

    host.cmd()
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("warning(s):"))
        .stdout(predicate::str::contains("sound-driver"))
        .stdout(predicate::str::contains("did not converge"));
}

#[test]
fn test_readiness_timeout_is_warning() {
    let host = TestHost::new();
    host.write_manifest(
        "\
env_file:
  file: assistant/.env
  rules:
    - {key: TTS_SERVER, value: PIPER}
readiness:
  command: [\"false\"]
  interval_ms: 10
  attempts: 3
",
    );

    host.cmd()
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("service-ready"))
        .stdout(predicate::str::contains("not ready after 3 probes"));
}

#[test]
fn test_readiness_success_produces_no_warning() {
    let host = TestHost::new();
    host.write_manifest(
        "\
readiness:
  command: [\"true\"]
  interval_ms: 10
  attempts: 3
",
    );

    host.cmd()
        .arg("apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("warning").not());
}

#[test]
fn test_dry_run_mutates_nothing() {
    let host = provisioned_host();

    host.cmd()
        .args(["apply", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would apply"))
        .stdout(predicate::str::contains("env-file"));

    assert!(!host.file_exists("assistant/.env"));
    assert!(!host.file_exists("stubs/installed-alsa-utils"));
    assert!(!host.file_exists(".config/systemd/user/assistant.service"));
}

#[test]
fn test_json_summary_lists_applied_resources() {
    let host = TestHost::new();
    host.write_manifest(
        "\
env_file:
  file: assistant/.env
  rules:
    - {key: TTS_SERVER, value: PIPER}
",
    );

    host.cmd()
        .args(["apply", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"env-file\""))
        .stdout(predicate::str::contains("\"warnings\": []"));
}
