use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("keepa").expect("Binary exists");
    cmd.arg("--help");
    cmd.assert().success().stdout(
        predicate::str::contains("run")
            .and(predicate::str::contains("upload"))
            .and(predicate::str::contains("retain")),
    );
}

#[test]
fn run_fails_for_missing_config() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("keepa").expect("Binary exists");
    cmd.arg("run")
        .arg("--config")
        .arg(dir.path().join("missing.toml"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn log_file_receives_output() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("logs.log");
    let mut cmd = Command::cargo_bin("keepa").expect("Binary exists");
    cmd.arg("--log-file")
        .arg(&log)
        .arg("upload")
        .arg("--config")
        .arg(dir.path().join("missing.toml"));
    cmd.assert().failure();

    let contents = std::fs::read_to_string(&log).expect("log file written");
    assert!(contents.contains("trace_initialised"));
    assert!(contents.contains("Failed to read config file"));
}

/// An empty config needs no network: nothing is uploaded or pruned.
#[test]
fn upload_with_no_entries_succeeds() {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        b"[client_settings]\nregion_name = \"us-east-1\"\naws_access_key_id = \"test\"\naws_secret_access_key = \"test\"\n",
    )
    .expect("Writing temp config failed");

    let mut cmd = Command::cargo_bin("keepa").expect("Binary exists");
    cmd.arg("upload").arg("--config").arg(config.path());
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Upload finished: 0 uploaded, 0 failed"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::Context, Layer, Registry};
use tracing_subscriber::prelude::*;

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let msg = format!("{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use keepa::cli::{run, Cli, Commands};

    let cli = Cli {
        log_file: None,
        command: Commands::Retain {
            config: std::path::PathBuf::from("dummy.toml"),
            bucket: None,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err(), "dummy config does not exist");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
