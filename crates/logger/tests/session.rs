//! Session lifecycle against a real log directory

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tracing_test::traced_test;
use trail_logger::{
    CallSite, LineFormat, LogSession, MessageFormatter, Serializable, SessionConfig, Severity,
};

fn session_in(dir: &Path) -> LogSession {
    LogSession::new(SessionConfig {
        log_directory: dir.to_path_buf(),
        file_name: "test".into(),
        ..SessionConfig::default()
    })
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

#[tokio::test]
async fn test_error_is_persisted_and_stop_ends_writes() {
    let dir = tempdir().unwrap();
    let session = session_in(dir.path());

    session.start().unwrap();
    assert!(session.is_running());
    session.log("disk full", Severity::Error, None, None);
    session.stop().await;
    assert!(!session.is_running());

    let path = dir.path().join("test.log");
    assert_eq!(session.log_file_path(), path);
    let content = read(&path);
    assert_eq!(content.lines().count(), 1);
    assert!(content.starts_with("Error: "));
    assert!(content.contains("disk full"));

    session.log("after stop", Severity::Error, None, None);
    assert_eq!(read(&path), content);
}

#[tokio::test]
async fn test_information_needs_dump() {
    let dir = tempdir().unwrap();
    let session = session_in(dir.path());
    let path = session.log_file_path().to_path_buf();

    session.start().unwrap();
    session.information("not yet");
    session.warning("also not yet");
    session.stop().await;

    assert!(!read(&path).contains("not yet"));
    assert_eq!(session.recent_messages().len(), 2);
}

#[tokio::test]
async fn test_dump_flushes_history_and_forces_later_lines() {
    let dir = tempdir().unwrap();
    let session = session_in(dir.path());
    let path = session.log_file_path().to_path_buf();

    session.start().unwrap();
    session.information("before dump");
    session.error("persisted anyway");
    session.create_dump().await;
    assert!(session.is_dump_active());
    session.information("during dump");
    session.reset_dump();
    session.information("after reset");
    session.stop().await;

    let content = read(&path);
    assert_eq!(content.matches("persisted anyway").count(), 1);
    assert!(content.contains("before dump"));
    assert!(content.contains("during dump"));
    assert!(!content.contains("after reset"));
}

#[tokio::test]
async fn test_dump_after_stop_writes_buffer() {
    let dir = tempdir().unwrap();
    let session = session_in(dir.path());
    let path = session.log_file_path().to_path_buf();

    session.start().unwrap();
    session.information("kept in memory");
    session.stop().await;
    assert!(!read(&path).contains("kept in memory"));

    session.create_dump().await;
    assert!(read(&path).contains("Information: "));
    assert!(read(&path).contains("kept in memory"));
}

#[tokio::test]
async fn test_verbose_persists_every_level_with_thread_id() {
    let dir = tempdir().unwrap();
    let session = LogSession::new(SessionConfig {
        log_directory: dir.path().to_path_buf(),
        file_name: "test".into(),
        verbose: true,
        ..SessionConfig::default()
    });
    let path = session.log_file_path().to_path_buf();

    session.start().unwrap();
    session.warning("careful");
    session.external("from plugin");
    session.set_verbose(false);
    session.information("quiet again");
    session.stop().await;

    let content = read(&path);
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Warning: "));
    assert!(lines[0].contains("careful , ThreadId: "));
    assert!(lines[1].starts_with("External Source: "));
}

#[tokio::test]
async fn test_payload_and_call_site_in_file() {
    #[derive(Serialize)]
    struct Request {
        id: u32,
    }

    let dir = tempdir().unwrap();
    let session = session_in(dir.path());
    let path = session.log_file_path().to_path_buf();
    let site = CallSite::new("handle", "src/server.rs", 12);

    session.start().unwrap();
    session.log_object("bad request", Severity::Error, &Request { id: 9 }, Some(&site));
    session.log_list("retries", Severity::Error, [1, 2], None);
    let mut map = BTreeMap::new();
    map.insert("attempts", 3);
    session.log_map("state", Severity::Error, map, None);
    session.stop().await;

    let content = read(&path);
    assert!(content.contains(
        "bad request\nObject:\n{\n  \"id\": 9\n}\nMethod: handle , Line Number: 12\nLocation: src/server.rs\n"
    ));
    assert!(content.contains("retries\nObject:\n1\n2\n"));
    assert!(content.contains("state\nObject:\nattempts : 3\n"));
}

#[tokio::test]
async fn test_recent_buffer_restarts_and_survives_stop() {
    let dir = tempdir().unwrap();
    let session = LogSession::new(SessionConfig {
        log_directory: dir.path().to_path_buf(),
        recent_capacity: 4,
        ..SessionConfig::default()
    });

    session.start().unwrap();
    for i in 0..5 {
        session.information(&format!("message {i}"));
    }
    session.stop().await;

    let recent = session.recent_messages();
    assert_eq!(recent.len(), 1);
    assert!(recent[0].ends_with("message 4"));

    session.start().unwrap();
    assert!(session.recent_messages().is_empty());
    session.stop().await;
}

#[tokio::test]
#[traced_test]
async fn test_delete_removes_file() {
    let dir = tempdir().unwrap();
    let session = session_in(dir.path());
    let path = session.log_file_path().to_path_buf();

    session.start().unwrap();
    session.error("to be deleted");
    session.delete().await;

    assert!(!session.is_running());
    assert!(!path.exists());

    // Nothing left to delete is not an error
    session.delete().await;
    assert!(logs_contain("no log file to delete"));
}

#[tokio::test]
#[traced_test]
async fn test_unwritable_directory_keeps_session_usable() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let session = session_in(&blocker);

    session.start().unwrap();
    session.error("lost line");
    session.stop().await;

    assert!(logs_contain("Failed to write log line"));
    assert_eq!(session.recent_messages().len(), 1);

    session.start().unwrap();
    assert!(session.is_running());
    session.stop().await;
}

#[test]
fn test_malformed_config_logs_to_defaults() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("debug.toml");
    std::fs::write(&config_path, "max_backup_count = \"ten\"").unwrap();

    let config = SessionConfig::load(&config_path);
    assert_eq!(config, SessionConfig::default());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers() {
    let dir = tempdir().unwrap();
    let session = Arc::new(session_in(dir.path()));
    let path = session.log_file_path().to_path_buf();
    session.start().unwrap();

    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                for seq in 0..100 {
                    session.error(&format!("producer {producer} line {seq}"));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    session.stop().await;

    let content = read(&path);
    assert_eq!(content.lines().count(), 400);
    for producer in 0..4 {
        let seqs: Vec<u32> = content
            .lines()
            .filter_map(|line| {
                line.split_once(&format!("producer {producer} line "))
                    .and_then(|(_, seq)| seq.parse().ok())
            })
            .collect();
        assert_eq!(seqs, (0..100).collect::<Vec<_>>());
    }
}

/// Rendered by hand; has no serde support.
struct Fingerprint([u8; 4]);

impl Serializable for Fingerprint {
    fn render_text(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
    }
}

#[tokio::test]
async fn test_custom_serializable_payload() {
    let dir = tempdir().unwrap();
    let session = session_in(dir.path());
    let path = session.log_file_path().to_path_buf();

    session.start().unwrap();
    session.log_object(
        "key rejected",
        Severity::Error,
        &Fingerprint([0xde, 0xad, 0xbe, 0xef]),
        None,
    );
    session.log_list("known keys", Severity::Error, [Fingerprint([1, 2, 3, 4])], None);
    session.stop().await;

    let content = read(&path);
    assert!(content.contains("key rejected\nObject:\nde:ad:be:ef\n"));
    assert!(content.contains("known keys\nObject:\n01:02:03:04\n"));
}

#[tokio::test]
#[traced_test]
async fn test_failed_delete_is_traced_and_session_stays_usable() {
    let dir = tempdir().unwrap();
    let session = session_in(dir.path());
    let path = session.log_file_path().to_path_buf();
    // A directory where the log file should be cannot be removed as a file.
    std::fs::create_dir_all(&path).unwrap();

    session.start().unwrap();
    session.delete().await;

    assert!(logs_contain("Could not delete log file"));
    assert!(!session.is_running());
    assert!(path.is_dir());

    session.start().unwrap();
    assert!(session.is_running());
    session.information("still logging");
    assert_eq!(session.recent_messages().len(), 1);
    session.stop().await;
}

#[tokio::test]
async fn test_custom_line_format() {
    let dir = tempdir().unwrap();
    let session = session_in(dir.path()).with_formatter(MessageFormatter::new(LineFormat {
        spacer: " | ".into(),
        timestamp_format: "%Y".into(),
        ..LineFormat::default()
    }));
    let path = session.log_file_path().to_path_buf();

    session.start().unwrap();
    session.error("disk full");
    session.stop().await;

    let year = chrono::Local::now().format("%Y").to_string();
    assert_eq!(read(&path), format!("Error: {year} | disk full\n"));
}
