//! Structured log contract: event names and fields emitted by the library.

use serde_json::Value;
use sqlgate_core::{ActionCode, AuthRequest, Config, Decision, GuardedConnection};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone)]
struct MockWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl std::io::Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for MockWriter {
    type Writer = MockWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn setup_capture() -> (MockWriter, tracing::subscriber::DefaultGuard) {
    let writer = MockWriter {
        buf: Arc::new(Mutex::new(Vec::new())),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_max_level(tracing::Level::DEBUG)
        .json()
        .finish();
    (writer, tracing::subscriber::set_default(subscriber))
}

/// Parsed lines whose `fields.event` equals `event`.
fn events(writer: &MockWriter, event: &str) -> Vec<Value> {
    let buf = writer.buf.lock().unwrap();
    String::from_utf8_lossy(&buf)
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter(|v| v["fields"]["event"] == event)
        .collect()
}

#[test]
fn test_panic_is_logged_as_error() {
    let (writer, _guard) = setup_capture();
    let mut conn = GuardedConnection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE t(x)").unwrap();
    conn.set_authorizer(Some(|req: &AuthRequest<'_>| {
        if req.action == ActionCode::Read {
            panic!("rules not loaded");
        }
        Decision::Allow
    }))
    .unwrap();
    assert!(conn.check("SELECT x FROM t").is_err());

    let logged = events(&writer, "authorizer_panicked");
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0]["level"], "ERROR");
    assert_eq!(logged[0]["fields"]["action"], "read");
    assert_eq!(logged[0]["fields"]["panic"], "rules not loaded");
}

#[test]
fn test_denied_statement_is_logged_with_sql() {
    let (writer, _guard) = setup_capture();
    let mut conn = GuardedConnection::open_in_memory().unwrap();
    conn.set_authorizer(Some(|req: &AuthRequest<'_>| {
        if req.action == ActionCode::Pragma {
            Decision::Deny
        } else {
            Decision::Allow
        }
    }))
    .unwrap();
    assert!(conn.check("PRAGMA user_version").unwrap_err().is_denied());

    let logged = events(&writer, "statement_denied");
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0]["level"], "INFO");
    assert_eq!(logged[0]["fields"]["sql"], "PRAGMA user_version");
}

#[test]
fn test_unknown_config_key_is_warned() {
    let (writer, _guard) = setup_capture();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sqlgate.yaml");
    std::fs::write(&path, "version: 1\npolicy:\n  defualt: deny\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.policy.default, Decision::Allow);

    let logged = events(&writer, "config_unknown_key");
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0]["level"], "WARN");
    assert_eq!(logged[0]["fields"]["key"], "policy.defualt");
}
