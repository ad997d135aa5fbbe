use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

use crate::protocol::redact_path;

const SECRET_KEYS: &[&str] = &["password", "access_token", "refresh_token"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLogMode {
    Full,
    /// Replaces password and token values with `***`, including the
    /// refresh token in a refresh path.
    Redacted,
}

pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { mode, file })
    }

    pub fn log_request(&mut self, method: &str, path: &str, body: Option<&Value>) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "path": self.prepare_path(path),
            "body": body.map(|b| self.prepare(b)),
        });
        self.write_line(&entry);
    }

    pub fn log_response(&mut self, path: &str, status: u16, body: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "resp",
            "path": self.prepare_path(path),
            "status": status,
            "body": self.prepare(body),
        });
        self.write_line(&entry);
    }

    fn prepare(&self, body: &Value) -> Value {
        match self.mode {
            MessageLogMode::Full => body.clone(),
            MessageLogMode::Redacted => {
                let mut copy = body.clone();
                redact(&mut copy);
                copy
            }
        }
    }

    fn prepare_path(&self, path: &str) -> String {
        match self.mode {
            MessageLogMode::Full => path.to_string(),
            MessageLogMode::Redacted => redact_path(path).into_owned(),
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if SECRET_KEYS.contains(&key.as_str()) && !v.is_null() {
                    *v = Value::String("***".into());
                } else {
                    redact(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}
