use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

/// Appends every HTTP exchange to a JSON-lines file.
pub(crate) struct MessageLogger {
    file: File,
}

impl MessageLogger {
    pub fn new(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    pub fn log_request(&mut self, method: &str, path: &str, body: Option<&Value>) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "path": path,
            "body": body.map(redact),
        });
        self.write_line(&entry);
    }

    pub fn log_response(&mut self, method: &str, path: &str, status: u16, body: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "resp",
            "method": method,
            "path": path,
            "status": status,
            "body": redact(body),
        });
        self.write_line(&entry);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}

/// Masks passwords and session tokens anywhere in a body.
fn redact(body: &Value) -> Value {
    match body {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| match k.as_str() {
                    "password" | "auth_token" => (k.clone(), Value::String("***".to_string())),
                    _ => (k.clone(), redact(v)),
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_nested_secrets() {
        let body = json!({
            "email": "a@b.c",
            "password": "secret",
            "credentials": {"auth_token": "tok", "user": 1}
        });
        let masked = redact(&body);
        assert_eq!(masked["email"], "a@b.c");
        assert_eq!(masked["password"], "***");
        assert_eq!(masked["credentials"]["auth_token"], "***");
        assert_eq!(masked["credentials"]["user"], 1);
    }
}
