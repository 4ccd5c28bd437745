//! Writes sample logs under `logs/` for trying out the viewer.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde_json::{json, Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const SUBDIRECTORY: &str = "logs";
const DAEMON_NAMES: [&str; 4] = ["watcher", "worker", "processor", "updater"];

/// One structured log record
struct Record {
    level: &'static str,
    message: &'static str,
    attrs: Vec<(&'static str, Value)>,
}

fn records(now: &str) -> Vec<Record> {
    vec![
        Record {
            level: "WARN",
            message: "This is a warning message",
            attrs: vec![("fields", json!({"key": "value"}))],
        },
        Record {
            level: "INFO",
            message: "This is an info message",
            attrs: vec![("key", json!("value"))],
        },
        Record {
            level: "DEBUG",
            message: "This is a debug message",
            attrs: vec![("time", json!(now))],
        },
    ]
}

/// `key=value` text, quoting values that contain spaces
fn text_value(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            let inner: Vec<String> = map.iter().map(|(k, v)| format!("{k}:{}", text_value(v))).collect();
            format!("map[{}]", inner.join(" "))
        }
        other => other.to_string(),
    };
    if text.contains(' ') || text.contains('"') {
        format!("{text:?}")
    } else {
        text
    }
}

fn text_logs(now: &str, records: &[Record]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&format!(
            "time={now} level={} msg={}",
            record.level,
            text_value(&json!(record.message))
        ));
        for (key, value) in &record.attrs {
            out.push_str(&format!(" {key}={}", text_value(value)));
        }
        out.push('\n');
    }
    out
}

fn json_logs(now: &str, records: &[Record]) -> anyhow::Result<String> {
    let mut out = String::new();
    for record in records {
        let mut line = Map::new();
        line.insert("time".to_string(), json!(now));
        line.insert("level".to_string(), json!(record.level));
        line.insert("msg".to_string(), json!(record.message));
        for (key, value) in &record.attrs {
            line.insert((*key).to_string(), value.clone());
        }
        out.push_str(&serde_json::to_string(&Value::Object(line))?);
        out.push('\n');
    }
    Ok(out)
}

fn write_files(directory: &Path, now: &str) -> anyhow::Result<()> {
    let records = records(now);

    fs::write(directory.join("slog.txt"), text_logs(now, &records)).context("error writing slog.txt")?;
    fs::write(directory.join("slog.json"), json_logs(now, &records)?).context("error writing slog.json")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let now = OffsetDateTime::now_utc().format(&Rfc3339)?;

    for daemon in DAEMON_NAMES {
        let directory = Path::new(SUBDIRECTORY).join(daemon);
        fs::create_dir_all(&directory).with_context(|| format!("error creating directory ({daemon})"))?;
        write_files(&directory, &now).with_context(|| format!("error writing files ({daemon})"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2024-01-02T03:04:05Z";

    #[test]
    fn text_lines_are_key_value() {
        let text = text_logs(NOW, &records(NOW));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "time=2024-01-02T03:04:05Z level=WARN msg=\"This is a warning message\" fields=map[key:value]"
        );
        assert!(lines[1].ends_with("key=value"));
    }

    #[test]
    fn json_lines_parse() {
        let json = json_logs(NOW, &records(NOW)).unwrap();
        for line in json.lines() {
            let value: Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["time"], NOW);
        }
    }

    #[test]
    fn writes_both_files() {
        let dir = tempfile::TempDir::new().unwrap();
        write_files(dir.path(), NOW).unwrap();
        assert!(dir.path().join("slog.txt").is_file());
        assert!(dir.path().join("slog.json").is_file());
    }
}
