use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::services::LogService;

/// Application state shared across all API handlers
#[derive(Clone)]
pub struct AppState {
    pub logs: Arc<LogService>,
}

impl AppState {
    /// Create state rooted at the given working directory
    pub fn new(working_directory: PathBuf) -> Self {
        Self {
            logs: Arc::new(LogService::new(working_directory)),
        }
    }
}

/// One file or directory beneath the working directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "dir")]
    pub is_dir: bool,
}

/// Directory listing response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogListing {
    pub logfiles: Vec<LogEntry>,
}

/// File metadata response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMetadata {
    pub name: String,
    pub path: String,
    pub file_size: u64,
}

/// A window of lines from a log file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub previous_page: Option<usize>,
    pub page: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_page: Option<usize>,
    #[serde(with = "base64_bytes")]
    pub contents: Vec<u8>,
    pub media_type: String,
    pub path: String,
}

/// Whole-file contents response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    #[serde(with = "base64_bytes")]
    pub contents: Vec<u8>,
    pub media_type: String,
}

/// JSON error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Query string carrying an optional log path
#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

/// Query string for the page endpoint
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub path: Option<String>,
    pub page: Option<usize>,
}

/// Byte blobs travel over JSON as standard base64 strings
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_serializes_wire_names() {
        let page = LogPage {
            previous_page: None,
            page: 0,
            next_page: Some(1),
            contents: b"hello".to_vec(),
            media_type: "text/plain".to_string(),
            path: "a.txt".to_string(),
        };

        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(
            value,
            json!({
                "page": 0,
                "nextPage": 1,
                "contents": "aGVsbG8=",
                "mediaType": "text/plain",
                "path": "a.txt",
            })
        );

        let back: LogPage = serde_json::from_value(value).unwrap();
        assert_eq!(back, page);
    }

    #[test]
    fn entry_uses_dir_flag() {
        let entry = LogEntry {
            name: "worker".to_string(),
            path: "/worker".to_string(),
            is_dir: true,
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"name": "worker", "path": "/worker", "dir": true})
        );
    }
}
