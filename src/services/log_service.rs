use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::errors::LogError;
use crate::fs_utils::resolve;
use crate::types::{LogEntry, LogListing, LogMetadata, LogPage, RawLog};
use crate::utils::{clean_path, media_type_for, path_base};

/// Number of lines in one page of a log file
pub const PAGE_SIZE: usize = 50;

const EMPTY_PATH: &str = "Requires a non-empty log path";
const INVALID_PATH: &str = "Invalid path";

/// A page-sized slice of a file's lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub contents: Vec<u8>,
    pub previous_page: Option<usize>,
    pub next_page: Option<usize>,
}

/// Select page `page` from `bytes`, treating `\n` as the line separator.
///
/// A trailing newline yields a final empty line, so rejoining every page with
/// `\n` reproduces the input exactly. Pages past the end are empty.
pub fn paginate(bytes: &[u8], page: usize) -> Window {
    let lines: Vec<&[u8]> = bytes.split(|byte| *byte == b'\n').collect();
    let total = lines.len();
    let start = page.saturating_mul(PAGE_SIZE);
    let end = start.saturating_add(PAGE_SIZE);

    let contents = if start < total {
        lines[start..end.min(total)].join(&b'\n')
    } else {
        Vec::new()
    };

    Window {
        contents,
        previous_page: (page > 0).then(|| page - 1),
        next_page: (end < total).then(|| page + 1),
    }
}

/// Read-only access to log files beneath a working directory
#[derive(Debug, Clone)]
pub struct LogService {
    root: PathBuf,
}

impl LogService {
    /// Create a new log service
    pub fn new(root: PathBuf) -> Self {
        debug!("Creating LogService with working directory: {:?}", root);
        Self { root }
    }

    /// The working directory every request path is resolved against
    /// Name, request path and size of a file
    pub fn metadata(&self, request_path: &str) -> Result<LogMetadata, LogError> {
        if request_path.is_empty() {
            return Err(LogError::InvalidPath(EMPTY_PATH));
        }

        let full_path =
            resolve(&self.root, request_path).map_err(|_| LogError::InvalidPath(INVALID_PATH))?;

        let metadata = fs::metadata(&full_path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                warn!("Log does not exist: {:?}", full_path);
                LogError::NotFound
            } else {
                warn!("Failed to stat {:?}: {}", full_path, e);
                LogError::InvalidPath(INVALID_PATH)
            }
        })?;

        Ok(LogMetadata {
            name: path_base(request_path).to_string(),
            path: request_path.to_string(),
            file_size: metadata.len(),
        })
    }

    /// One page of a file's lines; `page` defaults to the first
    pub fn page(&self, request_path: &str, page: Option<usize>) -> Result<LogPage, LogError> {
        if request_path.is_empty() {
            return Err(LogError::InvalidPath(EMPTY_PATH));
        }

        let full_path =
            resolve(&self.root, request_path).map_err(|_| LogError::InvalidPath(INVALID_PATH))?;
        let bytes = read_all(&full_path)?;
        let page = page.unwrap_or(0);
        let window = paginate(&bytes, page);

        debug!(
            "Page {} of {:?}: {} bytes, previous {:?}, next {:?}",
            page,
            full_path,
            window.contents.len(),
            window.previous_page,
            window.next_page
        );

        Ok(LogPage {
            previous_page: window.previous_page,
            page,
            next_page: window.next_page,
            contents: window.contents,
            media_type: media_type_for(&full_path).to_string(),
            path: request_path.to_string(),
        })
    }

    /// The entire file
    pub fn raw(&self, request_path: &str) -> Result<RawLog, LogError> {
        if request_path.is_empty() {
            return Err(LogError::NotFound);
        }

        let full_path =
            resolve(&self.root, request_path).map_err(|_| LogError::InvalidPath(INVALID_PATH))?;
        let contents = read_all(&full_path)?;

        info!("Read log {:?}, {} bytes", full_path, contents.len());
        Ok(RawLog {
            contents,
            media_type: media_type_for(&full_path).to_string(),
        })
    }

    /// Immediate children of a directory, sorted by name; defaults to the root
    pub fn list(&self, request_path: Option<&str>) -> Result<LogListing, LogError> {
        // an empty argument cleans to `.`, so its entries come back bare
        let request_path = match request_path {
            Some(path) => clean_path(path),
            None => "/".to_string(),
        };

        let full_path =
            resolve(&self.root, &request_path).map_err(|_| LogError::InvalidPath(INVALID_PATH))?;
        debug!("Listing directory: {:?} (full path: {:?})", request_path, full_path);

        let entries = fs::read_dir(&full_path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                warn!("Directory does not exist: {:?}", full_path);
                LogError::NotFound
            } else {
                warn!("Failed to read directory {:?}: {}", full_path, e);
                LogError::InvalidPath(INVALID_PATH)
            }
        })?;

        let mut logfiles = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
                    let path = clean_path(&format!("{request_path}/{name}"));
                    logfiles.push(LogEntry { name, path, is_dir });
                }
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                }
            }
        }
        logfiles.sort_by(|a, b| a.name.cmp(&b.name));

        info!("Listed directory {:?}, found {} entries", request_path, logfiles.len());
        Ok(LogListing { logfiles })
    }
}

fn read_all(path: &Path) -> Result<Vec<u8>, LogError> {
    let mut file = File::open(path).map_err(|e| {
        warn!("Failed to open {:?}: {}", path, e);
        LogError::InvalidPath("Failed to open file")
    })?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| {
        warn!("Failed to read {:?}: {}", path, e);
        LogError::InvalidPath("Failed to read file")
    })?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn numbered_lines(count: usize) -> String {
        (0..count).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n")
    }

    fn service_with(files: &[(&str, &str)]) -> (TempDir, LogService) {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        let service = LogService::new(dir.path().to_path_buf());
        (dir, service)
    }

    #[test]
    fn paginates_120_lines() {
        let text = numbered_lines(120);

        let first = paginate(text.as_bytes(), 0);
        assert_eq!(first.previous_page, None);
        assert_eq!(first.next_page, Some(1));
        assert_eq!(String::from_utf8(first.contents).unwrap(), numbered_lines(50));

        let middle = paginate(text.as_bytes(), 1);
        assert_eq!(middle.previous_page, Some(0));
        assert_eq!(middle.next_page, Some(2));

        let last = paginate(text.as_bytes(), 2);
        let last = String::from_utf8(last.contents).unwrap();
        assert_eq!(last.split('\n').count(), 20);
        assert!(last.starts_with("line 100"));
        assert!(last.ends_with("line 119"));
        assert_eq!(paginate(text.as_bytes(), 2).next_page, None);
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let text = numbered_lines(100);
        assert_eq!(paginate(text.as_bytes(), 0).next_page, Some(1));
        assert_eq!(paginate(text.as_bytes(), 1).next_page, None);
    }

    #[test]
    fn pages_past_the_end_are_empty() {
        let window = paginate(b"one\ntwo", 7);
        assert!(window.contents.is_empty());
        assert_eq!(window.previous_page, Some(6));
        assert_eq!(window.next_page, None);

        let window = paginate(b"one", usize::MAX);
        assert!(window.contents.is_empty());
        assert_eq!(window.next_page, None);
    }

    #[test]
    fn pages_reassemble_the_file() {
        for count in [0, 1, 49, 50, 51, 173] {
            let mut text = numbered_lines(count);
            text.push('\n');
            let total_lines = text.split('\n').count();
            let pages = total_lines.div_ceil(PAGE_SIZE);

            let joined = (0..pages)
                .map(|page| String::from_utf8(paginate(text.as_bytes(), page).contents).unwrap())
                .collect::<Vec<_>>()
                .join("\n");
            assert_eq!(joined, text, "{count} lines");
        }
    }

    #[test]
    fn metadata_reports_size_and_base_name() {
        let (_dir, service) = service_with(&[("worker/slog.txt", "hello\n")]);

        let metadata = service.metadata("worker/slog.txt").unwrap();
        assert_eq!(metadata.name, "slog.txt");
        assert_eq!(metadata.path, "worker/slog.txt");
        assert_eq!(metadata.file_size, 6);
    }

    #[test]
    fn metadata_errors() {
        let (_dir, service) = service_with(&[]);

        assert!(matches!(service.metadata(""), Err(LogError::InvalidPath(EMPTY_PATH))));
        assert!(matches!(service.metadata("missing.txt"), Err(LogError::NotFound)));
        assert!(matches!(
            service.metadata("../outside.txt"),
            Err(LogError::InvalidPath(INVALID_PATH))
        ));
    }

    #[test]
    fn page_of_missing_file_is_invalid() {
        let (_dir, service) = service_with(&[]);
        assert!(matches!(
            service.page("missing.txt", None),
            Err(LogError::InvalidPath("Failed to open file"))
        ));
    }

    #[test]
    fn page_defaults_to_first() {
        let (_dir, service) = service_with(&[("a.txt", "x\ny")]);
        let page = service.page("a.txt", None).unwrap();
        assert_eq!(page.page, 0);
        assert_eq!(page.contents, b"x\ny");
        assert_eq!(page.media_type, "text/plain");
    }

    #[test]
    fn raw_reads_whole_file() {
        let (_dir, service) = service_with(&[("a.json", "{}\n{}\n")]);
        let raw = service.raw("a.json").unwrap();
        assert_eq!(raw.contents, b"{}\n{}\n");
        assert_eq!(raw.media_type, "application/json");
        assert!(matches!(service.raw(""), Err(LogError::NotFound)));
    }

    #[test]
    fn lists_sorted_entries() {
        let (_dir, service) = service_with(&[("b.txt", ""), ("a/x.txt", ""), ("c.log", "")]);

        let listing = service.list(None).unwrap();
        let names: Vec<_> = listing.logfiles.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a", "b.txt", "c.log"]);
        assert!(listing.logfiles[0].is_dir);
        assert_eq!(listing.logfiles[1].path, "/b.txt");

        let nested = service.list(Some("a")).unwrap();
        assert_eq!(nested.logfiles[0].path, "a/x.txt");
    }

    #[test]
    fn empty_list_argument_yields_bare_paths() {
        let (_dir, service) = service_with(&[("b.txt", ""), ("a/x.txt", "")]);

        let listing = service.list(Some("")).unwrap();
        let paths: Vec<_> = listing.logfiles.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["a", "b.txt"]);
        assert_eq!(service.list(None).unwrap().logfiles[1].path, "/b.txt");
    }

    #[test]
    fn lists_empty_and_missing_directories() {
        let (dir, service) = service_with(&[]);
        fs::create_dir(dir.path().join("empty")).unwrap();

        assert!(service.list(Some("empty")).unwrap().logfiles.is_empty());
        assert!(matches!(service.list(Some("missing")), Err(LogError::NotFound)));
        assert!(matches!(
            service.list(Some("../..")),
            Err(LogError::InvalidPath(INVALID_PATH))
        ));
    }
}
