use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use log::debug;
use walkdir::WalkDir;

use crate::errors::TemplateError;

/// A read-only tree of template files addressed by slash-separated paths
pub trait TemplateSource: Send + Sync {
    /// Every file beneath `root`, in walk order: siblings sorted by name,
    /// directories descended where they sort. Paths include `root`.
    fn files(&self, root: &str) -> Result<Vec<String>, TemplateError>;

    /// Contents of one file returned by [`TemplateSource::files`]
    fn read(&self, path: &str) -> Result<Vec<u8>, TemplateError>;
}

/// Templates held in memory, such as the compiled-in set
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.trim_start_matches('/').to_string(), contents.into());
        self
    }
}

impl TemplateSource for MemorySource {
    fn files(&self, root: &str) -> Result<Vec<String>, TemplateError> {
        let root = root.trim_matches('/');
        let mut paths: Vec<String> = self
            .files
            .keys()
            .filter(|path| root.is_empty() || root == "." || path.starts_with(&format!("{root}/")))
            .cloned()
            .collect();

        if paths.is_empty() && !(root.is_empty() || root == ".") {
            return Err(TemplateError::Walk {
                root: root.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
            });
        }

        paths.sort_by(|a, b| a.split('/').cmp(b.split('/')));
        Ok(paths)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, TemplateError> {
        self.files.get(path).cloned().ok_or_else(|| TemplateError::Read {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        })
    }
}

/// Templates read from a directory on disk
#[derive(Debug, Clone)]
pub struct DirSource {
    base: PathBuf,
}

impl DirSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl TemplateSource for DirSource {
    fn files(&self, root: &str) -> Result<Vec<String>, TemplateError> {
        let start = match root.trim_matches('/') {
            "" | "." => self.base.clone(),
            nested => self.base.join(nested),
        };
        debug!("Walking template directory {:?}", start);

        let mut paths = Vec::new();
        for entry in WalkDir::new(&start).sort_by_file_name() {
            let entry = entry.map_err(|e| TemplateError::Walk {
                root: root.to_string(),
                source: e.into(),
            })?;
            if entry.file_type().is_dir() {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.base).unwrap_or(entry.path());
            let path = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            paths.push(path);
        }
        Ok(paths)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, TemplateError> {
        fs::read(self.base.join(path)).map_err(|source| TemplateError::Read {
            path: path.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_walks_like_a_directory() {
        let source = MemorySource::new()
            .with_file("templates/a.html", "x")
            .with_file("templates/a/index.html", "y")
            .with_file("templates/b.tmpl.html", "z")
            .with_file("other/c.html", "w");

        assert_eq!(
            source.files("templates").unwrap(),
            ["templates/a/index.html", "templates/a.html", "templates/b.tmpl.html"]
        );
        assert_eq!(source.read("templates/a.html").unwrap(), b"x");
        assert!(source.read("templates/missing.html").is_err());
        assert!(source.files("missing").is_err());
    }

    #[test]
    fn dir_source_walks_sorted() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("site/log")).unwrap();
        fs::write(dir.path().join("site/log.tmpl.html"), "l").unwrap();
        fs::write(dir.path().join("site/log/page.tmpl.html"), "p").unwrap();
        fs::write(dir.path().join("site/index.html"), "i").unwrap();

        let source = DirSource::new(dir.path());
        assert_eq!(
            source.files("site").unwrap(),
            ["site/index.html", "site/log/page.tmpl.html", "site/log.tmpl.html"]
        );
        assert_eq!(source.read("site/index.html").unwrap(), b"i");
        assert!(source.files("nowhere").is_err());
    }
}
