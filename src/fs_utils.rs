//! Containment of request paths within the working directory.
//!
//! The check is purely lexical: `..` segments cannot climb out of the root,
//! but symbolic links inside the root are followed wherever they point. The
//! service assumes a single trusted working directory, so links placed there
//! by its owner are honoured.

use std::path::{Path, PathBuf};

use log::warn;

use crate::errors::LogError;
use crate::utils::clean_path;

/// Join `request_path` onto `root`, rejecting any result outside `root`.
///
/// The result either equals the cleaned root or lies strictly beneath it.
pub fn resolve(root: &Path, request_path: &str) -> Result<PathBuf, LogError> {
    let root = root.to_str().ok_or(LogError::UnsafePath)?;
    let root = clean_path(root);

    let joined = clean_path(&format!("{}/{}", root, clean_path(request_path)));

    let prefix = if root.ends_with('/') {
        root.clone()
    } else {
        format!("{root}/")
    };

    if joined != root && !joined.starts_with(&prefix) {
        warn!("Rejected path escaping working directory: {:?}", request_path);
        return Err(LogError::UnsafePath);
    }

    Ok(PathBuf::from(joined))
}
