use std::collections::BTreeMap;
use std::sync::Arc;

use log::{info, warn};

use super::source::TemplateSource;
use crate::errors::TemplateError;
use crate::utils::{clean_path, path_base, path_dir};

/// Marks a file as a template to execute: `name.tmpl.html`
pub const TEMPLATE_EXTENSION: &str = "tmpl";

/// One discovered template file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDescriptor {
    /// URL path answered by this file, e.g. `/log/page`
    pub logical_name: String,
    /// Empty when the extension is unknown
    pub media_type: &'static str,
    /// Executed against API data rather than served verbatim
    pub templated: bool,
    /// Came from `dir/index.*` rather than `dir.*`
    pub is_index: bool,
    /// Path inside the template source
    pub storage_path: String,
}

/// Media type for a template's true extension
fn media_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension {
        "html" => Some("text/html"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

/// Describe the file at `relative_path` (relative to the template root).
///
/// Files without an extension are not templates and yield `None`.
pub fn describe(relative_path: &str, storage_path: &str) -> Option<TemplateDescriptor> {
    let filename = path_base(relative_path);
    let (stem, remainder) = filename.split_once('.')?;

    let dir = path_dir(relative_path);
    let dir = if dir == "." { String::new() } else { dir };
    let logical_name = if stem == "index" {
        clean_path(&format!("/{dir}"))
    } else {
        clean_path(&format!("/{dir}/{stem}"))
    };

    let template_prefix = format!("{TEMPLATE_EXTENSION}.");
    let templated = remainder.starts_with(&template_prefix);
    let extension = remainder.strip_prefix(&template_prefix).unwrap_or(remainder);

    let media_type = media_type_for_extension(extension).unwrap_or_else(|| {
        warn!("Unknown MIME type for template extension {:?} ({})", extension, storage_path);
        ""
    });

    Some(TemplateDescriptor {
        logical_name,
        media_type,
        templated,
        is_index: stem == "index",
        storage_path: storage_path.to_string(),
    })
}

/// Index of templates by the URL path they answer.
///
/// Built once from a full walk of the source; read-only afterwards. Every
/// file sharing a logical name is kept, in discovery order.
pub struct TemplateCatalog {
    source: Arc<dyn TemplateSource>,
    entries: BTreeMap<String, Vec<TemplateDescriptor>>,
}

impl TemplateCatalog {
    /// Walk `root_dir` within `source` and index every template found
    pub fn build(source: Arc<dyn TemplateSource>, root_dir: &str) -> Result<Self, TemplateError> {
        let root = clean_path(root_dir);
        let mut entries: BTreeMap<String, Vec<TemplateDescriptor>> = BTreeMap::new();

        for storage_path in source.files(&root)? {
            let relative = if root == "." {
                storage_path.as_str()
            } else {
                storage_path
                    .strip_prefix(root.as_str())
                    .map(|rest| rest.trim_start_matches('/'))
                    .unwrap_or(storage_path.as_str())
            };

            if let Some(descriptor) = describe(relative, &storage_path) {
                entries
                    .entry(descriptor.logical_name.clone())
                    .or_default()
                    .push(descriptor);
            }
        }

        let catalog = Self { source, entries };
        for descriptor in catalog.descriptors() {
            info!(
                "Found template {} at {} (format {:?}, templated: {})",
                descriptor.logical_name, descriptor.storage_path, descriptor.media_type, descriptor.templated
            );
        }
        Ok(catalog)
    }

    /// All variants answering `path`, in discovery order
    pub fn lookup(&self, path: &str) -> Result<&[TemplateDescriptor], TemplateError> {
        let name = clean_path(&format!("/{path}"));
        self.entries
            .get(&name)
            .map(Vec::as_slice)
            .ok_or(TemplateError::NotFound)
    }

    /// The variant to serve verbatim, if one exists
    pub fn static_variant(&self, path: &str) -> Option<&TemplateDescriptor> {
        self.variant(path, false)
    }

    /// The variant to execute, if one exists
    pub fn templated_variant(&self, path: &str) -> Option<&TemplateDescriptor> {
        self.variant(path, true)
    }

    /// `path.ext` before `path/index.ext`, whatever the walk order was
    fn variant(&self, path: &str, templated: bool) -> Option<&TemplateDescriptor> {
        let mut candidates = self.lookup(path).ok()?.iter().filter(|d| d.templated == templated);
        let first = candidates.next()?;
        if !first.is_index {
            return Some(first);
        }
        Some(candidates.find(|d| !d.is_index).unwrap_or(first))
    }

    /// Contents of a descriptor's file
    pub fn read(&self, descriptor: &TemplateDescriptor) -> Result<Vec<u8>, TemplateError> {
        self.source.read(&descriptor.storage_path)
    }

    /// Every descriptor, grouped by logical name
    pub fn descriptors(&self) -> impl Iterator<Item = &TemplateDescriptor> {
        self.entries.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
