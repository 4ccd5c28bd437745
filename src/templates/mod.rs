//! Discovery of page templates.
//!
//! A [`TemplateSource`] exposes a tree of files; [`TemplateCatalog`] walks it
//! once and indexes each file by the URL path it answers.

mod catalog;
mod source;

pub use catalog::{describe, TemplateCatalog, TemplateDescriptor, TEMPLATE_EXTENSION};
pub use source::{DirSource, MemorySource, TemplateSource};

/// Directory holding the compiled-in templates within [`builtin`]
pub const BUILTIN_ROOT: &str = "templates";

/// The template set compiled into the binary
pub fn builtin() -> MemorySource {
    MemorySource::new()
        .with_file("templates/index.html", include_str!("../../templates/index.html"))
        .with_file("templates/logs.tmpl.html", include_str!("../../templates/logs.tmpl.html"))
        .with_file("templates/log.tmpl.html", include_str!("../../templates/log.tmpl.html"))
        .with_file(
            "templates/log/page.tmpl.html",
            include_str!("../../templates/log/page.tmpl.html"),
        )
        .with_file(
            "templates/log/raw.tmpl.html",
            include_str!("../../templates/log/raw.tmpl.html"),
        )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn builtin_set_answers_every_page() {
        let catalog = TemplateCatalog::build(Arc::new(builtin()), BUILTIN_ROOT).unwrap();
        assert!(catalog.static_variant("/").is_some());
        for page in ["/logs", "/log", "/log/page", "/log/raw"] {
            let descriptor = catalog.templated_variant(page).unwrap();
            assert_eq!(descriptor.media_type, "text/html");
        }
    }
}
