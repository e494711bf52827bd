//! Template tree transformation.
//!
//! Walks the template directory depth-first in file-name order and produces
//! a [`FileMap`] of output-relative paths. Text files get the replacement
//! table applied; the entry file additionally gets a freshly synthesized
//! plugin header and is renamed after the slug.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use super::replacements::ReplacementTable;
use crate::config::GeneratorConfig;
use crate::core::fields::{names, DEFAULT_DESCRIPTION, DEFAULT_REQUIRES_PHP, DEFAULT_VERSION};
use crate::core::{Error, FieldSet, Result};

/// Extensions whose content is rewritten.
pub const TEXT_EXTENSIONS: [&str; 6] = ["php", "json", "js", "css", "txt", "md"];

/// Tooling and VCS directories never copied into a plugin.
pub const SKIPPED_DIRS: [&str; 5] = [".git", ".svn", ".idea", "node_modules", "vendor"];

/// Template-only files never copied into a plugin.
pub const SKIPPED_FILES: [&str; 4] = [
    ".php-cs-fixer.dist.php",
    ".php-cs-fixer.cache",
    ".gitignore",
    ".DS_Store",
];

const STRICT_TYPES: &str = "declare(strict_types=1);";

/// Content of one generated file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileContent {
    /// Rewritten text.
    Text(String),
    /// Copied unchanged.
    Binary(Vec<u8>),
}

impl FileContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(s) => s.as_bytes(),
            FileContent::Binary(b) => b,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContent::Text(s) => Some(s),
            FileContent::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generated files keyed by forward-slash relative path, in walk order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileMap {
    entries: Vec<(String, FileContent)>,
}

impl FileMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file; an existing path keeps its position and gets the new content.
    pub fn insert(&mut self, path: impl Into<String>, content: FileContent) {
        let path = path.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = content,
            None => self.entries.push((path, content)),
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileContent> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileContent)> {
        self.entries.iter().map(|(p, c)| (p.as_str(), c))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total content size in bytes.
    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(|(_, c)| c.len()).sum()
    }
}

/// Turns a template tree plus validated fields into a [`FileMap`].
#[derive(Clone, Debug)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Fails fast if the template root is unusable.
    pub fn check_template(&self) -> Result<()> {
        if self.config.template_dir.is_dir() {
            Ok(())
        } else {
            Err(Error::TemplateMissing(self.config.template_dir.clone()))
        }
    }

    /// Generate the plugin file map for sanitized, validated fields.
    pub fn generate(&self, fields: &FieldSet) -> Result<FileMap> {
        self.check_template()?;

        let root = self.config.template_dir.as_path();
        let table = ReplacementTable::from_fields(fields);
        let mut files = FileMap::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped(e));

        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            let is_entry_file = file_name == self.config.entry_file.as_str();

            let bytes = fs::read(entry.path())?;
            let content = self.process_content(bytes, &file_name, is_entry_file, fields, &table);

            let relative = relative_path(root, entry.path());
            let output_path = if is_entry_file {
                self.renamed_entry_path(&relative, fields)
            } else {
                relative
            };

            debug!(path = %output_path, bytes = content.len(), "generated file");
            files.insert(output_path, content);
        }

        if files.is_empty() {
            return Err(Error::EmptyOutput);
        }

        info!(
            slug = fields.value(names::PLUGIN_SLUG),
            files = files.len(),
            bytes = files.total_bytes(),
            "plugin files generated"
        );

        Ok(files)
    }

    fn process_content(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        is_entry_file: bool,
        fields: &FieldSet,
        table: &ReplacementTable,
    ) -> FileContent {
        if !has_text_extension(file_name) {
            return FileContent::Binary(bytes);
        }

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = file_name, "text file is not valid UTF-8, copying unchanged");
                return FileContent::Binary(e.into_bytes());
            }
        };

        let text = if is_entry_file {
            let mut rebuilt = plugin_header(fields);
            rebuilt.push_str(&entry_body(&text));
            rebuilt
        } else {
            text
        };

        FileContent::Text(table.apply(&text))
    }

    fn renamed_entry_path(&self, relative: &str, fields: &FieldSet) -> String {
        let slug = fields.value(names::PLUGIN_SLUG);
        let new_name = match Path::new(&self.config.entry_file)
            .extension()
            .and_then(|e| e.to_str())
        {
            Some(ext) => format!("{}.{}", slug, ext),
            None => slug.to_string(),
        };

        match relative.rsplit_once('/') {
            Some((dir, _)) => format!("{}/{}", dir, new_name),
            None => new_name,
        }
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        SKIPPED_DIRS.contains(&name.as_ref())
    } else {
        SKIPPED_FILES.contains(&name.as_ref())
    }
}

fn has_text_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            TEXT_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Forward-slash path of `path` below `root`.
fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Header block for the entry file, built from the submitted fields.
pub fn plugin_header(fields: &FieldSet) -> String {
    let or_default = |key: &str, default: &'static str| -> String {
        match fields.value(key) {
            "" => default.to_string(),
            v => v.to_string(),
        }
    };

    let mut header = String::from("<?php\n\n/*\n");
    header.push_str(&format!(
        " * Plugin Name: {}\n",
        or_default(names::PLUGIN_NAME, "My Plugin")
    ));

    let plugin_uri = fields.value(names::PLUGIN_URI);
    if !plugin_uri.is_empty() {
        header.push_str(&format!(" * Plugin URI: {}\n", plugin_uri));
    }

    header.push_str(&format!(
        " * Description: {}\n",
        or_default(names::PLUGIN_DESCRIPTION, DEFAULT_DESCRIPTION)
    ));
    header.push_str(&format!(
        " * Version: {}\n",
        or_default(names::VERSION, DEFAULT_VERSION)
    ));
    header.push_str(&format!(
        " * Requires PHP: {}\n",
        or_default(names::REQUIRES_PHP, DEFAULT_REQUIRES_PHP)
    ));
    header.push_str(&format!(
        " * Author: {}\n",
        or_default(names::AUTHOR_NAME, "Author")
    ));

    let author_uri = fields.value(names::AUTHOR_URI);
    if !author_uri.is_empty() {
        header.push_str(&format!(" * Author URI: {}\n", author_uri));
    }

    let text_domain = match fields.value(names::TEXT_DOMAIN) {
        "" => fields.value(names::PLUGIN_SLUG),
        td => td,
    };
    header.push_str(&format!(" * Text Domain: {}\n", text_domain));
    header.push_str(" */\n");

    header
}

/// Entry file content with its original header block removed.
///
/// Keeps everything from the strict-types declaration on; without one,
/// keeps everything from the first import and re-adds the declaration.
pub fn entry_body(content: &str) -> String {
    if let Some(pos) = content.find(STRICT_TYPES) {
        return format!("\n{}", &content[pos..]);
    }

    if let Some(pos) = content.find("use ") {
        return format!("\n{}\n\n{}", STRICT_TYPES, &content[pos..]);
    }

    content.to_string()
}
