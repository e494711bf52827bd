//! ZIP assembly for generated plugins.
//!
//! Every entry lives under a single `<slug>/` root folder, which is the
//! first entry. Directory entries are written explicitly, parents before
//! children, each exactly once.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::generator::FileMap;
use crate::core::{Error, Result};

pub const ZIP_OPEN: &str = "ZIP_OPEN";
pub const ZIP_WRITE: &str = "ZIP_WRITE";
pub const ZIP_FINISH: &str = "ZIP_FINISH";

/// Writes a [`FileMap`] into a temporary ZIP file.
///
/// The target path `<temp_dir>/<slug>_<uuid>.zip` is fixed at construction,
/// so a caller can guard it with [`TempArchive`] before writing starts.
#[derive(Clone, Debug)]
pub struct ZipCreator {
    slug: String,
    path: PathBuf,
}

impl ZipCreator {
    pub fn new(slug: impl Into<String>, temp_dir: impl AsRef<Path>) -> Self {
        let slug = slug.into();
        let path = temp_dir
            .as_ref()
            .join(format!("{}_{}.zip", slug, Uuid::new_v4().simple()));
        Self { slug, path }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Where the archive is written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name offered to the browser.
    pub fn download_name(&self) -> String {
        format!("{}.zip", self.slug)
    }

    /// Write the archive and return its path.
    ///
    /// On failure a partially written file may remain at [`ZipCreator::path`].
    pub fn create(&self, files: &FileMap) -> Result<PathBuf> {
        let path = self.path.clone();
        let file = File::create(&path).map_err(|e| archive_error(ZIP_OPEN, &path, e))?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);
        let dir_options = options.unix_permissions(0o755);

        let root = format!("{}/", self.slug);
        zip.add_directory(root.as_str(), dir_options)
            .map_err(|e| archive_error(ZIP_WRITE, &path, e))?;
        let mut directories: HashSet<String> = HashSet::from([root.clone()]);

        for (relative, content) in files.iter() {
            for dir in parent_dirs(relative) {
                let name = format!("{}{}/", root, dir);
                if directories.insert(name.clone()) {
                    zip.add_directory(name.as_str(), dir_options)
                        .map_err(|e| archive_error(ZIP_WRITE, &path, e))?;
                }
            }

            let name = format!("{}{}", root, relative);
            zip.start_file(name.as_str(), options)
                .map_err(|e| archive_error(ZIP_WRITE, &path, e))?;
            zip.write_all(content.as_bytes())
                .map_err(|e| archive_error(ZIP_WRITE, &path, e))?;
        }

        let mut writer = zip
            .finish()
            .map_err(|e| archive_error(ZIP_FINISH, &path, e))?;
        writer
            .flush()
            .map_err(|e| archive_error(ZIP_FINISH, &path, e))?;

        debug!(
            path = %path.display(),
            files = files.len(),
            directories = directories.len(),
            "archive written"
        );

        Ok(path)
    }
}

/// Every ancestor directory of `relative`, outermost first.
///
/// `a/b/c.txt` yields `a`, `a/b`.
fn parent_dirs(relative: &str) -> impl Iterator<Item = &str> {
    relative
        .match_indices('/')
        .map(move |(idx, _)| &relative[..idx])
}

fn archive_error(code: &'static str, path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Archive {
        code,
        message: format!("{}: {}", path.display(), e),
    }
}

/// Removes the archive file when dropped.
#[derive(Debug)]
pub struct TempArchive {
    path: PathBuf,
}

impl TempArchive {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the archive into memory. The file is removed when `self` drops.
    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }
}

impl Drop for TempArchive {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove temp archive"),
        }
    }
}
