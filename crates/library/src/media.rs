//! Filesystem phase: walk the media directory and check every file against
//! the catalog.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::instrument;
use walkdir::WalkDir;

use crate::ledger::Ledger;

/// Extensions of files that never belong in the catalog: books, ringtones,
/// booklets and property lists.
pub const DEFAULT_IGNORED_EXTENSIONS: &[&str] = &[".epub", ".m4r", ".pdf", ".plist"];
/// Extensions of directories that are opaque media items (iTunes LPs).
pub const DEFAULT_BUNDLE_EXTENSIONS: &[&str] = &[".itlp"];

/// Decides which files are exempt from reconciliation and which directories
/// must not be descended into.
///
/// All extensions are compared lower-cased with their leading dot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaFilter {
    ignored: BTreeSet<String>,
    bundles: BTreeSet<String>,
}
impl Default for MediaFilter {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORED_EXTENSIONS, DEFAULT_BUNDLE_EXTENSIONS)
    }
}
impl MediaFilter {
    /// Extensions may be given with or without their leading dot, in any case.
    pub fn new<I, B>(ignored: I, bundles: B) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        Self {
            ignored: ignored.into_iter().map(|e| normalize_extension(e.as_ref())).collect(),
            bundles: bundles.into_iter().map(|e| normalize_extension(e.as_ref())).collect(),
        }
    }

    pub fn is_ignored(&self, extension: &str) -> bool {
        self.ignored.contains(extension)
    }

    pub fn is_bundle(&self, extension: &str) -> bool {
        self.bundles.contains(extension)
    }
}

fn normalize_extension(extension: &str) -> String {
    let extension = extension.trim().to_lowercase();
    if extension.is_empty() || extension.starts_with('.') {
        extension
    } else {
        format!(".{extension}")
    }
}

/// The lower-cased extension of the last path component, including the
/// leading dot, or an empty string when there is none.
///
/// Unlike [`Path::extension`], a leading dot counts: `.DS_Store` has the
/// extension `.ds_store`.
pub fn extension(path: &Path) -> String {
    let Some(name) = path.file_name() else {
        return String::new();
    };
    let name = name.to_string_lossy();
    name.rfind('.').map(|dot| name[dot..].to_lowercase()).unwrap_or_default()
}

/// Walk `root` recursively, recording every regular file in the ledger.
///
/// Bundles are treated as opaque and skipped entirely. Symlinks and special
/// files are ignored. Directories that cannot be read are skipped silently:
/// the library may live on a volume that is not mounted.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn walk_media(root: &Path, filter: &MediaFilter, ledger: &mut Ledger) {
    let entries = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_type().is_dir() || !filter.is_bundle(&extension(entry.path()))
        });
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(path = ?err.path(), error = %err, "Skipping unreadable media subtree");
                continue;
            },
        };
        // A root that is not a directory has nothing to walk.
        if entry.depth() > 0 && entry.file_type().is_file() {
            ledger.record_file(entry.path(), filter);
        }
    }
    tracing::debug!(files = ledger.statistics().files, "Media directory walk complete");
}
