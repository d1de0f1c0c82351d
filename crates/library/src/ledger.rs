//! The reconciliation ledger: everything learned from the catalog and the
//! media directory, in one owned aggregate.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::media::{MediaFilter, extension};

/// Running totals, reported once both phases are done.
///
/// Counters are kept in sorted maps so reports come out in a stable order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Catalog tracks with a decodable location, whether or not the file exists.
    pub tracks: u64,
    /// Regular files found under the media directory.
    pub files: u64,
    /// Track count per catalog `Kind`.
    pub kinds: BTreeMap<String, u64>,
    /// File count per lower-cased extension (with its leading dot).
    pub extensions: BTreeMap<String, u64>,
}

/// State shared by the catalog phase and the filesystem phase.
///
/// The catalog phase must finish before the filesystem phase starts: a file
/// only counts as an orphan once every catalog track has been recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    known: HashSet<PathBuf>,
    missing_files: Vec<PathBuf>,
    missing_tracks: Vec<PathBuf>,
    stats: Statistics,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a track of the given kind. Empty kinds are ignored.
    pub fn record_kind(&mut self, kind: &str) {
        if kind.is_empty() {
            return;
        }
        *self.stats.kinds.entry(kind.to_string()).or_default() += 1;
    }

    /// Record a catalog track located at `path`.
    ///
    /// Existing files become known tracks; anything else is remembered as a
    /// missing file. Both count towards the track total.
    pub fn record_track(&mut self, path: PathBuf, exists: bool) {
        self.stats.tracks += 1;
        if exists {
            self.known.insert(path);
        } else {
            tracing::debug!(path = %path.display(), "Catalog track has no file on disk");
            self.missing_files.push(path);
        }
    }

    /// Record a regular file found on disk, flagging it when no catalog
    /// track refers to it.
    pub fn record_file(&mut self, path: &Path, filter: &MediaFilter) {
        let extension = extension(path);
        self.stats.files += 1;
        if !self.known.contains(path) && !filter.is_ignored(&extension) {
            self.missing_tracks.push(path.to_path_buf());
        }
        *self.stats.extensions.entry(extension).or_default() += 1;
    }

    pub fn is_known(&self, path: impl AsRef<Path>) -> bool {
        self.known.contains(path.as_ref())
    }

    pub fn known_tracks(&self) -> &HashSet<PathBuf> {
        &self.known
    }

    /// Catalog paths with no file on disk, in catalog order.
    pub fn missing_files(&self) -> &[PathBuf] {
        &self.missing_files
    }

    /// Files on disk that no catalog track refers to, in walk order.
    pub fn missing_tracks(&self) -> &[PathBuf] {
        &self.missing_tracks
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }
}
