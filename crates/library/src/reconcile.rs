//! Both phases, in order, with their console output.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use exn::ResultExt;
use tracing::instrument;

use crate::catalog::{CatalogOutcome, walk_catalog};
use crate::error::{ErrorKind, Result};
use crate::ledger::Ledger;
use crate::media::{MediaFilter, walk_media};
use crate::report;

/// Everything a finished run produced.
#[derive(Debug)]
pub struct Summary {
    /// How the catalog phase ended.
    pub outcome: CatalogOutcome,
    pub ledger: Ledger,
}

/// Reconciles one catalog against one media directory.
#[derive(Clone, Debug)]
pub struct Reconciler {
    catalog: PathBuf,
    media: PathBuf,
    filter: MediaFilter,
}

impl Reconciler {
    pub fn new(catalog: impl Into<PathBuf>, media: impl Into<PathBuf>) -> Self {
        Self {
            catalog: catalog.into(),
            media: media.into(),
            filter: MediaFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: MediaFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn catalog(&self) -> &Path {
        &self.catalog
    }

    pub fn media(&self) -> &Path {
        &self.media
    }

    /// Run the catalog phase, then the filesystem phase, writing progress and
    /// totals to `out` and the lists of missing paths to `warn`.
    ///
    /// Only an unopenable catalog is an error. Anything that goes wrong while
    /// reading it ends the catalog phase early and is reported in
    /// [`Summary::outcome`]; the filesystem phase and the report still run.
    #[instrument(skip_all, fields(catalog = %self.catalog.display(), media = %self.media.display()))]
    pub fn run<O: Write, E: Write>(&self, out: &mut O, warn: &mut E) -> Result<Summary> {
        let mut ledger = Ledger::new();
        let outcome = {
            let file = File::open(&self.catalog).or_raise(|| ErrorKind::OpenCatalog(self.catalog.clone()))?;
            writeln!(out, "Starting library tracks evaluation\u{2026}").or_raise(|| ErrorKind::Report)?;
            walk_catalog(BufReader::new(file), &mut ledger)
        };
        match &outcome {
            CatalogOutcome::Complete | CatalogOutcome::Exhausted => {
                tracing::debug!(?outcome, tracks = ledger.statistics().tracks, "Catalog walk finished");
            },
            CatalogOutcome::Mismatch { expected, line } => {
                tracing::warn!(expected, line, "Catalog does not have the expected shape; stopped reading");
            },
            CatalogOutcome::Failed(err) => {
                tracing::error!(error = ?err, "Catalog could not be read to the end");
            },
        }

        report::write_missing_files(warn, ledger.missing_files()).or_raise(|| ErrorKind::Report)?;
        writeln!(out, "Starting media directory evaluation\u{2026}").or_raise(|| ErrorKind::Report)?;
        walk_media(&self.media, &self.filter, &mut ledger);
        report::write_statistics(out, ledger.statistics()).or_raise(|| ErrorKind::Report)?;
        report::write_missing_tracks(warn, ledger.missing_tracks()).or_raise(|| ErrorKind::Report)?;

        Ok(Summary { outcome, ledger })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn unopenable_catalog_is_fatal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let catalog = temp_dir.path().join("missing.xml");
        let reconciler = Reconciler::new(&catalog, temp_dir.path());
        assert_eq!(reconciler.catalog(), catalog);
        assert_eq!(reconciler.media(), temp_dir.path());
        let (mut out, mut warn) = (Vec::new(), Vec::new());
        let err = reconciler.run(&mut out, &mut warn).unwrap_err();
        assert!(matches!(&*err, ErrorKind::OpenCatalog(path) if *path == catalog));
        assert!(out.is_empty());
        assert!(warn.is_empty());
    }

    #[test]
    fn filesystem_phase_runs_after_a_mismatch() {
        let temp_dir = tempfile::tempdir().unwrap();
        let catalog = temp_dir.path().join("Library.xml");
        fs::write(&catalog, "<plist><array></array></plist>").unwrap();
        let media = temp_dir.path().join("Media");
        fs::create_dir(&media).unwrap();
        fs::write(media.join("a.mp3"), b"").unwrap();
        let (mut out, mut warn) = (Vec::new(), Vec::new());
        let summary = Reconciler::new(&catalog, &media).run(&mut out, &mut warn).unwrap();
        assert!(matches!(summary.outcome, CatalogOutcome::Mismatch { .. }));
        assert_eq!(summary.ledger.missing_tracks(), [media.join("a.mp3")]);
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Starting library tracks evaluation\u{2026}\nStarting media directory evaluation\u{2026}\n"));
        assert!(out.contains("\t1 .mp3 file.\n"));
    }

    #[test]
    fn custom_filter_is_applied() {
        let temp_dir = tempfile::tempdir().unwrap();
        let catalog = temp_dir.path().join("Library.xml");
        fs::write(&catalog, "").unwrap();
        let media = temp_dir.path().join("Media");
        fs::create_dir(&media).unwrap();
        fs::write(media.join("cover.jpg"), b"").unwrap();
        fs::write(media.join("a.mp3"), b"").unwrap();
        let filter = MediaFilter::new(["jpg"], Vec::<String>::new());
        let (mut out, mut warn) = (Vec::new(), Vec::new());
        let summary = Reconciler::new(&catalog, &media).with_filter(filter).run(&mut out, &mut warn).unwrap();
        assert!(matches!(summary.outcome, CatalogOutcome::Exhausted));
        assert_eq!(summary.ledger.missing_tracks(), [media.join("a.mp3")]);
    }
}
