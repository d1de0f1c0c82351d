//! Reconciles an iTunes-style library catalog against the media directory it
//! describes.
//!
//! The [catalog phase](walk_catalog) streams the catalog export and records
//! every track's kind and location in a [`Ledger`]. The
//! [filesystem phase](walk_media) then walks the media directory and flags
//! every file the catalog does not know about. [`Reconciler`] runs both and
//! writes the report.

mod catalog;
pub mod error;
mod ledger;
mod media;
mod reconcile;
pub mod report;

pub use crate::catalog::{CatalogOutcome, KEY_KIND, KEY_LOCATION, KEY_TRACKS, location_path, walk_catalog};
pub use crate::ledger::{Ledger, Statistics};
pub use crate::media::{DEFAULT_BUNDLE_EXTENSIONS, DEFAULT_IGNORED_EXTENSIONS, MediaFilter, extension, walk_media};
pub use crate::reconcile::{Reconciler, Summary};
