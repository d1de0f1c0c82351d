//! Catalog phase: walk an iTunes-style library export and record every
//! track's kind and file location in the [`Ledger`].
//!
//! The export is a property list of a fixed shape:
//!
//! ```xml
//! <plist version="1.0">
//! <dict>
//!     <key>Major Version</key><integer>1</integer>
//!     ...
//!     <key>Tracks</key>
//!     <dict>
//!         <key>101</key>
//!         <dict>
//!             <key>Track ID</key><integer>101</integer>
//!             <key>Kind</key><string>MPEG audio file</string>
//!             <key>Location</key><string>file://localhost/Music/a.mp3</string>
//!         </dict>
//!         ...
//!     </dict>
//!     <key>Playlists</key>
//!     ...
//! </dict>
//! </plist>
//! ```
//!
//! Only `Kind` and `Location` are read; every other key is skipped over by
//! the forward scan. Exports run to hundreds of megabytes, so the document is
//! never held in memory.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use exn::ResultExt;
use percent_encoding::percent_decode_str;
use tracing::instrument;
use tunecheck_plist::error::Result as ScanResult;
use tunecheck_plist::tags::{DICT, KEY, PLIST, STRING};
use tunecheck_plist::{Find, Matcher};
use url::Url;

use crate::error::{Error, ErrorKind};
use crate::ledger::Ledger;

pub const KEY_TRACKS: &str = "Tracks";
pub const KEY_KIND: &str = "Kind";
pub const KEY_LOCATION: &str = "Location";

/// How the catalog phase ended. Every outcome is followed by the filesystem
/// phase; only the log level differs.
#[derive(Debug)]
pub enum CatalogOutcome {
    /// The track collection was read to its closing tag.
    Complete,
    /// The stream ended before the walk did.
    Exhausted,
    /// The document did not have the expected shape; the walk stopped here
    /// and was not resumed.
    Mismatch {
        /// What the walk was looking for.
        expected: &'static str,
        /// Line of the last token consumed.
        line: u64,
    },
    /// The stream could not be read or decoded. Tracks recorded before the
    /// failure are kept.
    Failed(Error),
}
impl CatalogOutcome {
    /// Returns `true` for the two ways a walk can end without anything going wrong.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Complete | Self::Exhausted)
    }
}

/// Walk the catalog read from `reader`, recording tracks in `ledger`.
///
/// Never fails outright: decode errors are returned as
/// [`CatalogOutcome::Failed`] so that whatever was recorded up to that point
/// still gets reported.
#[instrument(skip_all)]
pub fn walk_catalog<R: Read>(reader: R, ledger: &mut Ledger) -> CatalogOutcome {
    let mut matcher = Matcher::new(reader);
    match walk(&mut matcher, ledger).or_raise(|| ErrorKind::Catalog) {
        Ok(outcome) => outcome,
        Err(err) => CatalogOutcome::Failed(err),
    }
}

/// Turn a failed structural search into the outcome that ends the walk.
fn unmet(find: Find, expected: &'static str, line: u64) -> Option<CatalogOutcome> {
    match find {
        Find::Found(()) => None,
        Find::Boundary => Some(CatalogOutcome::Mismatch { expected, line }),
        Find::Exhausted => Some(CatalogOutcome::Exhausted),
    }
}

fn walk<R: Read>(m: &mut Matcher<R>, ledger: &mut Ledger) -> ScanResult<CatalogOutcome> {
    if let Some(outcome) = unmet(m.find_element(PLIST, PLIST)?, "root <plist>", m.line()) {
        return Ok(outcome);
    }
    if let Some(outcome) = unmet(m.find_element(DICT, PLIST)?, "top-level <dict>", m.line()) {
        return Ok(outcome);
    }
    if let Some(outcome) = unmet(m.find_key(KEY_TRACKS)?, "Tracks key", m.line()) {
        return Ok(outcome);
    }
    if let Some(outcome) = unmet(m.find_element(DICT, DICT)?, "Tracks <dict>", m.line()) {
        return Ok(outcome);
    }
    loop {
        match m.find_element(KEY, DICT)? {
            Find::Found(()) => {},
            Find::Boundary => return Ok(CatalogOutcome::Complete),
            Find::Exhausted => return Ok(CatalogOutcome::Exhausted),
        }
        if let Some(outcome) = unmet(m.find_element(DICT, DICT)?, "track <dict>", m.line()) {
            return Ok(outcome);
        }
        if let Some(outcome) = track(m, ledger)? {
            return Ok(outcome);
        }
    }
}

/// Read the fields of one track dictionary, leaving the stream just past
/// its closing `</dict>`.
///
/// Fields are matched in whatever order they appear, each as often as it
/// appears. A field without a `<string>` value ends the track.
fn track<R: Read>(m: &mut Matcher<R>, ledger: &mut Ledger) -> ScanResult<Option<CatalogOutcome>> {
    loop {
        let field = match m.find_any_key(&[KEY_KIND, KEY_LOCATION])? {
            Find::Found(field) => field,
            Find::Boundary => return Ok(None),
            Find::Exhausted => return Ok(Some(CatalogOutcome::Exhausted)),
        };
        match m.find_element(STRING, DICT)? {
            Find::Found(()) => {},
            Find::Boundary => return Ok(None),
            Find::Exhausted => return Ok(Some(CatalogOutcome::Exhausted)),
        }
        let value = m.text()?;
        match field {
            KEY_KIND => ledger.record_kind(&value),
            _ => record_location(ledger, &value, m.line()),
        }
    }
}

fn record_location(ledger: &mut Ledger, location: &str, line: u64) {
    if location.is_empty() {
        return;
    }
    let Some(path) = location_path(location) else {
        tracing::debug!(location, line, "Skipping undecodable track location");
        return;
    };
    // Anything that can't be stat'ed, for whatever reason, is missing.
    let exists = fs::metadata(&path).is_ok();
    ledger.record_track(path, exists);
}

/// Decode a location URI into the path it names.
///
/// Scheme and host are not checked: a stream or a file on another machine
/// still names a path, which is then simply missing locally. Only text that
/// does not parse as a URI, or whose path is empty, is undecodable.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use tunecheck_library::location_path;
///
/// assert_eq!(
///     location_path("file://localhost/Music/iTunes/iTunes%20Music/a.mp3"),
///     Some(PathBuf::from("/Music/iTunes/iTunes Music/a.mp3")),
/// );
/// assert_eq!(location_path("http://example.com/stream.mp3"), Some(PathBuf::from("/stream.mp3")));
/// assert_eq!(location_path("not a uri"), None);
/// ```
pub fn location_path(location: &str) -> Option<PathBuf> {
    let url = Url::parse(location).ok()?;
    let path = percent_decode_str(url.path()).decode_utf8().ok()?;
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path.as_ref()))
}
