//! Structural navigation of property-list dictionaries without building a tree.
//!
//! A plist dictionary is a flat run of `<key>` elements, each followed by its
//! value element:
//!
//! ```xml
//! <dict>
//!     <key>Kind</key><string>MPEG audio file</string>
//!     <key>Location</key><string>file:///music/a.mp3</string>
//! </dict>
//! ```
//!
//! The [`Matcher`] only ever moves forward. Tags are matched on their name
//! alone, never on nesting depth, so a search bounded by `</dict>` stops at
//! the first `</dict>` of any depth. That is sufficient for catalogs of a
//! known, well-formed shape; it is not a general plist reader. Values
//! wrapped in CDATA sections are not seen either: [`Matcher::text`] yields an
//! empty string for them.

use std::io::Read;

use crate::error::Result;
use crate::scanner::{Scanner, Token};

/// Tag names of the property-list vocabulary.
pub mod tags {
    pub const PLIST: &str = "plist";
    pub const DICT: &str = "dict";
    pub const KEY: &str = "key";
    pub const STRING: &str = "string";
}

/// Outcome of a forward search.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Find<T = ()> {
    /// The target was located; the stream is positioned just after it.
    Found(T),
    /// The boundary end-tag appeared before the target. The boundary tag
    /// itself has been consumed.
    Boundary,
    /// The stream ended before either appeared.
    Exhausted,
}
impl<T> Find<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Forward-only search primitives over a [`Scanner`].
pub struct Matcher<R> {
    scanner: Scanner<R>,
}

impl<R: Read> Matcher<R> {
    pub fn new(reader: R) -> Self {
        Self::from_scanner(Scanner::new(reader))
    }

    pub fn from_scanner(scanner: Scanner<R>) -> Self {
        Self { scanner }
    }

    /// Source line of the most recently consumed token.
    pub fn line(&self) -> u64 {
        self.scanner.line()
    }

    /// Advance to the next `<target>` start-tag, giving up as soon as a
    /// `</boundary>` end-tag is seen.
    ///
    /// # Examples
    ///
    /// ```
    /// use tunecheck_plist::{Find, Matcher};
    ///
    /// let mut matcher = Matcher::new("<dict><key>A</key></dict><string>".as_bytes());
    /// assert_eq!(matcher.find_element("string", "dict").unwrap(), Find::Boundary);
    /// assert_eq!(matcher.find_element("string", "dict").unwrap(), Find::Found(()));
    /// assert_eq!(matcher.find_element("string", "dict").unwrap(), Find::Exhausted);
    /// ```
    pub fn find_element(&mut self, target: &str, boundary: &str) -> Result<Find> {
        while let Some(token) = self.scanner.next_token()? {
            if token.is_start(target) {
                return Ok(Find::Found(()));
            }
            if token.is_end(boundary) {
                return Ok(Find::Boundary);
            }
        }
        Ok(Find::Exhausted)
    }

    /// Advance past the `<key>` whose text is exactly `name`, within the
    /// current dictionary.
    ///
    /// Returns [`Find::Boundary`] when a `</dict>` closes before the key is
    /// found.
    pub fn find_key(&mut self, name: &str) -> Result<Find> {
        Ok(match self.find_any_key(&[name])? {
            Find::Found(_) => Find::Found(()),
            Find::Boundary => Find::Boundary,
            Find::Exhausted => Find::Exhausted,
        })
    }

    /// Like [`find_key`](Self::find_key), but stops at the first key matching
    /// any of `names` and returns which one it was.
    pub fn find_any_key<'n>(&mut self, names: &[&'n str]) -> Result<Find<&'n str>> {
        loop {
            match self.find_element(tags::KEY, tags::DICT)? {
                Find::Found(()) => {},
                Find::Boundary => return Ok(Find::Boundary),
                Find::Exhausted => return Ok(Find::Exhausted),
            }
            let key = self.text()?;
            if let Some(name) = names.iter().find(|name| **name == key) {
                return Ok(Find::Found(*name));
            }
        }
    }

    /// Read exactly one token, returning its character data.
    ///
    /// Anything other than character data (including the end of the stream)
    /// yields an empty string, which callers must treat as "no usable value"
    /// rather than as an empty value.
    pub fn text(&mut self) -> Result<String> {
        Ok(match self.scanner.next_token()? {
            Some(Token::Text(text)) => text,
            _ => String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    fn matcher(doc: &str) -> Matcher<&[u8]> {
        Matcher::new(doc.as_bytes())
    }

    #[test]
    fn find_element_stops_at_target() {
        let mut m = matcher("<plist><dict><key>Tracks</key></dict></plist>");
        assert_eq!(m.find_element("dict", "plist").unwrap(), Find::Found(()));
        assert_eq!(m.find_element("key", "dict").unwrap(), Find::Found(()));
        assert_eq!(m.text().unwrap(), "Tracks");
    }

    #[test]
    fn find_element_boundary_is_final() {
        // Without an early exit the search would run on to the `<key>` after
        // the boundary.
        let mut m = matcher("<dict><integer>1</integer></dict><key>Next</key>");
        assert_eq!(m.find_element("key", "dict").unwrap(), Find::Boundary);
        // Positioned immediately after the boundary.
        assert_eq!(m.find_element("key", "dict").unwrap(), Find::Found(()));
        assert_eq!(m.text().unwrap(), "Next");
    }

    #[test]
    fn find_element_matches_names_not_depth() {
        let mut m = matcher("<dict><key>A</key><dict></dict><key>B</key></dict>");
        assert_eq!(m.find_element("dict", "dict").unwrap(), Find::Found(()));
        assert_eq!(m.find_element("dict", "dict").unwrap(), Find::Found(()));
        // The nested dictionary's end tag ends the search.
        assert_eq!(m.find_element("key", "dict").unwrap(), Find::Boundary);
    }

    #[test]
    fn find_element_exhausts() {
        let mut m = matcher("<plist><array></array>");
        assert_eq!(m.find_element("dict", "plist").unwrap(), Find::Exhausted);
        assert_eq!(m.find_element("dict", "plist").unwrap(), Find::Exhausted);
    }

    #[rstest]
    #[case("<key>Name</key><string>x</string><key>Kind</key><string>y</string>", Find::Found(()))]
    #[case("<key>Name</key><string>x</string></dict><key>Kind</key>", Find::Boundary)]
    #[case("<key>Name</key><string>Kind</string>", Find::Exhausted)]
    #[case("<key>Kinds</key><key> Kind</key>", Find::Exhausted)]
    fn find_key(#[case] doc: &str, #[case] expected: Find) {
        assert_eq!(matcher(doc).find_key("Kind").unwrap(), expected);
    }

    #[test]
    fn cdata_value_reads_as_empty() {
        let mut m = matcher("<key>Location</key><string><![CDATA[file:///a.mp3]]></string>");
        assert!(m.find_key("Location").unwrap().is_found());
        assert_eq!(m.find_element("string", "dict").unwrap(), Find::Found(()));
        assert_eq!(m.text().unwrap(), "");
    }

    #[test]
    fn find_key_leaves_stream_before_value() {
        let mut m = matcher("<key>Kind</key><string>MPEG audio file</string>");
        assert!(m.find_key("Kind").unwrap().is_found());
        assert_eq!(m.find_element("string", "dict").unwrap(), Find::Found(()));
        assert_eq!(m.text().unwrap(), "MPEG audio file");
    }

    #[test]
    fn find_any_key_reports_first_match() {
        let mut m = matcher(concat!(
            "<key>Location</key><string>file:///a.mp3</string>",
            "<key>Size</key><integer>1</integer>",
            "<key>Kind</key><string>AAC audio file</string>",
            "</dict>",
        ));
        let names = ["Kind", "Location"];
        assert_eq!(m.find_any_key(&names).unwrap(), Find::Found("Location"));
        assert_eq!(m.find_any_key(&names).unwrap(), Find::Found("Kind"));
        assert_eq!(m.find_any_key(&names).unwrap(), Find::Boundary);
    }

    #[rstest]
    #[case("<string>value</string>", "value")]
    #[case("<string></string>", "")]
    #[case("<string><b>bold</b></string>", "")]
    #[case("<string>", "")]
    fn text_after_start(#[case] doc: &str, #[case] expected: &str) {
        let mut m = matcher(doc);
        assert!(m.find_element("string", "dict").unwrap().is_found());
        assert_eq!(m.text().unwrap(), expected);
    }

    #[test]
    fn decode_errors_propagate() {
        let mut m = Matcher::new(&b"<dict><key>\xff</key>"[..]);
        let err = m.find_key("Tracks").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Decode { .. }));
    }
}
