//! Plain-text reporting of a finished [`Ledger`](crate::Ledger).
//!
//! Path lists go to the warning stream, totals to the regular output, so the
//! two can be redirected separately.

use std::io::{self, Write};
use std::path::PathBuf;

use crate::ledger::Statistics;

fn plural(count: u64) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn write_paths<W: Write>(out: &mut W, heading: &str, paths: &[PathBuf]) -> io::Result<()> {
    if paths.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n{heading}")?;
    for path in paths {
        writeln!(out, "{}", path.display())?;
    }
    Ok(())
}

/// Catalog tracks whose file is gone. Nothing is written when there are none.
pub fn write_missing_files<W: Write>(out: &mut W, paths: &[PathBuf]) -> io::Result<()> {
    write_paths(out, "The following tracks were not found in your media files:", paths)?;
    if !paths.is_empty() {
        writeln!(out)?;
    }
    Ok(())
}

/// Media files that no catalog track refers to. Nothing is written when there
/// are none.
pub fn write_missing_tracks<W: Write>(out: &mut W, paths: &[PathBuf]) -> io::Result<()> {
    write_paths(out, "The following media files were not found in your tracks:", paths)
}

/// Track totals per kind, then file totals per extension.
///
/// ```text
///
/// Found 3 total tracks:
///     2 MPEG audio files.
///     1 AAC audio file.
///
/// Found 4 total files:
///     3 .mp3 files.
///     1 .m4a file.
/// ```
pub fn write_statistics<W: Write>(out: &mut W, stats: &Statistics) -> io::Result<()> {
    writeln!(out, "\nFound {} total tracks:", stats.tracks)?;
    for (kind, &count) in &stats.kinds {
        writeln!(out, "\t{count} {kind}{}.", plural(count))?;
    }
    writeln!(out, "\nFound {} total files:", stats.files)?;
    for (extension, &count) in &stats.extensions {
        writeln!(out, "\t{count} {extension} file{}.", plural(count))?;
    }
    Ok(())
}
