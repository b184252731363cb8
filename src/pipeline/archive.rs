//! Archive packing: every successful image into one ZIP.
//!
//! Entry names are derived from the payload: `<payload>.png`, with `-2`,
//! `-3`, … appended to repeats in batch order. Names are sanitised and
//! length-capped first so each entry sits at the archive root and can be
//! extracted anywhere. All entries carry the same fixed timestamp, so the
//! same successes always produce the same bytes.

use crate::config::ArchiveCompression;
use crate::error::BatchError;
use crate::pipeline::render::RenderedSymbol;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Default file name when the archive is delivered as a download.
pub const DEFAULT_ARCHIVE_NAME: &str = "barcodes.zip";

/// Longest sanitised base name in bytes. Leaves room for `-N.png` under the
/// 255-byte file name limit of common filesystems.
pub const MAX_NAME_BYTES: usize = 200;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[/\\\x00-\x1F\x7F]").unwrap());
static LEADING_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.+").unwrap());

/// A serialised ZIP plus the names of its entries, in write order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub bytes: Vec<u8>,
    pub entries: Vec<String>,
}

impl Archive {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replace path separators, control characters and leading dots with `_`,
/// then cut the result to [`MAX_NAME_BYTES`] on a character boundary.
pub fn sanitize_name(payload: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(payload, "_");
    let mut name = LEADING_DOTS
        .replace(&cleaned, |caps: &Captures| "_".repeat(caps[0].len()))
        .into_owned();

    if name.len() > MAX_NAME_BYTES {
        let mut end = MAX_NAME_BYTES;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}

/// Unique `.png` entry names for `payloads`, in order.
pub fn entry_names<'a, I>(payloads: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut used = HashSet::new();
    let mut names = Vec::new();

    for payload in payloads {
        let base = sanitize_name(payload);
        let mut name = format!("{base}.png");
        let mut n = 2;
        while used.contains(&name) {
            name = format!("{base}-{n}.png");
            n += 1;
        }
        used.insert(name.clone());
        names.push(name);
    }

    names
}

/// Pack `successes` into a ZIP, one entry per item.
pub fn build_archive(
    successes: &[&RenderedSymbol],
    compression: ArchiveCompression,
) -> Result<Archive, BatchError> {
    let names = entry_names(successes.iter().map(|s| s.payload.as_str()));

    let method = match compression {
        ArchiveCompression::Stored => CompressionMethod::Stored,
        ArchiveCompression::Deflated => CompressionMethod::Deflated,
    };
    let options = SimpleFileOptions::default()
        .compression_method(method)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, item) in names.iter().zip(successes) {
        writer
            .start_file(name.as_str(), options)
            .map_err(archive_error)?;
        writer.write_all(&item.png).map_err(archive_error)?;
    }
    let bytes = writer.finish().map_err(archive_error)?.into_inner();

    debug!("Archived {} entries → {} bytes", names.len(), bytes.len());
    Ok(Archive {
        bytes,
        entries: names,
    })
}

fn archive_error(e: impl std::fmt::Display) -> BatchError {
    BatchError::Archive {
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn rendered(payload: &str) -> RenderedSymbol {
        RenderedSymbol {
            position: 0,
            payload: payload.into(),
            png: format!("png:{payload}").into_bytes(),
        }
    }

    fn read_back(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
        (0..zip.len())
            .map(|i| {
                let mut file = zip.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn duplicates_get_numeric_suffixes() {
        assert_eq!(
            entry_names(["X1", "X1", "X2"]),
            vec!["X1.png", "X1-2.png", "X2.png"]
        );
        assert_eq!(
            entry_names(["A", "A", "A"]),
            vec!["A.png", "A-2.png", "A-3.png"]
        );
    }

    #[test]
    fn generated_name_never_collides_with_literal() {
        assert_eq!(
            entry_names(["X1", "X1", "X1-2"]),
            vec!["X1.png", "X1-2.png", "X1-2-2.png"]
        );
        assert_eq!(
            entry_names(["X1-2", "X1", "X1"]),
            vec!["X1-2.png", "X1.png", "X1-3.png"]
        );
    }

    #[test]
    fn sanitizes_paths() {
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name("tab\there"), "tab_here");
        assert_eq!(sanitize_name("../etc"), "___etc");
        assert_eq!(sanitize_name(".hidden"), "_hidden");
        assert_eq!(sanitize_name("v1.2"), "v1.2");
    }

    #[test]
    fn long_names_are_cut_to_the_byte_budget() {
        let long = "A".repeat(70_000);
        assert_eq!(sanitize_name(&long).len(), MAX_NAME_BYTES);

        // 'é' is two bytes; the cut must not split one.
        let accented = "é".repeat(MAX_NAME_BYTES);
        let name = sanitize_name(&format!("x{accented}"));
        assert!(name.len() <= MAX_NAME_BYTES);
        assert!(name.starts_with("xé"));
    }

    #[test]
    fn truncated_names_still_deduplicate() {
        let a = format!("{}1", "A".repeat(MAX_NAME_BYTES));
        let b = format!("{}2", "A".repeat(MAX_NAME_BYTES));
        let names = entry_names([a.as_str(), b.as_str()]);
        assert_eq!(names[0], format!("{}.png", "A".repeat(MAX_NAME_BYTES)));
        assert_eq!(names[1], format!("{}-2.png", "A".repeat(MAX_NAME_BYTES)));
    }

    #[test]
    fn oversized_payload_still_archives() {
        let long = "A".repeat(70_000);
        let items = [rendered("OK1"), rendered(&long), rendered("OK2")];
        let refs: Vec<&RenderedSymbol> = items.iter().collect();
        let archive = build_archive(&refs, ArchiveCompression::Deflated).unwrap();

        let files = read_back(&archive.bytes);
        assert_eq!(files.len(), 3);
        assert_eq!(files[1].0.len(), MAX_NAME_BYTES + ".png".len());
        assert_eq!(files[2].0, "OK2.png");
    }

    #[test]
    fn sanitized_names_are_deduplicated() {
        assert_eq!(entry_names(["a/b", "a_b"]), vec!["a_b.png", "a_b-2.png"]);
    }

    #[test]
    fn archive_contains_every_success_in_order() {
        let items = [rendered("X1"), rendered("X1"), rendered("X2")];
        let refs: Vec<&RenderedSymbol> = items.iter().collect();
        let archive = build_archive(&refs, ArchiveCompression::Deflated).unwrap();

        assert_eq!(archive.entries, vec!["X1.png", "X1-2.png", "X2.png"]);
        let files = read_back(&archive.bytes);
        assert_eq!(files.len(), 3);
        assert_eq!(files[0], ("X1.png".to_string(), b"png:X1".to_vec()));
        assert_eq!(files[2].0, "X2.png");
    }

    #[test]
    fn empty_archive_is_valid() {
        let archive = build_archive(&[], ArchiveCompression::Deflated).unwrap();
        assert!(archive.is_empty());
        assert!(read_back(&archive.bytes).is_empty());
    }

    #[test]
    fn identical_input_gives_identical_bytes() {
        let items = [rendered("A"), rendered("B")];
        let refs: Vec<&RenderedSymbol> = items.iter().collect();
        let a = build_archive(&refs, ArchiveCompression::Deflated).unwrap();
        let b = build_archive(&refs, ArchiveCompression::Deflated).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn stored_entries_are_uncompressed() {
        let items = [rendered("A")];
        let refs: Vec<&RenderedSymbol> = items.iter().collect();
        let archive = build_archive(&refs, ArchiveCompression::Stored).unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        let file = zip.by_index(0).unwrap();
        assert_eq!(file.compression(), CompressionMethod::Stored);
    }
}
