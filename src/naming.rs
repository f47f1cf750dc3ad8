//! Output filename generation.
//!
//! Every converted file is named after its source:
//!
//! - `photo.HEIC` + JPEG → `photo_converted.jpg`
//! - `scan.final.png` + WebP → `scan.final_converted.webp`
//! - `README` + PNG → `README_converted.png`
//!
//! Only the last extension is stripped. The new extension is always the
//! lowercase one for the target MIME type, `jpg` when the type is unknown.
//!
//! ## Archive entries
//!
//! Two sources can map to the same output name (`a.png` and `a.jpg` both
//! becoming `a_converted.webp`). [`disambiguate`] keeps archive entries
//! unique by numbering repeats: `a_converted.webp`, `a_converted-2.webp`, ...

use crate::format::OutputFormat;
use std::collections::HashSet;

/// Suffix appended to the source stem.
pub const CONVERTED_SUFFIX: &str = "_converted";

/// Extension used when the target MIME type is not recognised.
pub const FALLBACK_EXTENSION: &str = "jpg";

/// Remove the last `.ext` from a filename.
///
/// A trailing dot or a dot inside a directory part is not an extension.
pub fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(dot) => {
            let ext = &filename[dot + 1..];
            if ext.is_empty() || ext.contains('/') {
                filename
            } else {
                &filename[..dot]
            }
        }
        None => filename,
    }
}

/// Lowercase extension for a MIME type.
pub fn extension_for_mime(mime: &str) -> &'static str {
    OutputFormat::from_mime(mime)
        .map(OutputFormat::extension)
        .unwrap_or(FALLBACK_EXTENSION)
}

/// `<stem>_converted.<ext>` for a source name and target MIME type.
pub fn converted_filename(original: &str, target_mime: &str) -> String {
    format!(
        "{}{CONVERTED_SUFFIX}.{}",
        strip_extension(original),
        extension_for_mime(target_mime)
    )
}

/// Make `name` unique among `taken`, recording the result.
pub fn disambiguate(name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }

    let stem = strip_extension(name);
    let ext = &name[stem.len()..];
    let mut n = 2;
    loop {
        let candidate = format!("{stem}-{n}{ext}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
