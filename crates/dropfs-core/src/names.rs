//! Name normalization for lookups.
//!
//! Snapshot names are stored in NFC. Kernels (notably macOS) can hand us
//! decomposed names, so every incoming name is normalized before matching.

use std::borrow::Cow;
use std::ffi::OsStr;
use unicode_normalization::{is_nfc_quick, IsNormalized, UnicodeNormalization};

/// Marker that starts hidden file names (`.DS_Store`, `._foo`, `.hidden`).
pub const HIDDEN_MARKER: u8 = b'.';

/// Returns `name` in canonical composed form (NFC).
///
/// Borrows when the input is already known to be NFC.
pub fn normalize(name: &str) -> Cow<'_, str> {
    match is_nfc_quick(name.chars()) {
        IsNormalized::Yes => Cow::Borrowed(name),
        IsNormalized::No | IsNormalized::Maybe => Cow::Owned(name.nfc().collect()),
    }
}

/// Decodes a raw kernel name as UTF-8 and normalizes it.
///
/// Returns `None` for names that are not valid UTF-8; those can never match
/// a snapshot entry.
pub fn decode_os_name(name: &OsStr) -> Option<Cow<'_, str>> {
    name.to_str().map(normalize)
}

/// Returns true if the raw name starts with the hidden-file marker.
pub fn is_hidden(name: &OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&HIDDEN_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_nfd_input_normalizes_to_nfc() {
        let nfd = "cafe\u{0301}.txt";
        let nfc = "caf\u{00E9}.txt";
        assert_eq!(normalize(nfd), nfc);
    }

    #[test]
    fn test_ascii_is_borrowed() {
        assert!(matches!(normalize("readme.md"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_hangul_jamo_composes() {
        // U+1112 U+1161 U+11AB composes to U+D55C
        assert_eq!(normalize("\u{1112}\u{1161}\u{11AB}"), "\u{D55C}");
    }

    #[test]
    fn test_hidden_marker() {
        assert!(is_hidden(OsStr::new(".DS_Store")));
        assert!(is_hidden(OsStr::new("._resource")));
        assert!(!is_hidden(OsStr::new("visible.txt")));
        assert!(!is_hidden(OsStr::new("")));
    }

    #[cfg(unix)]
    #[test]
    fn test_invalid_utf8_is_rejected() {
        use std::os::unix::ffi::OsStrExt;
        let raw = OsStr::from_bytes(b"bad\xff");
        assert!(decode_os_name(raw).is_none());
        assert!(!is_hidden(raw));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "\\PC{0,24}") {
            let once = normalize(&s).into_owned();
            let twice = normalize(&once).into_owned();
            prop_assert_eq!(once, twice);
        }
    }
}
