//! # Alias Naming
//!
//! Builds short, stable file names for alias files on printer storage.
//!
//! ## Algorithm
//! ```text
//! "Big Benchy (v2).GCODE"
//!      │  strip ".gcode" (any case), lower-case
//!      ▼
//! "big benchy (v2)"
//!      │  runs of non-alphanumerics → "_", trim "_"
//!      ▼
//! "big_benchy_v2" ──────────────┐
//!      │ first 12 chars,        │ sha1, first 6 hex
//!      │ trailing "_" trimmed   │
//!      ▼                        ▼
//! "big_benchy_v"              "3f9a1c"
//!      └──────────┬─────────────┘
//!                 ▼
//!    "big_benchy_v_3f9a1c.gcode"
//! ```
//!
//! The name depends only on its input, so the host can recompute the alias
//! of any file without reading printer storage. Two different inputs share
//! an alias only if their hashes collide in the first 6 hex digits; that
//! risk is accepted.

use sha1::{Digest, Sha1};

/// Number of normalized characters kept before the hash.
pub const PREFIX_LEN: usize = 12;

/// Number of hex digits of the hash kept in the name.
pub const HASH_LEN: usize = 6;

const EXTENSION: &str = ".gcode";

/// Returns the short alias file name for `original`.
///
/// Never panics; empty or symbol-only input yields an empty prefix
/// (`_<hash>.gcode`).
pub fn short_name(original: &str) -> String {
    let base = normalize(original);

    let digest = Sha1::digest(base.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_LEN);

    let prefix: String = base.chars().take(PREFIX_LEN).collect();
    let prefix = prefix.trim_end_matches('_');

    format!("{prefix}_{hash}{EXTENSION}")
}

/// Lower-cased base name with separators collapsed to single underscores.
fn normalize(original: &str) -> String {
    let lower = original.to_lowercase();
    let stem = lower.strip_suffix(EXTENSION).unwrap_or(&lower);

    let mut base = String::with_capacity(stem.len());
    let mut in_gap = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            base.push(c);
            in_gap = false;
        } else if !in_gap {
            base.push('_');
            in_gap = true;
        }
    }

    base.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(name: &str) -> (&str, &str) {
        let stem = name.strip_suffix(".gcode").expect("alias ends with .gcode");
        stem.rsplit_once('_').expect("alias has a hash suffix")
    }

    #[test]
    fn test_deterministic() {
        for input in ["cube.gcode", "Benchy (0.2mm).gcode", "", "///", "ünïcødé"] {
            assert_eq!(short_name(input), short_name(input));
        }
    }

    #[test]
    fn test_shape_and_bounded_length() {
        let long = "a very long file name ".repeat(50);
        for input in ["cube.gcode", long.as_str(), "x"] {
            let name = short_name(input);
            let (prefix, hash) = split(&name);
            assert!(prefix.len() <= PREFIX_LEN);
            assert_eq!(hash.len(), HASH_LEN);
            assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
            assert!(name.len() <= PREFIX_LEN + 1 + HASH_LEN + EXTENSION.len());
        }
    }

    #[test]
    fn test_hash_is_sha1_prefix() {
        // sha1("") = da39a3ee..., sha1("abc") = a9993e36...
        assert_eq!(short_name(""), "_da39a3.gcode");
        assert_eq!(short_name("ABC.gcode"), "abc_a9993e.gcode");
    }

    #[test]
    fn test_extension_stripped_case_insensitively() {
        assert_eq!(short_name("Foo.GCODE"), short_name("foo"));
        assert_eq!(short_name("foo.gcode"), short_name("FOO"));
    }

    #[test]
    fn test_separators_collapse() {
        let name = short_name("  My--Part  v2 .gcode");
        assert!(name.starts_with("my_part_v2_"));
        assert_eq!(short_name("my part v2"), short_name("my__part___v2"));
    }

    #[test]
    fn test_prefix_trailing_underscore_trimmed() {
        // normalized "abcdefghijk_lmn": 12th char is '_'
        let name = short_name("abcdefghijk lmn");
        assert!(name.starts_with("abcdefghijk_"));
        let (prefix, _) = split(&name);
        assert_eq!(prefix, "abcdefghijk");
    }

    #[test]
    fn test_empty_and_symbol_only_input() {
        let empty = short_name("");
        assert!(empty.starts_with('_'));
        assert_eq!(short_name("!!!.gcode"), empty);
    }

    #[test]
    fn test_different_inputs_differ() {
        assert_ne!(short_name("part_a"), short_name("part_b"));
        // Same 12-char prefix, different tails
        assert_ne!(
            short_name("calibration_cube_small"),
            short_name("calibration_cube_large")
        );
    }
}
