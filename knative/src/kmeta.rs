//! Naming helpers for objects owned by another object.
use md5::{Digest, Md5};

/// Longest name a child object may have, the limit of a DNS-1123 label.
pub const MAX_NAME_LENGTH: usize = 63;

/// Hex length of the md5 digest appended to truncated names.
const HASH_LENGTH: usize = 32;

/// Builds the name of a child object from its parent's name and a fixed suffix.
///
/// Names that fit within [`MAX_NAME_LENGTH`] are returned as `parent + suffix`. Longer parent
/// names are truncated and the md5 digest of the full parent name is inserted before the suffix,
/// so two long parents sharing a prefix still map to different children.
pub fn child_name(parent: &str, suffix: &str) -> String {
    if parent.len() + suffix.len() <= MAX_NAME_LENGTH {
        return format!("{parent}{suffix}");
    }

    let keep = MAX_NAME_LENGTH.saturating_sub(suffix.len() + HASH_LENGTH);
    let prefix: String = parent.chars().take(keep).collect();
    format!("{prefix}{:x}{suffix}", Md5::digest(parent.as_bytes()))
}
