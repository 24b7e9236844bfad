/// Substrings that may never appear in a path segment, in replacement order.
pub const UNSAFE_SUBSTRINGS: [&str; 2] = ["..", "/"];

pub const REPLACEMENT: &str = "_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName {
    pub name: String,
    /// Unsafe substrings that were found in the raw input.
    pub replaced: Vec<&'static str>,
    /// The whole name was a segment the filesystem resolves specially.
    pub reserved: bool,
}

impl SanitizedName {
    pub fn was_modified(&self) -> bool {
        !self.replaced.is_empty() || self.reserved
    }

    pub fn into_name(self) -> String {
        self.name
    }
}

/// Rewrite `raw` so it is usable as a single filesystem path segment.
///
/// Every parent-directory marker and path separator becomes `_`. Replacement
/// repeats until neither remains, so the result is a fixed point: sanitizing
/// it again changes nothing.
pub fn sanitize_segment(raw: &str) -> SanitizedName {
    let mut name = raw.to_string();
    let mut replaced = Vec::new();
    loop {
        let mut changed = false;
        for unsafe_part in UNSAFE_SUBSTRINGS {
            if name.contains(unsafe_part) {
                name = name.replace(unsafe_part, REPLACEMENT);
                if !replaced.contains(&unsafe_part) {
                    replaced.push(unsafe_part);
                }
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    SanitizedName {
        name,
        replaced,
        reserved: false,
    }
}
