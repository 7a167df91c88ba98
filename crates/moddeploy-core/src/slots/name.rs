//! Archive chunk/patch file name parsing.

use std::sync::OnceLock;

use regex::Regex;

/// Parsed archive file name: `chunk<N>.rpkg` or `chunk<N>patch<M>.rpkg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotName {
    pub chunk_index: u64,
    pub patch_index: Option<u64>,
}

impl SlotName {
    /// Parse a patch file name.
    ///
    /// Everything after `patch` may hold several digit runs
    /// (`chunk0patch1_250.rpkg`); the last run is the patch index, which is
    /// how the archive loader orders patches. Returns `None` when the name is
    /// not a patch file or carries no patch digits.
    pub fn parse_patch(file_name: &str) -> Option<Self> {
        static PATCH_RE: OnceLock<Regex> = OnceLock::new();
        static DIGITS_RE: OnceLock<Regex> = OnceLock::new();
        let patch_re = PATCH_RE
            .get_or_init(|| Regex::new(r"(?i)^chunk(\d+)patch(.*)\.rpkg$").expect("valid regex"));
        let digits_re = DIGITS_RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"));

        let caps = patch_re.captures(file_name)?;
        let chunk_index = parse_index(&caps[1]);
        let patch_index = digits_re
            .find_iter(&caps[2])
            .last()
            .map(|m| parse_index(m.as_str()))?;

        Some(Self {
            chunk_index,
            patch_index: Some(patch_index),
        })
    }

    /// Parse a primary chunk file name.
    pub fn parse_chunk(file_name: &str) -> Option<Self> {
        static CHUNK_RE: OnceLock<Regex> = OnceLock::new();
        let chunk_re =
            CHUNK_RE.get_or_init(|| Regex::new(r"(?i)^chunk(\d+)\.rpkg$").expect("valid regex"));

        let caps = chunk_re.captures(file_name)?;
        Some(Self {
            chunk_index: parse_index(&caps[1]),
            patch_index: None,
        })
    }

    /// Parse either form, patch first.
    pub fn parse(file_name: &str) -> Option<Self> {
        Self::parse_patch(file_name).or_else(|| Self::parse_chunk(file_name))
    }

    pub fn is_patch(&self) -> bool {
        self.patch_index.is_some()
    }
}

/// Digit runs too long for `u64` saturate; they are still past any limit.
fn parse_index(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}
