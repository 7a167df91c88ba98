//! Installed-variant detection.
//!
//! The platform is advisory: it feeds logging and the cache's target digest
//! and never blocks a deployment. Every failure downgrades to
//! [`Platform::Unknown`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Digest recorded when no marker file could be hashed.
pub const UNKNOWN_DIGEST: &str = "unknown";

/// Marker digests of the known storefront builds.
const KNOWN_BUILDS: [(&str, Platform); 5] = [
    ("bf93b21877ca6b94b99af14832497028", Platform::Epic),
    ("39f48db74dbee602942c13af061f62e0", Platform::Epic),
    ("09d6139753bc619570860707dc8a05d4", Platform::Steam),
    ("f435b7d6be29b772d7193f507cb4dab1", Platform::Steam),
    ("46c8230da02f8194fc8b1ee20b61d3af", Platform::Microsoft),
];

/// Store-app config next to the game root, present on Microsoft installs.
pub const STORE_CONFIG_MARKER: &str = "MicrosoftGame.Config";

/// Game executable under `Retail/`, present on every other install.
pub const EXECUTABLE_MARKER: &str = "Retail/HITMAN3.exe";

/// Lowercase hex MD5 of a marker file's content.
pub fn marker_digest(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

/// Marker file to hash for an install.
///
/// Microsoft builds keep their chunks under `Retail/Runtime`, and only they
/// ship the store config; everything else is identified by its executable.
pub fn install_markers(retail_path: &Path, runtime_path: &Path) -> Vec<PathBuf> {
    let store_layout = retail_path.join("Runtime").join("chunk0.rpkg").is_file();
    let marker = if store_layout {
        parent_or_self(retail_path).join(STORE_CONFIG_MARKER)
    } else {
        parent_or_self(runtime_path).join(EXECUTABLE_MARKER)
    };
    vec![marker]
}

fn parent_or_self(path: &Path) -> &Path {
    path.parent().unwrap_or(path)
}

/// Storefront build of the target application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Epic,
    Steam,
    Microsoft,
    Unknown,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Epic => "epic",
            Platform::Steam => "steam",
            Platform::Microsoft => "microsoft",
            Platform::Unknown => "unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "epic" => Some(Platform::Epic),
            "steam" => Some(Platform::Steam),
            "microsoft" => Some(Platform::Microsoft),
            "unknown" => Some(Platform::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker digest -> platform lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestTable {
    entries: BTreeMap<String, Platform>,
}

impl DigestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table of the known storefront builds.
    pub fn builtin() -> Self {
        KNOWN_BUILDS
            .iter()
            .fold(Self::new(), |table, (digest, platform)| {
                table.with_entry(*digest, *platform)
            })
    }

    /// Add `digest -> platform name` pairs, skipping unknown names. Later
    /// entries replace earlier ones for the same digest.
    pub fn with_names<'a>(
        mut self,
        pairs: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Self {
        for (digest, name) in pairs {
            match Platform::from_name(name) {
                Some(platform) => {
                    self.entries.insert(digest.to_ascii_lowercase(), platform);
                }
                None => tracing::debug!("Ignoring platform entry {} = {}", digest, name),
            }
        }
        self
    }

    pub fn with_entry(mut self, digest: impl Into<String>, platform: Platform) -> Self {
        self.entries
            .insert(digest.into().to_ascii_lowercase(), platform);
        self
    }

    pub fn lookup(&self, digest: &str) -> Platform {
        self.entries
            .get(&digest.to_ascii_lowercase())
            .copied()
            .unwrap_or(Platform::Unknown)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of platform resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformResolution {
    pub platform: Platform,
    /// Digest of the marker that was hashed, or [`UNKNOWN_DIGEST`].
    pub target_digest: String,
    pub marker: Option<PathBuf>,
}

impl PlatformResolution {
    pub fn unknown() -> Self {
        Self {
            platform: Platform::Unknown,
            target_digest: UNKNOWN_DIGEST.to_string(),
            marker: None,
        }
    }
}

/// Hashes the first existing marker candidate and looks it up.
#[derive(Debug, Clone)]
pub struct PlatformResolver {
    candidates: Vec<PathBuf>,
    table: DigestTable,
}

impl PlatformResolver {
    pub fn new(candidates: Vec<PathBuf>, table: DigestTable) -> Self {
        Self { candidates, table }
    }

    /// Resolve the installed platform. Never fails.
    pub async fn resolve(&self) -> PlatformResolution {
        let Some(marker) = self.first_existing().await else {
            tracing::debug!("No platform marker present");
            return PlatformResolution::unknown();
        };

        let bytes = match tokio::fs::read(&marker).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!("Failed to read platform marker {}: {}", marker.display(), err);
                return PlatformResolution::unknown();
            }
        };

        let digest = marker_digest(&bytes);
        let platform = self.table.lookup(&digest);
        if platform == Platform::Unknown {
            tracing::debug!("Marker digest {} has no platform entry", digest);
        }

        PlatformResolution {
            platform,
            target_digest: digest,
            marker: Some(marker),
        }
    }

    async fn first_existing(&self) -> Option<PathBuf> {
        for candidate in &self.candidates {
            if is_file(candidate).await {
                return Some(candidate.clone());
            }
        }
        None
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn digest_of(bytes: &[u8]) -> String {
        marker_digest(bytes)
    }

    #[test]
    fn marker_digest_is_md5_hex() {
        assert_eq!(marker_digest(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(marker_digest(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn builtin_table_knows_every_storefront() {
        let table = DigestTable::builtin();
        assert_eq!(table.len(), 5);
        assert_eq!(table.lookup("bf93b21877ca6b94b99af14832497028"), Platform::Epic);
        assert_eq!(table.lookup("F435B7D6BE29B772D7193F507CB4DAB1"), Platform::Steam);
        assert_eq!(table.lookup("46c8230da02f8194fc8b1ee20b61d3af"), Platform::Microsoft);
        assert_eq!(table.lookup(&marker_digest(b"modded exe")), Platform::Unknown);
    }

    #[test]
    fn store_layout_selects_store_config() {
        let temp = TempDir::new().unwrap();
        let retail = temp.path().join("Retail");
        let runtime = temp.path().join("Runtime");

        assert_eq!(
            install_markers(&retail, &runtime),
            vec![temp.path().join("Retail/HITMAN3.exe")]
        );

        std::fs::create_dir_all(retail.join("Runtime")).unwrap();
        std::fs::write(retail.join("Runtime").join("chunk0.rpkg"), b"x").unwrap();
        assert_eq!(
            install_markers(&retail, &runtime),
            vec![temp.path().join("MicrosoftGame.Config")]
        );
    }

    #[tokio::test]
    async fn resolves_first_existing_marker() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("MicrosoftGame.Config");
        let second = temp.path().join("game.exe");
        std::fs::write(&second, b"steam build").unwrap();

        let table = DigestTable::new().with_entry(digest_of(b"steam build"), Platform::Steam);
        let resolver = PlatformResolver::new(vec![first.clone(), second.clone()], table.clone());
        let resolution = resolver.resolve().await;
        assert_eq!(resolution.platform, Platform::Steam);
        assert_eq!(resolution.marker.as_deref(), Some(second.as_path()));

        std::fs::write(&first, b"store build").unwrap();
        let resolver = PlatformResolver::new(vec![first.clone(), second], table);
        let resolution = resolver.resolve().await;
        assert_eq!(resolution.platform, Platform::Unknown);
        assert_eq!(resolution.target_digest, digest_of(b"store build"));
    }

    #[tokio::test]
    async fn missing_markers_downgrade_to_unknown() {
        let temp = TempDir::new().unwrap();
        let resolver = PlatformResolver::new(
            vec![temp.path().join("a"), temp.path().join("b")],
            DigestTable::new(),
        );

        let resolution = resolver.resolve().await;
        assert_eq!(resolution, PlatformResolution::unknown());
    }

    #[test]
    fn digest_lookup_is_case_insensitive() {
        let table = DigestTable::new().with_entry("ABCDEF", Platform::Epic);
        assert_eq!(table.lookup("abcdef"), Platform::Epic);
        assert_eq!(table.lookup("012345"), Platform::Unknown);
    }

    #[test]
    fn configured_names_extend_builtin_table() {
        let pairs = [
            ("aa".to_string(), "steam".to_string()),
            ("bb".to_string(), "amiga".to_string()),
        ];
        let table = DigestTable::builtin().with_names(pairs.iter().map(|(a, b)| (a, b)));
        assert_eq!(table.len(), 6);
        assert_eq!(table.lookup("aa"), Platform::Steam);
        assert_eq!(table.lookup("bb"), Platform::Unknown);
    }
}
