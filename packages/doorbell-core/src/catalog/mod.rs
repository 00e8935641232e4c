//! Ringtone catalog.
//!
//! The catalog is built once at startup by walking the music directory and
//! is read-only afterwards, shared by every request handler behind an `Arc`.

pub mod duration;

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use rand::seq::SliceRandom;
use thiserror::Error;
use walkdir::WalkDir;

pub use duration::{DurationProbe, SymphoniaProbe};

use crate::error::TriggerError;

/// File extensions (lower-case) recognized as ringtones.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a", "aac"];

/// Errors that can occur while building the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog root is missing or cannot be listed.
    #[error("cannot read music directory {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Normalizes a ringtone name for lookup: whitespace removed, lower-cased.
#[must_use]
pub fn normalize_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Percent-encodes each segment of a relative path, keeping `/` separators.
///
/// Returns None for paths that are not plain, valid UTF-8 relative paths.
fn encode_relative_path(relative: &Path) -> Option<String> {
    let mut url = url::Url::parse("http://localhost/").ok()?;
    {
        let mut segments = url.path_segments_mut().ok()?;
        for component in relative.components() {
            match component {
                Component::Normal(segment) => {
                    segments.push(segment.to_str()?);
                }
                _ => return None,
            }
        }
    }
    Some(url.path().trim_start_matches('/').to_string())
}

/// One playable ringtone.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioEntry {
    /// Path relative to the catalog root, percent-encoded per segment.
    pub relative_path: String,
    /// Playing time in seconds.
    pub duration_seconds: f64,
    /// Lower-cased file stem.
    pub display_name: String,
    /// `display_name` without whitespace, used to match requests.
    pub lookup_key: String,
}

impl AudioEntry {
    /// Builds an entry for `relative` (a path below the catalog root).
    pub fn new(relative: &Path, duration_seconds: f64) -> Option<Self> {
        let relative_path = encode_relative_path(relative)?;
        let display_name = relative.file_stem()?.to_str()?.to_lowercase();
        let lookup_key = normalize_key(&display_name);
        Some(Self {
            relative_path,
            duration_seconds,
            display_name,
            lookup_key,
        })
    }

    /// Playing time as a `Duration`.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_seconds.max(0.0))
    }
}

/// Returns true if the file extension is a known audio type.
fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Ordered, immutable set of ringtones below a root directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    entries: Vec<AudioEntry>,
}

impl Catalog {
    /// Scans `root` with the symphonia duration probe.
    pub fn load(root: &Path) -> Result<Self, CatalogError> {
        Self::load_with(root, &SymphoniaProbe)
    }

    /// Scans `root` recursively, in file-name order.
    ///
    /// Files with an unknown extension or an unreadable duration are skipped.
    /// An empty catalog is valid.
    pub fn load_with(root: &Path, probe: &dyn DurationProbe) -> Result<Self, CatalogError> {
        std::fs::read_dir(root).map_err(|source| CatalogError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

        log::info!("[Catalog] Loading music files from {}", root.display());

        let mut entries = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) if entry.file_type().is_file() => entry,
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("[Catalog] Cannot access entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !is_audio_file(path) {
                log::debug!("[Catalog] Skipping non-audio file {}", path.display());
                continue;
            }
            let Some(seconds) = probe.duration_seconds(path) else {
                log::debug!("[Catalog] Skipping {}: no readable duration", path.display());
                continue;
            };
            let Some(audio) = path
                .strip_prefix(root)
                .ok()
                .and_then(|relative| AudioEntry::new(relative, seconds))
            else {
                log::debug!("[Catalog] Skipping {}: unusable file name", path.display());
                continue;
            };

            log::info!(
                "[Catalog] Found '{}' ({:.1}s) at /{}",
                audio.display_name,
                audio.duration_seconds,
                audio.relative_path
            );
            entries.push(audio);
        }

        if entries.is_empty() {
            log::warn!("[Catalog] No ringtones found in {}", root.display());
        }

        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    /// Builds a catalog from prepared entries.
    #[must_use]
    pub fn from_entries(root: impl Into<PathBuf>, entries: Vec<AudioEntry>) -> Self {
        Self {
            root: root.into(),
            entries,
        }
    }

    /// The directory the catalog was scanned from (and is served from).
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All entries in scan order.
    #[must_use]
    pub fn entries(&self) -> &[AudioEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the first entry whose key matches the normalized request.
    #[must_use]
    pub fn find(&self, requested: &str) -> Option<&AudioEntry> {
        let key = normalize_key(requested);
        self.entries.iter().find(|entry| entry.lookup_key == key)
    }

    /// Picks an entry uniformly at random.
    pub fn choose_random(&self) -> Result<&AudioEntry, TriggerError> {
        self.entries
            .choose(&mut rand::thread_rng())
            .ok_or(TriggerError::NoRingtonesAvailable)
    }

    /// Display names in scan order.
    #[must_use]
    pub fn display_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.display_name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Probe that reports a fixed duration, failing for files named `broken*`.
    struct FixedProbe(f64);

    impl DurationProbe for FixedProbe {
        fn duration_seconds(&self, path: &Path) -> Option<f64> {
            let name = path.file_name()?.to_str()?;
            (!name.starts_with("broken")).then_some(self.0)
        }
    }

    fn entry(name: &str) -> AudioEntry {
        AudioEntry::new(Path::new(&format!("{}.mp3", name)), 2.0).expect("entry")
    }

    #[test]
    fn normalize_key_strips_whitespace_and_case() {
        assert_eq!(normalize_key(" c h I m e "), "chime");
        assert_eq!(normalize_key("Big\tBen"), "bigben");
    }

    #[test]
    fn entry_encodes_each_segment() {
        let audio = AudioEntry::new(Path::new("bells/Big Ben #1.mp3"), 3.5).expect("entry");
        assert_eq!(audio.relative_path, "bells/Big%20Ben%20%231.mp3");
        assert_eq!(audio.display_name, "big ben #1");
        assert_eq!(audio.lookup_key, "bigben#1");
        assert_eq!(audio.duration(), Duration::from_millis(3500));
    }

    #[test]
    fn load_walks_tree_in_name_order_and_skips_unusable_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path();
        std::fs::create_dir(root.join("bells")).expect("mkdir");
        for name in ["chime.mp3", "Buzzer.WAV", "bells/Big Ben.mp3", "broken.mp3", "notes.txt"] {
            std::fs::write(root.join(name), b"x").expect("write");
        }

        let catalog = Catalog::load_with(root, &FixedProbe(1.0)).expect("load");
        assert_eq!(catalog.display_names(), vec!["buzzer", "big ben", "chime"]);
        assert_eq!(catalog.entries()[1].relative_path, "bells/Big%20Ben.mp3");
        assert_eq!(catalog.root(), root);
    }

    #[test]
    fn empty_directory_is_a_valid_catalog() {
        let dir = tempfile::tempdir().expect("temp dir");
        let catalog = Catalog::load_with(dir.path(), &FixedProbe(1.0)).expect("load");
        assert!(catalog.is_empty());
        assert_eq!(
            catalog.choose_random(),
            Err(TriggerError::NoRingtonesAvailable)
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let result = Catalog::load_with(Path::new("/nonexistent/music"), &FixedProbe(1.0));
        assert!(matches!(result, Err(CatalogError::RootUnreadable { .. })));
    }

    #[test]
    fn find_normalizes_the_request() {
        let catalog = Catalog::from_entries(".", vec![entry("chime"), entry("buzzer")]);
        for request in ["chime", "ChIme", " c h i m e"] {
            assert_eq!(
                catalog.find(request).map(|e| e.display_name.as_str()),
                Some("chime"),
                "request {:?}",
                request
            );
        }
        assert!(catalog.find("unknown").is_none());
    }

    #[test]
    fn find_returns_first_match_in_catalog_order() {
        let first = AudioEntry::new(Path::new("a/chime.mp3"), 1.0).expect("entry");
        let second = AudioEntry::new(Path::new("b/Chime.wav"), 2.0).expect("entry");
        let catalog = Catalog::from_entries(".", vec![first.clone(), second]);
        assert_eq!(catalog.find("chime"), Some(&first));
    }

    #[test]
    fn choose_random_picks_an_entry() {
        let catalog = Catalog::from_entries(".", vec![entry("chime"), entry("buzzer")]);
        let picked = catalog.choose_random().expect("entry");
        assert!(["chime", "buzzer"].contains(&picked.display_name.as_str()));
    }
}
