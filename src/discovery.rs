//! Audio file discovery
//!
//! Recursively collects the MP3 and OGG files below an input root.

use crate::model::AudioFormat;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file eligible for normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub format: AudioFormat,
}

/// Find all supported audio files under `root`
///
/// Extensions are matched case-insensitively. Siblings are visited in name
/// order. When `exclude` is given, that subtree is not descended into (used
/// when the output directory lives inside the input directory). Unreadable
/// entries are logged and skipped.
pub fn find_audio_files(root: &Path, exclude: Option<&Path>) -> Vec<DiscoveredFile> {
    log::info!("Scanning for audio files in: {}", root.display());

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| match exclude {
            Some(excluded) => entry.depth() == 0 || !entry.path().starts_with(excluded),
            None => true,
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(format) = AudioFormat::from_path(entry.path()) {
            log::debug!("Found {} file: {}", format, entry.path().display());
            files.push(DiscoveredFile {
                path: entry.into_path(),
                format,
            });
        }
    }

    files
}
