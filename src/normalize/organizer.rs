//! Output tree layout

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Maps input files onto the mirrored output tree
pub struct OutputOrganizer {
    input_root: PathBuf,
    output_root: PathBuf,
}

impl OutputOrganizer {
    pub fn new(input_root: PathBuf, output_root: PathBuf) -> Self {
        Self {
            input_root,
            output_root,
        }
    }

    /// Create the output root if it does not exist yet
    pub fn init(&self) -> Result<()> {
        if self.output_root.is_dir() {
            return Ok(());
        }

        fs::create_dir_all(&self.output_root).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.output_root.display()
            )
        })?;

        log::info!("Created output directory: {}", self.output_root.display());
        Ok(())
    }

    /// Destination for a source file: same relative path under the output root
    ///
    /// Never maps a file onto itself.
    pub fn output_path(&self, source: &Path) -> Option<PathBuf> {
        source
            .strip_prefix(&self.input_root)
            .ok()
            .map(|relative| self.output_root.join(relative))
            .filter(|dest| dest != source)
    }

    /// Make sure the parent directory of `dest` exists
    pub fn prepare_parent(&self, dest: &Path) -> std::io::Result<()> {
        match dest.parent() {
            Some(parent) if !parent.is_dir() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}
