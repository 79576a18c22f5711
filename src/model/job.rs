use crate::error::{NormalizeError, NormalizeResult};
use std::path::{Component, Path, PathBuf};

/// Target loudness used when none is given
pub const DEFAULT_TARGET_DBFS: f64 = -20.0;

/// Immutable description of one normalization run
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationJob {
    input_root: PathBuf,
    output_root: PathBuf,
    target_dbfs: f64,
}

impl NormalizationJob {
    /// Validate and create a job
    ///
    /// Fails when the input directory does not exist, when the target is not
    /// a finite number, or when input and output resolve to the same
    /// directory. Nothing is written to disk.
    pub fn new(input_root: PathBuf, output_root: PathBuf, target_dbfs: f64) -> NormalizeResult<Self> {
        if !input_root.is_dir() {
            return Err(NormalizeError::Validation(format!(
                "Input directory '{}' not found",
                input_root.display()
            )));
        }

        if !target_dbfs.is_finite() {
            return Err(NormalizeError::Validation(format!(
                "Target loudness must be a finite number, got {}",
                target_dbfs
            )));
        }

        let input_root = input_root.canonicalize()?;
        let output_root = resolve_path(&output_root)?;

        if input_root == output_root {
            return Err(NormalizeError::Validation(
                "Input and output directories cannot be the same".to_string(),
            ));
        }

        Ok(Self {
            input_root,
            output_root,
            target_dbfs,
        })
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn target_dbfs(&self) -> f64 {
        self.target_dbfs
    }

    /// Whether the output tree sits inside the input tree
    pub fn output_inside_input(&self) -> bool {
        self.output_root.starts_with(&self.input_root)
    }
}

/// Absolute form of a path that may not exist yet
///
/// `.` and `..` are folded first, then the deepest existing ancestor is
/// canonicalized and the missing tail is appended, so `out/.`,
/// `missing/../out` and `out` all compare equal even before `out` exists.
fn resolve_path(path: &Path) -> NormalizeResult<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let normalized = normalize_lexically(&absolute);

    let mut existing = normalized.as_path();
    let mut tail = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(normalized),
        }
    }

    let mut resolved = existing.canonicalize()?;
    for component in tail.iter().rev() {
        resolved.push(component);
    }
    Ok(resolved)
}

/// Drop `.` and pop on `..` without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
