//! Folder enumeration for batch runs.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Candidate videos of one batch: a folder and the sorted file names in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoList {
    pub folder: PathBuf,
    pub files: Vec<String>,
}

impl VideoList {
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.files.iter().map(|f| self.folder.join(f))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// List the videos named by `path`.
///
/// A directory yields its entries, a file yields itself (with its parent as
/// folder). Hidden entries and entries without `extension` are dropped.
pub fn list_videos(path: &Path, extension: &str) -> Result<VideoList> {
    let (folder, names) = if path.is_dir() {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)
            .map_err(|e| anyhow!("failed to list {}: {}", path.display(), e))?
        {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        (path.to_path_buf(), names)
    } else {
        let name = path
            .file_name()
            .ok_or_else(|| anyhow!("{} does not name a file", path.display()))?
            .to_string_lossy()
            .into_owned();
        let folder = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        (folder, vec![name])
    };

    Ok(VideoList {
        folder,
        files: filter_videos(names, extension),
    })
}

/// Keep visible names ending in `.extension`, sorted.
pub fn filter_videos(names: Vec<String>, extension: &str) -> Vec<String> {
    let suffix = format!(".{}", extension);
    let mut kept: Vec<String> = names
        .into_iter()
        .filter(|name| !name.starts_with('.') && name.ends_with(&suffix))
        .collect();
    kept.sort();
    kept
}
