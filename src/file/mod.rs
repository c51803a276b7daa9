use std::path::{Path, PathBuf};

use crate::error::{ClipFetchError, Result};

/// A dropped or picked file that looks like a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub mime: String,
}

impl LocalFile {
    /// Accept `path` only if it is an existing regular file with a `video/*` type.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ClipFetchError::ValidationFailure(format!(
                "Not a file: {}",
                path.display()
            )));
        }
        let mime = video_mime(path).ok_or_else(|| {
            ClipFetchError::ValidationFailure(format!(
                "Not a video file: {}",
                path.display()
            ))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            mime,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn video_mime(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .iter()
        .find(|mime| mime.type_() == mime_guess::mime::VIDEO)
        .map(|mime| mime.essence_str().to_string())
}

/// Receives local files; whatever processes them lives outside this crate.
pub trait AssetSelector: Send + Sync {
    fn select(&self, file: LocalFile);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_video_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holiday.mp4");
        std::fs::write(&path, b"fake").unwrap();

        let file = LocalFile::open(&path).unwrap();
        assert_eq!(file.mime, "video/mp4");
        assert_eq!(file.file_name(), "holiday.mp4");
    }

    #[test]
    fn test_rejects_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"hello").unwrap();

        assert!(matches!(
            LocalFile::open(&text),
            Err(ClipFetchError::ValidationFailure(_))
        ));
        assert!(matches!(
            LocalFile::open(dir.path().join("missing.mp4")),
            Err(ClipFetchError::ValidationFailure(_))
        ));
        assert!(matches!(
            LocalFile::open(dir.path()),
            Err(ClipFetchError::ValidationFailure(_))
        ));
    }
}
