//! Open-file tracking and URI/path conversion.
//!
//! A [`Document`] is either disk-backed (contents read on demand) or
//! editor-owned (contents cached verbatim from the last client
//! notification). `didSave` flips an editor-owned document back to
//! disk-backed.

use ropey::Rope;
use std::path::{Path, PathBuf};
use tower_lsp::lsp_types::Url;

#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    /// Editor-owned contents; `None` means read from disk on demand.
    buffer: Option<Rope>,
}

impl Document {
    /// A disk-backed document.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_disk_backed(&self) -> bool {
        self.buffer.is_none()
    }

    /// The full contents. Unreadable disk files read as empty.
    pub fn contents(&self) -> String {
        match &self.buffer {
            Some(rope) => rope.to_string(),
            None => std::fs::read_to_string(&self.path).unwrap_or_default(),
        }
    }

    /// Replace the contents from an editor notification.
    pub fn set_contents(&mut self, text: &str) {
        self.buffer = Some(Rope::from_str(text));
    }

    /// Drop the editor cache; the document reads from disk again.
    pub fn mark_saved(&mut self) {
        self.buffer = None;
    }
}

/// `file://` URI → filesystem path. On Windows the drive colon arrives
/// percent-encoded and the path carries a spurious leading slash.
pub fn uri_to_path(uri: &Url) -> PathBuf {
    let raw = uri.as_str();
    let mut path = raw.strip_prefix("file://").unwrap_or(raw).to_string();
    if cfg!(windows) {
        path = path.replace("%3A", ":").replace("%3a", ":");
        path = path.trim_start_matches('/').to_string();
    }
    PathBuf::from(path)
}

/// Filesystem path → `file://` URI.
pub fn path_to_uri(path: &Path) -> Url {
    let text = if cfg!(windows) {
        format!("file:///{}", path.display())
    } else {
        format!("file://{}", path.display())
    };
    Url::parse(&text)
        .or_else(|_| Url::from_file_path(path))
        .unwrap_or_else(|_| Url::parse("file:///").expect("static URL parses"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_backed_until_changed() {
        let mut doc = Document::new("/nonexistent/file.v");
        assert!(doc.is_disk_backed());
        assert_eq!(doc.contents(), "");

        doc.set_contents("module m; endmodule");
        assert!(!doc.is_disk_backed());
        assert_eq!(doc.contents(), "module m; endmodule");

        doc.mark_saved();
        assert!(doc.is_disk_backed());
    }

    #[test]
    fn test_uri_round_trip() {
        let path = PathBuf::from("/ws/src/top.v");
        let uri = path_to_uri(&path);
        assert_eq!(uri.as_str(), "file:///ws/src/top.v");
        assert_eq!(uri_to_path(&uri), path);
    }
}
