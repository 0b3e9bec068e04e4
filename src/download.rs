//! Download sinks: where finished files are delivered
//!
//! A delivery is the equivalent of a browser file-save prompt. Each export
//! delivers at most one file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{Error, Result};

/// A finished file handed to a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

pub trait DownloadSink: Send + Sync {
    fn deliver(&self, download: Download) -> Result<()>;
}

/// Writes each delivery into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, download: Download) -> Result<()> {
        // Only the final path component is honored
        let name = Path::new(&download.filename)
            .file_name()
            .ok_or_else(|| Error::Download(format!("invalid filename: {:?}", download.filename)))?;
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, &download.bytes)?;
        log::info!("Saved {} ({} bytes)", path.display(), download.bytes.len());
        Ok(())
    }
}

/// Keeps deliveries in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    downloads: Mutex<Vec<Download>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downloads(&self) -> Vec<Download> {
        self.downloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.downloads.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&self, download: Download) -> Result<()> {
        self.downloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(download);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn download(name: &str) -> Download {
        Download {
            filename: name.to_string(),
            mime_type: "image/png",
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn memory_sink_records_deliveries() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        sink.deliver(download("a.png")).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.downloads()[0].filename, "a.png");
    }

    #[test]
    fn directory_sink_strips_parent_components() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        sink.deliver(download("../../escape.png")).unwrap();
        assert_eq!(fs::read(dir.path().join("out/escape.png")).unwrap(), vec![1, 2, 3]);
        assert!(!dir.path().join("escape.png").exists());
    }

    #[test]
    fn directory_sink_rejects_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        assert!(matches!(sink.deliver(download("..")), Err(Error::Download(_))));
    }
}
