//! Destinations for exported files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::Result;

/// Receives exported files, like a browser download.
pub trait DownloadSink {
    /// Saves `bytes` under `filename`, replacing any earlier file of that name.
    fn save(&mut self, filename: &str, bytes: &[u8]) -> Result<()>;
}

/// Writes downloads into a directory.
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
    fn save(&mut self, filename: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)?;
        info!("saved {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

/// Keeps downloads in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: BTreeMap<String, Vec<u8>>,
    saves: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, filename: &str) -> Option<&[u8]> {
        self.files.get(filename).map(Vec::as_slice)
    }

    /// Removes and returns a saved file.
    pub fn take(&mut self, filename: &str) -> Option<Vec<u8>> {
        self.files.remove(filename)
    }

    /// Total number of saves, including overwrites.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl DownloadSink for MemorySink {
    fn save(&mut self, filename: &str, bytes: &[u8]) -> Result<()> {
        self.files.insert(filename.to_string(), bytes.to_vec());
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_overwrites_by_name() {
        let mut sink = MemorySink::new();
        sink.save("a.png", b"one").unwrap();
        sink.save("a.png", b"two").unwrap();

        assert_eq!(sink.get("a.png"), Some(&b"two"[..]));
        assert_eq!(sink.save_count(), 2);
        assert_eq!(sink.take("a.png").as_deref(), Some(&b"two"[..]));
        assert!(sink.get("a.png").is_none());
    }

    #[test]
    fn directory_sink_writes_files() {
        let dir = std::env::temp_dir().join(format!("shirt-composer-sink-{}", std::process::id()));
        let mut sink = DirectorySink::new(&dir);

        sink.save("tshirt-design.png", b"png").unwrap();

        assert_eq!(std::fs::read(dir.join("tshirt-design.png")).unwrap(), b"png");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
