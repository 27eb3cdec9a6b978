use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum TorrentStoreError {
    Io(io::Error),
}

impl From<io::Error> for TorrentStoreError {
    fn from(err: io::Error) -> Self {
        TorrentStoreError::Io(err)
    }
}

/// Persists uploaded `.torrent` files under `{directory}/{info_hash}.torrent`,
/// matching `tracker.py`'s `torrent_data_folder` layout.
pub struct TorrentStore {
    directory: PathBuf,
}

impl TorrentStore {
    pub fn new(directory: &str) -> Result<Self, TorrentStoreError> {
        fs::create_dir_all(directory)?;
        Ok(Self {
            directory: PathBuf::from(directory),
        })
    }

    fn path_for(&self, info_hash: &str) -> PathBuf {
        self.directory.join(format!("{}.torrent", info_hash))
    }

    pub fn save(&self, info_hash: &str, bytes: &[u8]) -> Result<(), TorrentStoreError> {
        fs::write(self.path_for(info_hash), bytes)?;
        Ok(())
    }

    pub fn load(&self, info_hash: &str) -> Option<Vec<u8>> {
        let path = self.path_for(info_hash);
        if !Path::new(&path).exists() {
            return None;
        }
        fs::read(path).ok()
    }
}
