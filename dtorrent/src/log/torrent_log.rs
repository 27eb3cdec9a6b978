use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::torrent::TorrentMetadata;

#[derive(Debug)]
pub enum TorrentLogError {
    Io(io::Error),
    Json(serde_json::Error),
    NotFound(String),
    InvalidPieceIndex(u32),
}

impl From<io::Error> for TorrentLogError {
    fn from(err: io::Error) -> Self {
        TorrentLogError::Io(err)
    }
}

impl From<serde_json::Error> for TorrentLogError {
    fn from(err: serde_json::Error) -> Self {
        TorrentLogError::Json(err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRecord {
    #[serde(rename = "ip")]
    pub ip_address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentLogEntry {
    pub piece_size: u64,
    pub piece_count: u32,
    pub torrent_save_path: String,
    pub data_save_path: String,
    pub bitfield: Vec<u8>,
    pub list_peers: Vec<PeerRecord>,
}

/// Persistent record of every torrent this peer knows about, keyed by the
/// lower-case hex info-hash and backed by a `torrent_log.json` file.
pub struct TorrentLog {
    json_path: String,
    torrent_directory: String,
    data: Mutex<HashMap<String, TorrentLogEntry>>,
}

impl TorrentLog {
    /// Loads `json_path` if it exists, then scans `torrent_directory` for any
    /// `*.torrent` files not yet present in the log and registers them with
    /// an all-zero bitfield.
    pub fn new(json_path: &str, torrent_directory: &str) -> Result<Self, TorrentLogError> {
        let data = Self::load_data(json_path)?;
        let log = Self {
            json_path: json_path.to_string(),
            torrent_directory: torrent_directory.to_string(),
            data: Mutex::new(data),
        };
        log.scan_torrent_files()?;
        Ok(log)
    }

    fn load_data(json_path: &str) -> Result<HashMap<String, TorrentLogEntry>, TorrentLogError> {
        if !Path::new(json_path).exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(json_path)?;
        match serde_json::from_str(&contents) {
            Ok(data) => Ok(data),
            Err(_) => Ok(HashMap::new()),
        }
    }

    fn save_data(&self, data: &HashMap<String, TorrentLogEntry>) -> Result<(), TorrentLogError> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.json_path, serialized)?;
        Ok(())
    }

    fn lock_data(&self) -> MutexGuard<HashMap<String, TorrentLogEntry>> {
        self.data.lock().expect("torrent log mutex poisoned")
    }

    fn scan_torrent_files(&self) -> Result<(), TorrentLogError> {
        if !Path::new(&self.torrent_directory).is_dir() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.torrent_directory)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("torrent") {
                continue;
            }

            let bytes = fs::read(&path)?;
            let metadata = match TorrentMetadata::from_bencoded(&bytes) {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };
            let info_hash = metadata.info_hash_hex();

            if self.lock_data().contains_key(&info_hash) {
                continue;
            }

            self.add_torrent(
                &info_hash,
                metadata.piece_length,
                metadata.piece_count(),
                &path.to_string_lossy(),
                &metadata.name,
                None,
            )?;
        }
        Ok(())
    }

    pub fn add_torrent(
        &self,
        info_hash: &str,
        piece_size: u64,
        piece_count: u32,
        torrent_save_path: &str,
        data_save_path: &str,
        bitfield: Option<Vec<u8>>,
    ) -> Result<(), TorrentLogError> {
        let bitfield = bitfield.unwrap_or_else(|| vec![0u8; piece_count as usize]);
        let entry = TorrentLogEntry {
            piece_size,
            piece_count,
            torrent_save_path: torrent_save_path.to_string(),
            data_save_path: data_save_path.to_string(),
            bitfield,
            list_peers: Vec::new(),
        };

        let mut data = self.lock_data();
        data.insert(info_hash.to_string(), entry);
        self.save_data(&data)
    }

    pub fn update_bitfield(
        &self,
        info_hash: &str,
        piece_index: u32,
        status: u8,
    ) -> Result<(), TorrentLogError> {
        let mut data = self.lock_data();
        let entry = data
            .get_mut(info_hash)
            .ok_or_else(|| TorrentLogError::NotFound(info_hash.to_string()))?;

        let index = piece_index as usize;
        if index >= entry.bitfield.len() {
            return Err(TorrentLogError::InvalidPieceIndex(piece_index));
        }
        entry.bitfield[index] = status;
        self.save_data(&data)
    }

    pub fn update_peers_list(
        &self,
        info_hash: &str,
        peers: Vec<PeerRecord>,
    ) -> Result<(), TorrentLogError> {
        let mut data = self.lock_data();
        let entry = data
            .get_mut(info_hash)
            .ok_or_else(|| TorrentLogError::NotFound(info_hash.to_string()))?;
        entry.list_peers = peers;
        self.save_data(&data)
    }

    pub fn get_bitfield(&self, info_hash: &str) -> Option<Vec<u8>> {
        self.lock_data().get(info_hash).map(|e| e.bitfield.clone())
    }

    pub fn get_peers(&self, info_hash: &str) -> Option<Vec<PeerRecord>> {
        self.lock_data().get(info_hash).map(|e| e.list_peers.clone())
    }

    pub fn get_entry(&self, info_hash: &str) -> Option<TorrentLogEntry> {
        self.lock_data().get(info_hash).cloned()
    }

    pub fn get_bytes_of_torrent_file(&self, info_hash: &str) -> Option<Vec<u8>> {
        let path = self.lock_data().get(info_hash)?.torrent_save_path.clone();
        fs::read(path).ok()
    }

    pub fn all_info_hashes(&self) -> Vec<String> {
        self.lock_data().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_paths(tag: &str) -> (String, String) {
        let base = std::env::temp_dir().join(format!("dtorrent-log-{}-{}", tag, std::process::id()));
        fs::create_dir_all(&base).unwrap();
        (
            base.join("torrent_log.json").to_string_lossy().into_owned(),
            base.to_string_lossy().into_owned(),
        )
    }

    #[test]
    fn test_add_then_load_round_trips() {
        let (json_path, dir) = temp_paths("roundtrip");
        {
            let log = TorrentLog::new(&json_path, &dir).unwrap();
            log.add_torrent("abc123", 16384, 4, "save.torrent", "data/save", None)
                .unwrap();
        }

        let reopened = TorrentLog::new(&json_path, &dir).unwrap();
        let entry = reopened.get_entry("abc123").unwrap();
        assert_eq!(entry.piece_count, 4);
        assert_eq!(entry.bitfield, vec![0, 0, 0, 0]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_update_bitfield_out_of_range_is_an_error() {
        let (json_path, dir) = temp_paths("badindex");
        let log = TorrentLog::new(&json_path, &dir).unwrap();
        log.add_torrent("abc123", 16384, 2, "save.torrent", "data/save", None)
            .unwrap();

        assert!(matches!(
            log.update_bitfield("abc123", 5, 1),
            Err(TorrentLogError::InvalidPieceIndex(5))
        ));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_update_bitfield_unknown_info_hash_is_an_error() {
        let (json_path, dir) = temp_paths("unknown");
        let log = TorrentLog::new(&json_path, &dir).unwrap();

        assert!(matches!(
            log.update_bitfield("does-not-exist", 0, 1),
            Err(TorrentLogError::NotFound(_))
        ));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_update_peers_list() {
        let (json_path, dir) = temp_paths("peers");
        let log = TorrentLog::new(&json_path, &dir).unwrap();
        log.add_torrent("abc123", 16384, 2, "save.torrent", "data/save", None)
            .unwrap();

        log.update_peers_list(
            "abc123",
            vec![PeerRecord {
                ip_address: "127.0.0.1".into(),
                port: 6881,
            }],
        )
        .unwrap();

        assert_eq!(log.get_peers("abc123").unwrap().len(), 1);

        fs::remove_dir_all(&dir).ok();
    }
}
