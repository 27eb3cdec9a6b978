use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use logger::LoggerSender;
use rand::Rng;

use crate::config::Cfg;
use crate::coordinator::Coordinator;
use crate::log::TorrentLog;
use crate::storage::FileSet;
use crate::torrent::generator::{self, DEFAULT_PIECE_LENGTH};
use crate::torrent::TorrentMetadata;
use crate::tracker_client::{AnnounceRequest, Event, TrackerClient};

#[derive(Debug)]
pub enum CliError {
    Io(io::Error),
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Io(err)
    }
}

const CLIENT_CODE: &str = "DT";
const CLIENT_VERSION: &str = "0001";

pub fn generate_peer_id() -> [u8; 20] {
    let prefix = format!("-{}{}-", CLIENT_CODE, CLIENT_VERSION);
    let mut id = [0u8; 20];
    let prefix_bytes = prefix.as_bytes();
    id[..prefix_bytes.len()].copy_from_slice(prefix_bytes);

    let mut rng = rand::thread_rng();
    for byte in id[prefix_bytes.len()..].iter_mut() {
        *byte = rng.gen_range(b'0'..=b'z');
    }
    id
}

const HELP_TEXT: &str = "\nCommand options:\n  \
stop                                      - Stop the peer and disconnect\n  \
announce_have_data <info_hash>            - Announce completion to tracker\n  \
download_torrent_by_info_hash <info_hash> - Fetch a .torrent by info hash\n  \
get_peers <info_hash>                     - List peers for the specified info hash\n  \
update_torrent_log                        - Update the torrent log from folder\n  \
generate_torrent_file <data_file_path>    - Generate a .torrent file\n  \
download_file <info_hash>                 - Start downloading a file\n  \
get_torrent_info <info_hash>              - Show a torrent's metadata\n  \
get_torrent_log                           - Show every known torrent\n  \
help                                       - Show this help message\n  \
exit                                       - Exit the program\n";

/// The top-level peer program: a REPL over the peer's commands, following
/// `peer.py`'s command dispatch.
pub struct PeerApp {
    cfg: Cfg,
    log: Arc<TorrentLog>,
    logger: LoggerSender,
    peer_id: [u8; 20],
    tracker_url: String,
}

impl PeerApp {
    pub fn new(
        cfg: Cfg,
        log: Arc<TorrentLog>,
        logger: LoggerSender,
        peer_id: [u8; 20],
        tracker_url: String,
    ) -> Self {
        Self {
            cfg,
            log,
            logger,
            peer_id,
            tracker_url,
        }
    }

    pub fn run(&mut self) -> Result<(), CliError> {
        println!("{}", HELP_TEXT);
        let stdin = io::stdin();

        for line in stdin.lock().lines() {
            let line = line?;
            let mut parts = line.trim().split_whitespace();
            let action = match parts.next() {
                Some(action) => action,
                None => continue,
            };
            let args: Vec<&str> = parts.collect();

            match action {
                "stop" | "exit" => {
                    self.stop_all();
                    break;
                }
                "announce_have_data" => match args.first() {
                    Some(info_hash) => self.announce_have_data(info_hash),
                    None => println!("Usage: announce_have_data <info_hash>"),
                },
                "download_torrent_by_info_hash" => match args.first() {
                    Some(info_hash) => self.download_torrent_by_info_hash(info_hash),
                    None => println!("Usage: download_torrent_by_info_hash <info_hash>"),
                },
                "get_peers" => match args.first() {
                    Some(info_hash) => self.get_peers(info_hash),
                    None => println!("Usage: get_peers <info_hash>"),
                },
                "update_torrent_log" => self.update_torrent_log(),
                "generate_torrent_file" => match args.first() {
                    Some(path) => self.generate_torrent_file(path),
                    None => println!("Usage: generate_torrent_file <data_file_path>"),
                },
                "download_file" => match args.first() {
                    Some(info_hash) => self.download_file(info_hash),
                    None => println!("Usage: download_file <info_hash>"),
                },
                "get_torrent_info" => match args.first() {
                    Some(info_hash) => self.get_torrent_info(info_hash),
                    None => println!("Usage: get_torrent_info <info_hash>"),
                },
                "get_torrent_log" => self.get_torrent_log(),
                "help" => println!("{}", HELP_TEXT),
                _ => println!("Unknown command. Type 'help' for available commands."),
            }
            io::stdout().flush()?;
        }
        Ok(())
    }

    fn stop_all(&mut self) {
        for info_hash in self.log.all_info_hashes() {
            let client = TrackerClient::new(&self.tracker_url, self.cfg.tracker_http_timeout_seconds);
            let request = AnnounceRequest {
                info_hash: decode_info_hash(&info_hash),
                peer_id: self.peer_id,
                port: self.cfg.tcp_port,
                uploaded: 0,
                downloaded: 0,
                left: 0,
                event: Some(Event::Stopped),
            };
            if let Err(err) = client.announce(&request) {
                self.logger.warn(&format!("Failed to announce stop for {}: {:?}", info_hash, err));
            }
        }
        self.logger.info("Peer has been stopped.");
        println!("Peer has been stopped.");
    }

    fn announce_have_data(&mut self, info_hash: &str) {
        let entry = match self.log.get_entry(info_hash) {
            Some(entry) => entry,
            None => {
                println!("Unknown info_hash: {}", info_hash);
                return;
            }
        };
        let torrent_bytes = match self.log.get_bytes_of_torrent_file(info_hash) {
            Some(bytes) => bytes,
            None => {
                println!("No .torrent bytes on disk for {}", info_hash);
                return;
            }
        };

        let client = TrackerClient::new(&self.tracker_url, self.cfg.tracker_http_timeout_seconds);
        let request = AnnounceRequest {
            info_hash: decode_info_hash(info_hash),
            peer_id: self.peer_id,
            port: self.cfg.tcp_port,
            uploaded: 0,
            downloaded: entry.piece_size * entry.piece_count as u64,
            left: 0,
            event: Some(Event::Completed),
        };
        match client.upload_torrent(&request, &torrent_bytes) {
            Ok(()) => println!("Announce successful for {} ({} bytes)", info_hash, entry.piece_size),
            Err(err) => println!("Announce not successful: {:?}", err),
        }
    }

    fn download_torrent_by_info_hash(&mut self, info_hash: &str) {
        println!("Downloading torrent by info hash...");
        let client = TrackerClient::new(&self.tracker_url, self.cfg.tracker_http_timeout_seconds);
        let bytes = match client.get_torrent(info_hash) {
            Ok(bytes) => bytes,
            Err(err) => {
                println!("Torrent download failed: {:?}", err);
                return;
            }
        };

        let metadata = match TorrentMetadata::from_bencoded(&bytes) {
            Ok(metadata) => metadata,
            Err(err) => {
                println!("Invalid .torrent data received: {:?}", err);
                return;
            }
        };

        let save_path = Path::new(&self.cfg.torrent_directory).join(format!("{}.torrent", info_hash));
        if let Err(err) = std::fs::write(&save_path, &bytes) {
            println!("Failed to save .torrent file: {}", err);
            return;
        }

        let data_save_path = Path::new(&self.cfg.download_directory).join(&metadata.name);
        let _ = self.log.add_torrent(
            info_hash,
            metadata.piece_length,
            metadata.piece_count(),
            &save_path.to_string_lossy(),
            &data_save_path.to_string_lossy(),
            None,
        );
        println!("Torrent file has been saved.");
    }

    fn get_peers(&mut self, info_hash: &str) {
        println!("Getting peers from tracker...");
        let client = TrackerClient::new(&self.tracker_url, self.cfg.tracker_http_timeout_seconds);
        let request = AnnounceRequest {
            info_hash: decode_info_hash(info_hash),
            peer_id: self.peer_id,
            port: self.cfg.tcp_port,
            uploaded: 0,
            downloaded: 0,
            left: 0,
            event: Some(Event::Started),
        };
        match client.announce(&request) {
            Ok(response) => {
                let peer_list: Vec<String> = response
                    .peers
                    .iter()
                    .map(|peer| format!("{}:{}", peer.ip, peer.port))
                    .collect();
                println!("Peers: {}", peer_list.join(", "));
                let _ = self.log.update_peers_list(
                    info_hash,
                    response
                        .peers
                        .iter()
                        .map(|peer| crate::log::PeerRecord {
                            ip_address: peer.ip.clone(),
                            port: peer.port,
                        })
                        .collect(),
                );
            }
            Err(err) => println!("Failed to get peers: {:?}", err),
        }
    }

    fn update_torrent_log(&mut self) {
        println!("Torrent log entries: {:?}", self.log.all_info_hashes());
    }

    fn generate_torrent_file(&mut self, data_file_path: &str) {
        let path = Path::new(data_file_path);
        match generator::generate_from_path(path, &self.tracker_url, DEFAULT_PIECE_LENGTH) {
            Ok((metadata, bencoded)) => {
                let info_hash = metadata.info_hash_hex();
                let save_path = Path::new(&self.cfg.torrent_directory).join(format!("{}.torrent", metadata.name));
                if let Err(err) = std::fs::write(&save_path, &bencoded) {
                    println!("Error while saving .torrent file: {}", err);
                    return;
                }
                let data_save_path = Path::new(&self.cfg.download_directory).join(&metadata.name);
                let _ = self.log.add_torrent(
                    &info_hash,
                    metadata.piece_length,
                    metadata.piece_count(),
                    &save_path.to_string_lossy(),
                    &data_save_path.to_string_lossy(),
                    Some(vec![1u8; metadata.piece_count() as usize]),
                );
                println!(".torrent file created successfully: {:?}", save_path);
            }
            Err(err) => println!("Error while generating .torrent file: {:?}", err),
        }
    }

    fn download_file(&mut self, info_hash: &str) {
        if self.log.get_entry(info_hash).is_none() {
            self.download_torrent_by_info_hash(info_hash);
        }
        self.get_peers(info_hash);

        let entry = match self.log.get_entry(info_hash) {
            Some(entry) => entry,
            None => {
                println!("Failed to download torrent file.");
                return;
            }
        };
        let torrent_bytes = match self.log.get_bytes_of_torrent_file(info_hash) {
            Some(bytes) => bytes,
            None => {
                println!("Missing .torrent bytes for {}", info_hash);
                return;
            }
        };
        let metadata = match TorrentMetadata::from_bencoded(&torrent_bytes) {
            Ok(metadata) => Arc::new(metadata),
            Err(err) => {
                println!("Invalid .torrent data: {:?}", err);
                return;
            }
        };

        let peers = match self.log.get_peers(info_hash) {
            Some(peers) if !peers.is_empty() => peers,
            _ => {
                println!("No peers available for downloading.");
                return;
            }
        };
        let candidates = peers
            .into_iter()
            .map(|peer| crate::peer::BtPeer::new(peer.ip_address, peer.port))
            .collect();

        let files = match FileSet::open(&metadata, &entry.data_save_path) {
            Ok(files) => Arc::new(files),
            Err(err) => {
                println!("Failed to open backing files: {:?}", err);
                return;
            }
        };
        let _ = files.initialize_for_download();

        let coordinator = Coordinator::new(
            metadata,
            files,
            self.log.clone(),
            self.peer_id,
            self.cfg.peer_read_write_timeout_seconds,
            self.logger.clone(),
        );
        match coordinator.download(candidates) {
            Ok(()) => println!("Download initiated."),
            Err(err) => println!("Download failed: {:?}", err),
        }
    }

    fn get_torrent_info(&mut self, info_hash: &str) {
        match self.log.get_entry(info_hash) {
            Some(entry) => println!("{:#?}", entry),
            None => println!("Torrent with info_hash {} not found.", info_hash),
        }
    }

    fn get_torrent_log(&mut self) {
        for info_hash in self.log.all_info_hashes() {
            if let Some(entry) = self.log.get_entry(&info_hash) {
                println!("{}: {:#?}", info_hash, entry);
            }
        }
    }
}

fn decode_info_hash(hex: &str) -> [u8; 20] {
    let mut bytes = [0u8; 20];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate().take(20) {
        if let Ok(chunk_str) = std::str::from_utf8(chunk) {
            if let Ok(byte) = u8::from_str_radix(chunk_str, 16) {
                bytes[i] = byte;
            }
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_peer_id_has_client_prefix() {
        let id = generate_peer_id();
        assert_eq!(&id[..4], b"-DT0");
    }

    #[test]
    fn test_decode_info_hash_round_trips_through_hex() {
        let hash = [0xAB; 20];
        let hex = crate::torrent::metainfo::bytes_to_hex(&hash);
        assert_eq!(decode_info_hash(&hex), hash);
    }
}
