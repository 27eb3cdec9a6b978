use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use dtorrent::bitfield::PieceBitfield;
use dtorrent::log::TorrentLog;
use dtorrent::peer::PeerSession;
use dtorrent::storage::FileSet;
use dtorrent::torrent::{FileEntry, TorrentMetadata};
use logger::{Logger, LoggerSender};
use sha1::{Digest, Sha1};

pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "dtorrent-e2e-{}-{}-{:?}",
        tag,
        std::process::id(),
        thread::current().id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn test_logger(tag: &str) -> LoggerSender {
    let dir = temp_dir(&format!("log-{}", tag));
    let logger = Logger::new(dir.to_str().unwrap(), 10 * 1024 * 1024).unwrap();
    logger.new_sender()
}

/// Builds metadata for a torrent whose backing files hold `contents` in
/// order, hashing `contents.concat()` into `piece_length`-sized pieces.
pub fn build_metadata(
    name: &str,
    piece_length: u64,
    files: Vec<(&str, Vec<u8>)>,
) -> TorrentMetadata {
    let mut whole = Vec::new();
    let mut entries = Vec::new();
    for (path, bytes) in &files {
        whole.extend_from_slice(bytes);
        entries.push(FileEntry {
            length: bytes.len() as u64,
            path: path.to_string(),
        });
    }

    let mut pieces = Vec::new();
    for chunk in whole.chunks(piece_length as usize) {
        pieces.extend_from_slice(&Sha1::digest(chunk));
    }

    let digest = Sha1::digest(format!("{}:{}", name, whole.len()).as_bytes());
    let mut info_hash = [0u8; 20];
    info_hash.copy_from_slice(&digest);

    TorrentMetadata {
        info_hash,
        name: name.to_string(),
        tracker_url: "http://tracker.example/announce".to_string(),
        piece_length,
        total_size: whole.len() as u64,
        pieces,
        files: entries,
    }
}

/// Writes `contents` (in the same order passed to `build_metadata`) into a
/// freshly opened `FileSet` under `dir`, as if the download had already
/// completed there.
pub fn seed_file_set(metadata: &TorrentMetadata, dir: &std::path::Path, contents: &[Vec<u8>]) -> Arc<FileSet> {
    let files = Arc::new(FileSet::open(metadata, dir.to_str().unwrap()).unwrap());
    files.initialize_for_download().unwrap();

    let mut offset = 0u64;
    let whole: Vec<u8> = contents.iter().flatten().copied().collect();
    for chunk in whole.chunks(metadata.piece_length as usize) {
        let piece_index = (offset / metadata.piece_length) as u32;
        files.write_block(piece_index, 0, chunk).unwrap();
        offset += chunk.len() as u64;
    }
    files
}

/// Starts a background listener that accepts inbound peer connections and
/// serves `files` forever, mirroring what `main.rs`'s incoming listener does
/// for a real seeder. Returns the bound port.
pub fn spawn_seeder(
    info_hash: [u8; 20],
    our_peer_id: [u8; 20],
    files: Arc<FileSet>,
    piece_length: u64,
    piece_count: usize,
    logger: LoggerSender,
) -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        for incoming in listener.incoming() {
            let stream = match incoming {
                Ok(stream) => stream,
                Err(_) => continue,
            };
            let files = files.clone();
            let logger = logger.clone();

            thread::spawn(move || {
                let session = PeerSession::accept_incoming(stream, our_peer_id, 5, logger.clone(), move |hash| {
                    if hash == info_hash {
                        Some(PieceBitfield::all_ones(piece_count))
                    } else {
                        None
                    }
                });
                if let Ok(mut session) = session {
                    let _ = session.serve_forever(&files, piece_length);
                }
            });
        }
    });

    port
}

pub fn new_log(tag: &str) -> (TorrentLog, String, String, PathBuf) {
    let dir = temp_dir(&format!("log-state-{}", tag));
    let json_path = dir.join("torrent_log.json").to_string_lossy().into_owned();
    let torrent_dir = dir.join("torrents").to_string_lossy().into_owned();
    std::fs::create_dir_all(&torrent_dir).unwrap();
    let log = TorrentLog::new(&json_path, &torrent_dir).unwrap();
    (log, json_path, torrent_dir, dir)
}
