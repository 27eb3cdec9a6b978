use std::env;
use std::net::TcpListener;
use std::process;
use std::sync::Arc;
use std::thread;

use dtorrent::cli::PeerApp;
use dtorrent::config::Cfg;
use dtorrent::log::TorrentLog;
use dtorrent::peer::PeerSession;
use logger::Logger;

const DEFAULT_CONFIG_PATH: &str = "./dtorrent.config";
const DEFAULT_TRACKER_URL: &str = "http://127.0.0.1:8080";
const LOG_ROTATION_BYTES: u64 = 10 * 1024 * 1024;

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    let config_path = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_CONFIG_PATH);

    let cfg = Cfg::new(config_path).unwrap_or_default();

    let logger = Logger::new(&cfg.log_directory, LOG_ROTATION_BYTES)
        .map_err(|err| format!("Failed to start logger: {:?}", err))?;
    let logger_sender = logger.new_sender();

    let log_path = format!("{}/torrent_log.json", cfg.download_directory);
    let torrent_log = Arc::new(
        TorrentLog::new(&log_path, &cfg.torrent_directory)
            .map_err(|err| format!("Failed to load torrent log: {:?}", err))?,
    );

    let peer_id = dtorrent::cli::generate_peer_id();
    spawn_incoming_listener(cfg.clone(), torrent_log.clone(), logger_sender.clone(), peer_id);

    let tracker_url = env::var("TRACKER_URL").unwrap_or_else(|_| DEFAULT_TRACKER_URL.to_string());
    let mut app = PeerApp::new(cfg, torrent_log, logger_sender, peer_id, tracker_url);
    app.run().map_err(|err| format!("{:?}", err))
}

/// Listens for inbound peer connections and spawns one `serve_forever` thread
/// per accepted connection, mirroring `peer.py`'s `listen_peer` loop.
fn spawn_incoming_listener(
    cfg: Cfg,
    log: Arc<TorrentLog>,
    logger: logger::LoggerSender,
    our_peer_id: [u8; 20],
) {
    thread::spawn(move || {
        let listener = match TcpListener::bind(("0.0.0.0", cfg.tcp_port)) {
            Ok(listener) => listener,
            Err(err) => {
                logger.error(&format!("Failed to bind listening socket: {}", err));
                return;
            }
        };

        for incoming in listener.incoming() {
            let stream = match incoming {
                Ok(stream) => stream,
                Err(_) => continue,
            };
            let log = log.clone();
            let logger = logger.clone();
            let timeout_secs = cfg.peer_read_write_timeout_seconds;

            thread::spawn(move || {
                let session = PeerSession::accept_incoming(
                    stream,
                    our_peer_id,
                    timeout_secs,
                    logger.clone(),
                    {
                        let log = log.clone();
                        move |info_hash| {
                            let info_hash_hex = dtorrent::torrent::metainfo::bytes_to_hex(&info_hash);
                            log.get_bitfield(&info_hash_hex).map(|bits| {
                                dtorrent::bitfield::PieceBitfield::from_bools(
                                    bits.into_iter().map(|b| b != 0).collect(),
                                )
                            })
                        }
                    },
                );

                let mut session = match session {
                    Ok(session) => session,
                    Err(err) => {
                        logger.warn(&format!("Incoming handshake failed: {:?}", err));
                        return;
                    }
                };
                logger.info("Accepted incoming peer connection.");

                let info_hash_hex = dtorrent::torrent::metainfo::bytes_to_hex(&session.info_hash());
                let entry = match log.get_entry(&info_hash_hex) {
                    Some(entry) => entry,
                    None => {
                        logger.warn(&format!(
                            "No torrent log entry for {}; closing incoming connection.",
                            info_hash_hex
                        ));
                        return;
                    }
                };
                let torrent_bytes = match log.get_bytes_of_torrent_file(&info_hash_hex) {
                    Some(bytes) => bytes,
                    None => {
                        logger.warn(&format!(
                            "No .torrent bytes on disk for {}; closing incoming connection.",
                            info_hash_hex
                        ));
                        return;
                    }
                };
                let metadata = match dtorrent::torrent::TorrentMetadata::from_bencoded(&torrent_bytes) {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        logger.warn(&format!("Invalid .torrent data for {}: {:?}", info_hash_hex, err));
                        return;
                    }
                };
                let files = match dtorrent::storage::FileSet::open(&metadata, &entry.data_save_path) {
                    Ok(files) => files,
                    Err(err) => {
                        logger.warn(&format!(
                            "Failed to open backing files for {}: {:?}",
                            info_hash_hex, err
                        ));
                        return;
                    }
                };

                if let Err(err) = session.serve_forever(&files, entry.piece_size) {
                    logger.warn(&format!("Serving incoming peer {} ended: {:?}", info_hash_hex, err));
                }
            });
        }
    });
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(1);
    }
    process::exit(0);
}
