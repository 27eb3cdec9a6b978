use std::io;
use std::sync::Arc;

use logger::{Logger, LoggerError};

use crate::config::Cfg;
use crate::http_server::Server;
use crate::torrent_store::{TorrentStore, TorrentStoreError};
use crate::tracker_status::AtomicTrackerStatus;

const DEFAULT_CONFIG_PATH: &str = "./dtracker.config";
const LOG_ROTATION_BYTES: u64 = 1_000_000;

/// The tracker itself: wires up logging, in-memory swarm state, on-disk
/// torrent storage, and the HTTP server. Serves as the application's
/// starting point.
pub struct BtTracker {
    _logger: Logger,
    server: Server,
}

#[derive(Debug)]
pub enum BtTrackerError {
    LoggerInitError(LoggerError),
    TorrentStoreError(TorrentStoreError),
    CreatingServerError(io::Error),
    StartingServerError(io::Error),
}

impl BtTracker {
    pub fn init() -> Result<Self, BtTrackerError> {
        let cfg = Cfg::new(DEFAULT_CONFIG_PATH).unwrap_or_default();

        let logger = Logger::new(&cfg.log_directory, LOG_ROTATION_BYTES)
            .map_err(BtTrackerError::LoggerInitError)?;
        let logger_sender = logger.new_sender();

        let tracker_status = Arc::new(AtomicTrackerStatus::default());
        let torrent_store = Arc::new(
            TorrentStore::new(&cfg.torrent_data_directory).map_err(BtTrackerError::TorrentStoreError)?,
        );

        let server = Server::init(
            cfg.http_port,
            cfg.thread_pool_size,
            tracker_status,
            torrent_store,
            logger_sender,
        )
        .map_err(BtTrackerError::CreatingServerError)?;

        Ok(Self {
            _logger: logger,
            server,
        })
    }

    /// Starts the server for handling requests.
    pub fn run(&self) -> Result<(), BtTrackerError> {
        self.server
            .serve()
            .map_err(BtTrackerError::StartingServerError)
    }
}
