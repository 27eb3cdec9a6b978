use std::{net::TcpListener, sync::Arc};

use logger::LoggerSender;

use crate::http_server::request_handler::RequestHandler;
use crate::http_server::thread_pool::ThreadPool;
use crate::torrent_store::TorrentStore;
use crate::tracker_status::AtomicTrackerStatus;

/// Listens for inbound HTTP connections and dispatches each one to a thread
/// pool worker: a plain socket server, symmetric with dtorrent's own
/// hand-rolled `tracker_client`, rather than an HTTP framework.
pub struct Server {
    listener: TcpListener,
    pool: ThreadPool,
    status: Arc<AtomicTrackerStatus>,
    store: Arc<TorrentStore>,
    logger_sender: LoggerSender,
}

impl Server {
    pub fn init(
        http_port: u16,
        pool_size: usize,
        status: Arc<AtomicTrackerStatus>,
        store: Arc<TorrentStore>,
        logger_sender: LoggerSender,
    ) -> std::io::Result<Server> {
        let listener = TcpListener::bind(("0.0.0.0", http_port))?;
        Ok(Server {
            listener,
            pool: ThreadPool::new(pool_size, logger_sender.clone()),
            status,
            store,
            logger_sender,
        })
    }

    /// Handles new connections to the server.
    pub fn serve(&self) -> std::io::Result<()> {
        self.logger_sender.info("Tracker HTTP server is serving.");

        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(_) => continue,
            };
            let mut request_handler = RequestHandler::new(stream);
            let status = self.status.clone();
            let store = self.store.clone();
            let logger = self.logger_sender.clone();
            self.pool.execute(move || {
                if let Err(error) = request_handler.handle(status, store, logger.clone()) {
                    logger.error(&format!(
                        "An error occurred while attempting to handle a request: {:?}",
                        error
                    ));
                }
            });
        }
        Ok(())
    }
}
