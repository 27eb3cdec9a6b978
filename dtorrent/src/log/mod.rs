pub mod torrent_log;

pub use torrent_log::{PeerRecord, TorrentLog, TorrentLogEntry, TorrentLogError};
