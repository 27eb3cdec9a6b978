pub mod announce;
pub mod bt_tracker;
pub mod config;
pub mod http;
pub mod http_server;
pub mod torrent_store;
pub mod tracker_peer;
pub mod tracker_status;
