pub mod bitfield;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod log;
pub mod peer;
pub mod storage;
pub mod torrent;
pub mod tracker_client;
pub mod wire;
