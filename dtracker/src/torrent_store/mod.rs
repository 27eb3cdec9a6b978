pub mod store;

pub use store::{TorrentStore, TorrentStoreError};
