pub mod generator;
pub mod metainfo;

pub use metainfo::{FileEntry, TorrentMetadata};
