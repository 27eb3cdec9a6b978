pub mod file_set;

pub use file_set::{FileSet, StorageError};
