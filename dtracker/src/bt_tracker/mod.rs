pub mod tracker;

pub use tracker::{BtTracker, BtTrackerError};
