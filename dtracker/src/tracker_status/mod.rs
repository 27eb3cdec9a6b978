pub mod atomic_tracker_status;

pub use atomic_tracker_status::{AtomicTrackerStatus, Swarm, TRACKER_ID};
