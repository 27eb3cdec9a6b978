pub mod announce_request;
pub mod announce_response;
pub mod multipart;

pub use announce_request::{AnnounceRequest, AnnounceRequestError};
pub use announce_response::AnnounceResponse;
