pub mod handshake;
pub mod message;

pub use handshake::Handshake;
pub use message::Message;
