pub mod bt_peer;
pub mod socket;
pub mod state;

pub mod session;

pub use bt_peer::BtPeer;
pub use session::{PeerSession, SessionError};
pub use socket::{PeerSocket, SocketError};
pub use state::PeerConnState;
