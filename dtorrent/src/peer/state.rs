/// Per-peer lifecycle state.
///
/// ```text
/// New -> Connecting -> Handshaking -> Ready -> Downloading <-> Ready -> Closed
///                                         \-> Serving <-> Ready -/
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnState {
    New,
    Connecting,
    Handshaking,
    Ready,
    Downloading,
    Serving,
    Closed,
}
