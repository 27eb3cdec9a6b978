use std::str::FromStr;

/// Possible announce events a peer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerEvent {
    Started,
    Stopped,
    Completed,
}

impl FromStr for PeerEvent {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(PeerEvent::Started),
            "stopped" => Ok(PeerEvent::Stopped),
            "completed" => Ok(PeerEvent::Completed),
            _ => Err(()),
        }
    }
}

impl Default for PeerEvent {
    fn default() -> Self {
        PeerEvent::Started
    }
}
