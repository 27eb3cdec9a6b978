use chrono::{DateTime, Local};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use crate::tracker_peer::{Peer, PeerEvent};

pub const TRACKER_ID: &str = "-DTRK0001-";

/// The current set of peers known for one torrent.
#[derive(Debug, Clone, Default)]
pub struct Swarm {
    pub peers: Vec<Peer>,
    pub last_updated: Option<DateTime<Local>>,
}

impl Swarm {
    pub fn complete(&self) -> usize {
        self.peers.iter().filter(|p| p.is_seeder()).count()
    }

    pub fn incomplete(&self) -> usize {
        self.peers.len() - self.complete()
    }
}

/// The tracker's whole in-memory state: one `Swarm` per torrent, keyed by
/// the lowercase hex info-hash rather than the raw 20-byte hash, since
/// every client-facing request and response carries the hash as hex.
pub struct AtomicTrackerStatus {
    torrents: Mutex<HashMap<String, Swarm>>,
}

impl Default for AtomicTrackerStatus {
    fn default() -> Self {
        AtomicTrackerStatus {
            torrents: Mutex::new(HashMap::new()),
        }
    }
}

impl AtomicTrackerStatus {
    /// Applies one announce event to the tracker state, mirroring
    /// `tracker.py`'s `Tracker.add_peer`.
    ///
    /// A `stopped` event removes the peer (matched by ip/port) from every
    /// torrent's swarm, regardless of `info_hash` — a stopping peer may not
    /// send one. Every other event requires `info_hash` to be `Some`.
    pub fn record_event(
        &self,
        info_hash: Option<&str>,
        peer_id: [u8; 20],
        ip: String,
        port: u16,
        event: PeerEvent,
        left: u64,
    ) {
        if event == PeerEvent::Stopped {
            self.remove_peer_by_address(&ip, port);
            return;
        }

        let info_hash = match info_hash {
            Some(hash) => hash,
            None => return,
        };

        let mut torrents = self.lock_torrents();
        let swarm = torrents.entry(info_hash.to_string()).or_default();

        match swarm.peers.iter_mut().find(|p| p.matches_address(&ip, port)) {
            Some(existing) => {
                existing.id = peer_id;
                existing.last_seen = Local::now();
                match event {
                    PeerEvent::Completed => {
                        if existing.left > 0 {
                            existing.left = 0;
                        }
                    }
                    PeerEvent::Started => existing.left = left,
                    PeerEvent::Stopped => unreachable!("handled above"),
                }
            }
            None => {
                if event == PeerEvent::Started {
                    swarm.peers.push(Peer::new(peer_id, ip, port, left));
                }
            }
        }
        swarm.last_updated = Some(Local::now());
    }

    fn remove_peer_by_address(&self, ip: &str, port: u16) {
        let mut torrents = self.lock_torrents();
        for swarm in torrents.values_mut() {
            swarm.peers.retain(|peer| !peer.matches_address(ip, port));
        }
    }

    /// Returns a clone of the swarm for `info_hash`, or `None` if the
    /// tracker has never seen that torrent.
    pub fn get_swarm(&self, info_hash: &str) -> Option<Swarm> {
        self.lock_torrents().get(info_hash).cloned()
    }

    fn lock_torrents(&self) -> MutexGuard<HashMap<String, Swarm>> {
        self.torrents.lock().expect("tracker status mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_then_get_swarm() {
        let status = AtomicTrackerStatus::default();
        status.record_event(
            Some("abc123"),
            [1; 20],
            "127.0.0.1".to_string(),
            6881,
            PeerEvent::Started,
            100,
        );

        let swarm = status.get_swarm("abc123").unwrap();
        assert_eq!(swarm.peers.len(), 1);
        assert_eq!(swarm.incomplete(), 1);
        assert_eq!(swarm.complete(), 0);
    }

    #[test]
    fn test_completed_moves_peer_to_seeders() {
        let status = AtomicTrackerStatus::default();
        status.record_event(
            Some("abc123"),
            [1; 20],
            "127.0.0.1".to_string(),
            6881,
            PeerEvent::Started,
            100,
        );
        status.record_event(
            Some("abc123"),
            [1; 20],
            "127.0.0.1".to_string(),
            6881,
            PeerEvent::Completed,
            0,
        );

        let swarm = status.get_swarm("abc123").unwrap();
        assert_eq!(swarm.complete(), 1);
        assert_eq!(swarm.incomplete(), 0);
    }

    #[test]
    fn test_stopped_removes_peer_without_info_hash() {
        let status = AtomicTrackerStatus::default();
        status.record_event(
            Some("abc123"),
            [1; 20],
            "127.0.0.1".to_string(),
            6881,
            PeerEvent::Started,
            100,
        );
        status.record_event(None, [1; 20], "127.0.0.1".to_string(), 6881, PeerEvent::Stopped, 0);

        let swarm = status.get_swarm("abc123").unwrap();
        assert!(swarm.peers.is_empty());
    }

    #[test]
    fn test_unknown_info_hash_returns_none() {
        let status = AtomicTrackerStatus::default();
        assert!(status.get_swarm("does-not-exist").is_none());
    }

    #[test]
    fn test_completed_with_no_existing_peer_is_a_noop() {
        let status = AtomicTrackerStatus::default();
        status.record_event(
            Some("abc123"),
            [1; 20],
            "127.0.0.1".to_string(),
            6881,
            PeerEvent::Completed,
            0,
        );

        let swarm = status.get_swarm("abc123").unwrap();
        assert!(swarm.peers.is_empty());
    }
}
