use std::collections::BTreeMap;

use bencoder::bencode::Bencode;

use crate::tracker_status::{Swarm, TRACKER_ID};

/// A `/announce` response: either the peer list for a successful request, or
/// a `failure reason` for an invalid one — never both.
#[derive(Debug)]
pub struct AnnounceResponse {
    pub interval: i64,
    pub complete: i64,
    pub incomplete: i64,
    pub peers: Vec<u8>,
    pub failure_reason: Option<String>,
}

const ANNOUNCE_INTERVAL_SECS: i64 = 1800;

impl AnnounceResponse {
    pub fn failure(reason: &str) -> Self {
        Self {
            interval: 0,
            complete: 0,
            incomplete: 0,
            peers: Vec::new(),
            failure_reason: Some(reason.to_string()),
        }
    }

    /// Builds a response from a swarm, excluding the requesting peer from
    /// the compact peer list it returns to itself.
    pub fn from_swarm(swarm: &Swarm, requesting_peer_id: [u8; 20]) -> Self {
        let mut peers = Vec::new();
        for peer in &swarm.peers {
            if peer.id == requesting_peer_id {
                continue;
            }
            peers.extend(encode_compact_peer(&peer.ip, peer.port));
        }

        Self {
            interval: ANNOUNCE_INTERVAL_SECS,
            complete: swarm.complete() as i64,
            incomplete: swarm.incomplete() as i64,
            peers,
            failure_reason: None,
        }
    }

    pub fn to_bencoded(&self) -> Vec<u8> {
        let mut dict = BTreeMap::new();
        if let Some(reason) = &self.failure_reason {
            dict.insert(
                b"failure reason".to_vec(),
                Bencode::BString(reason.clone().into_bytes()),
            );
            return Bencode::BDict(dict).encode();
        }

        dict.insert(b"interval".to_vec(), Bencode::BNumber(self.interval));
        dict.insert(b"complete".to_vec(), Bencode::BNumber(self.complete));
        dict.insert(b"incomplete".to_vec(), Bencode::BNumber(self.incomplete));
        dict.insert(b"peers".to_vec(), Bencode::BString(self.peers.clone()));
        dict.insert(
            b"tracker id".to_vec(),
            Bencode::BString(TRACKER_ID.as_bytes().to_vec()),
        );
        Bencode::BDict(dict).encode()
    }
}

fn encode_compact_peer(ip: &str, port: u16) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(6);
    for octet in ip.split('.') {
        bytes.push(octet.parse::<u8>().unwrap_or(0));
    }
    bytes.extend(port.to_be_bytes());
    bytes
}
