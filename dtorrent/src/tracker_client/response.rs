use bencoder::bencode::{Bencode, BencodeError};

use crate::peer::BtPeer;

#[derive(Debug)]
pub enum ResponseError {
    Bencode(BencodeError),
    NotADict,
    MissingInterval,
    MissingPeers,
    PeersWrongType,
}

#[derive(Debug)]
pub struct AnnounceResponse {
    pub interval: i64,
    pub complete: i64,
    pub incomplete: i64,
    pub peers: Vec<BtPeer>,
    pub failure_reason: Option<String>,
}

impl AnnounceResponse {
    /// Parses a tracker's bencoded announce response, expecting the
    /// compact peer list encoding (a single binary string of 6-byte
    /// chunks) rather than the dictionary-of-peers model.
    pub fn from_bencoded(data: &[u8]) -> Result<Self, ResponseError> {
        let decoded = Bencode::decode(data).map_err(ResponseError::Bencode)?;
        let dict = match decoded {
            Bencode::BDict(d) => d,
            _ => return Err(ResponseError::NotADict),
        };

        if let Some(Bencode::BString(reason)) = dict.get(&b"failure reason".to_vec()) {
            return Ok(Self {
                interval: 0,
                complete: 0,
                incomplete: 0,
                peers: Vec::new(),
                failure_reason: Some(String::from_utf8_lossy(reason).into_owned()),
            });
        }

        let interval = match dict.get(&b"interval".to_vec()) {
            Some(Bencode::BNumber(n)) => *n,
            _ => return Err(ResponseError::MissingInterval),
        };
        let complete = match dict.get(&b"complete".to_vec()) {
            Some(Bencode::BNumber(n)) => *n,
            _ => 0,
        };
        let incomplete = match dict.get(&b"incomplete".to_vec()) {
            Some(Bencode::BNumber(n)) => *n,
            _ => 0,
        };
        let peers = match dict.get(&b"peers".to_vec()) {
            Some(Bencode::BString(bytes)) => BtPeer::parse_compact_list(bytes),
            Some(_) => return Err(ResponseError::PeersWrongType),
            None => return Err(ResponseError::MissingPeers),
        };

        Ok(Self {
            interval,
            complete,
            incomplete,
            peers,
            failure_reason: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_from_bencoded_compact_peers() {
        let mut dict = BTreeMap::new();
        dict.insert(b"interval".to_vec(), Bencode::BNumber(1800));
        dict.insert(b"complete".to_vec(), Bencode::BNumber(1));
        dict.insert(b"incomplete".to_vec(), Bencode::BNumber(2));
        dict.insert(
            b"peers".to_vec(),
            Bencode::BString(vec![127, 0, 0, 1, 0x1A, 0xE1]),
        );
        let bytes = Bencode::BDict(dict).encode();

        let response = AnnounceResponse::from_bencoded(&bytes).unwrap();
        assert_eq!(response.interval, 1800);
        assert_eq!(response.peers.len(), 1);
        assert_eq!(response.peers[0].ip, "127.0.0.1");
        assert_eq!(response.peers[0].port, 6881);
    }

    #[test]
    fn test_from_bencoded_failure_reason() {
        let mut dict = BTreeMap::new();
        dict.insert(
            b"failure reason".to_vec(),
            Bencode::BString(b"unknown info_hash".to_vec()),
        );
        let bytes = Bencode::BDict(dict).encode();

        let response = AnnounceResponse::from_bencoded(&bytes).unwrap();
        assert_eq!(response.failure_reason.as_deref(), Some("unknown info_hash"));
    }
}
