use std::collections::HashMap;

use crate::tracker_peer::PeerEvent;

#[derive(Debug)]
pub enum AnnounceRequestError {
    MissingPeerId,
    MissingPort,
    InvalidPort,
    InvalidPeerId,
    MissingInfoHash,
}

impl std::fmt::Display for AnnounceRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPeerId => write!(f, "missing required parameter: peer_id"),
            Self::MissingPort => write!(f, "missing required parameter: port"),
            Self::InvalidPort => write!(f, "port is not a number"),
            Self::InvalidPeerId => write!(f, "peer_id is not a valid 20-byte hex value"),
            Self::MissingInfoHash => write!(f, "missing required parameter: info_hash"),
        }
    }
}

/// One parsed `/announce` request, built from query parameters — both the
/// GET form and the decoded fields of a POST multipart body.
#[derive(Debug)]
pub struct AnnounceRequest {
    pub info_hash: Option<String>,
    pub peer_id: [u8; 20],
    pub ip: String,
    pub port: u16,
    pub left: u64,
    pub event: PeerEvent,
}

impl AnnounceRequest {
    pub fn from_params(
        params: &HashMap<String, String>,
        ip: String,
    ) -> Result<Self, AnnounceRequestError> {
        let event = params
            .get("event")
            .and_then(|s| s.parse::<PeerEvent>().ok())
            .unwrap_or_default();

        let info_hash = params.get("info_hash").map(|s| decode_percent_hex(s));

        if event != PeerEvent::Stopped && info_hash.is_none() {
            return Err(AnnounceRequestError::MissingInfoHash);
        }

        let peer_id_hex = params
            .get("peer_id")
            .map(|s| decode_percent_hex(s))
            .ok_or(AnnounceRequestError::MissingPeerId)?;
        let peer_id = decode_hex_20(&peer_id_hex).ok_or(AnnounceRequestError::InvalidPeerId)?;

        let port = params
            .get("port")
            .ok_or(AnnounceRequestError::MissingPort)?
            .parse::<u16>()
            .map_err(|_| AnnounceRequestError::InvalidPort)?;

        let left = params
            .get("left")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        Ok(Self {
            info_hash,
            peer_id,
            ip,
            port,
            left,
            event,
        })
    }
}

/// Undoes `url_encoder::encode`'s `%`-between-hex-pairs scheme: the hex
/// alphabet never contains `%`, so stripping it recovers the original hex
/// string.
fn decode_percent_hex(s: &str) -> String {
    s.replace('%', "")
}

fn decode_hex_20(hex: &str) -> Option<[u8; 20]> {
    if hex.len() != 40 {
        return None;
    }
    let mut bytes = [0u8; 20];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let chunk_str = std::str::from_utf8(chunk).ok()?;
        bytes[i] = u8::from_str_radix(chunk_str, 16).ok()?;
    }
    Some(bytes)
}
