/// A peer endpoint as returned by the tracker, used as the coordinator's
/// identifier for a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BtPeer {
    pub ip: String,
    pub port: u16,
}

impl BtPeer {
    pub fn new(ip: String, port: u16) -> Self {
        Self { ip, port }
    }

    /// Decodes the 6-byte compact peer format: 4-byte big-endian IPv4, then
    /// 2-byte big-endian port.
    pub fn from_compact_chunk(chunk: &[u8]) -> Option<Self> {
        if chunk.len() != 6 {
            return None;
        }
        let ip = format!("{}.{}.{}.{}", chunk[0], chunk[1], chunk[2], chunk[3]);
        let port = u16::from_be_bytes([chunk[4], chunk[5]]);
        Some(Self { ip, port })
    }

    /// Decodes a compact peer list: the concatenation of 6-byte chunks.
    pub fn parse_compact_list(bytes: &[u8]) -> Vec<BtPeer> {
        bytes
            .chunks_exact(6)
            .filter_map(BtPeer::from_compact_chunk)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_compact_chunk() {
        let chunk = [127, 0, 0, 1, 0x1A, 0xE1];
        let peer = BtPeer::from_compact_chunk(&chunk).unwrap();
        assert_eq!(peer.ip, "127.0.0.1");
        assert_eq!(peer.port, 6881);
    }

    #[test]
    fn test_parse_compact_list_multiple_peers() {
        let mut bytes = vec![127, 0, 0, 1, 0x1A, 0xE1];
        bytes.extend([10, 0, 0, 2, 0x1A, 0xE2]);

        let peers = BtPeer::parse_compact_list(&bytes);
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[1].ip, "10.0.0.2");
        assert_eq!(peers[1].port, 6882);
    }

    #[test]
    fn test_parse_compact_list_ignores_trailing_partial_chunk() {
        let bytes = vec![127, 0, 0, 1, 0x1A, 0xE1, 0xFF];
        let peers = BtPeer::parse_compact_list(&bytes);
        assert_eq!(peers.len(), 1);
    }
}
