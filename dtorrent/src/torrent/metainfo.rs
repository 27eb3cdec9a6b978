use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;

use bencoder::bencode::Bencode;
use sha1::{Digest, Sha1};

/// Fixed request granularity for peer-wire `request` messages: 16 KiB.
pub const BLOCK_LENGTH: u32 = 16 * 1024;

/// One file entry in a torrent's virtual byte address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub length: u64,
    pub path: String,
}

/// Descriptor of a single torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentMetadata {
    pub info_hash: [u8; 20],
    pub name: String,
    pub tracker_url: String,
    pub piece_length: u64,
    pub total_size: u64,
    pub pieces: Vec<u8>,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum MetainfoError {
    Bencode(bencoder::bencode::BencodeError),
    NotADict,
    MissingAnnounce,
    MissingInfo,
    MissingField(&'static str),
    WrongType(&'static str),
    InvalidUtf8,
    BadPiecesLength,
    InvalidPieceLength,
    TotalSizeInconsistentWithPieces,
}

impl TorrentMetadata {
    pub fn piece_count(&self) -> u32 {
        (self.pieces.len() / 20) as u32
    }

    /// `piece_length` for every piece except the last, which may be shorter.
    pub fn piece_length_of(&self, index: u32) -> u64 {
        let piece_count = self.piece_count();
        if piece_count == 0 || index + 1 < piece_count {
            return self.piece_length;
        }
        self.total_size - (piece_count as u64 - 1) * self.piece_length
    }

    pub fn valid_block(&self, index: u32, offset: u64, length: u64) -> bool {
        offset + length <= self.piece_length_of(index)
    }

    pub fn expected_piece_hash(&self, index: u32) -> Option<&[u8]> {
        let start = index as usize * 20;
        let end = start + 20;
        self.pieces.get(start..end)
    }

    pub fn info_hash_hex(&self) -> String {
        bytes_to_hex(&self.info_hash)
    }

    /// Validates the metadata's structural invariants.
    pub fn validate(&self) -> Result<(), MetainfoError> {
        if self.piece_length == 0 {
            return Err(MetainfoError::InvalidPieceLength);
        }
        if self.pieces.len() % 20 != 0 {
            return Err(MetainfoError::BadPiecesLength);
        }
        let piece_count = self.piece_count() as u64;
        if piece_count == 0 {
            return Ok(());
        }
        if self.total_size > piece_count * self.piece_length {
            return Err(MetainfoError::TotalSizeInconsistentWithPieces);
        }
        if self.total_size <= (piece_count - 1) * self.piece_length {
            return Err(MetainfoError::TotalSizeInconsistentWithPieces);
        }
        Ok(())
    }

    /// Parses a bencoded `.torrent` document.
    pub fn from_bencoded(data: &[u8]) -> Result<Self, MetainfoError> {
        let bencode = Bencode::decode(data).map_err(MetainfoError::Bencode)?;
        let dict = match bencode {
            Bencode::BDict(d) => d,
            _ => return Err(MetainfoError::NotADict),
        };

        let announce = match dict.get(&b"announce".to_vec()) {
            Some(Bencode::BString(s)) => {
                String::from_utf8(s.clone()).map_err(|_| MetainfoError::InvalidUtf8)?
            }
            Some(_) => return Err(MetainfoError::WrongType("announce")),
            None => return Err(MetainfoError::MissingAnnounce),
        };

        let info = match dict.get(&b"info".to_vec()) {
            Some(Bencode::BDict(d)) => d,
            Some(_) => return Err(MetainfoError::WrongType("info")),
            None => return Err(MetainfoError::MissingInfo),
        };

        let metadata = Self::from_info_dict(announce, info)?;
        metadata
            .validate()
            .map_err(|_| MetainfoError::TotalSizeInconsistentWithPieces)?;
        Ok(metadata)
    }

    fn from_info_dict(
        announce: String,
        info: &BTreeMap<Vec<u8>, Bencode>,
    ) -> Result<Self, MetainfoError> {
        let piece_length = match info.get(&b"piece length".to_vec()) {
            Some(Bencode::BNumber(n)) if *n > 0 => *n as u64,
            Some(Bencode::BNumber(_)) => return Err(MetainfoError::InvalidPieceLength),
            Some(_) => return Err(MetainfoError::WrongType("piece length")),
            None => return Err(MetainfoError::MissingField("piece length")),
        };

        let pieces = match info.get(&b"pieces".to_vec()) {
            Some(Bencode::BString(s)) => s.clone(),
            Some(_) => return Err(MetainfoError::WrongType("pieces")),
            None => return Err(MetainfoError::MissingField("pieces")),
        };
        if pieces.len() % 20 != 0 {
            return Err(MetainfoError::BadPiecesLength);
        }

        let name = match info.get(&b"name".to_vec()) {
            Some(Bencode::BString(s)) => {
                String::from_utf8(s.clone()).map_err(|_| MetainfoError::InvalidUtf8)?
            }
            Some(_) => return Err(MetainfoError::WrongType("name")),
            None => return Err(MetainfoError::MissingField("name")),
        };

        let files = match info.get(&b"files".to_vec()) {
            Some(Bencode::BList(list)) => Self::decode_files(list)?,
            Some(_) => return Err(MetainfoError::WrongType("files")),
            None => return Err(MetainfoError::MissingField("files")),
        };

        let total_size = files.iter().map(|f| f.length).sum();
        let info_hash = sha1_info_hash(info);

        Ok(Self {
            info_hash,
            name,
            tracker_url: announce,
            piece_length,
            total_size,
            pieces,
            files,
        })
    }

    fn decode_files(list: &[Bencode]) -> Result<Vec<FileEntry>, MetainfoError> {
        list.iter()
            .map(|entry| {
                let dict = match entry {
                    Bencode::BDict(d) => d,
                    _ => return Err(MetainfoError::WrongType("files[]")),
                };
                let length = match dict.get(&b"length".to_vec()) {
                    Some(Bencode::BNumber(n)) if *n >= 0 => *n as u64,
                    _ => return Err(MetainfoError::MissingField("files[].length")),
                };
                let path = match dict.get(&b"path".to_vec()) {
                    Some(Bencode::BString(s)) => {
                        String::from_utf8(s.clone()).map_err(|_| MetainfoError::InvalidUtf8)?
                    }
                    _ => return Err(MetainfoError::MissingField("files[].path")),
                };
                Ok(FileEntry { length, path })
            })
            .collect()
    }

    fn info_bencode(&self) -> Bencode {
        let mut info = BTreeMap::new();
        info.insert(
            b"piece length".to_vec(),
            Bencode::BNumber(self.piece_length as i64),
        );
        info.insert(b"pieces".to_vec(), Bencode::BString(self.pieces.clone()));
        info.insert(
            b"name".to_vec(),
            Bencode::BString(self.name.clone().into_bytes()),
        );
        let files = self
            .files
            .iter()
            .map(|f| {
                let mut d = BTreeMap::new();
                d.insert(b"length".to_vec(), Bencode::BNumber(f.length as i64));
                d.insert(
                    b"path".to_vec(),
                    Bencode::BString(f.path.clone().into_bytes()),
                );
                Bencode::BDict(d)
            })
            .collect();
        info.insert(b"files".to_vec(), Bencode::BList(files));
        Bencode::BDict(info)
    }

    /// Re-encodes this metadata into a bencoded `.torrent` document.
    pub fn to_bencoded(&self) -> Vec<u8> {
        let mut dict = BTreeMap::new();
        dict.insert(
            b"announce".to_vec(),
            Bencode::BString(self.tracker_url.clone().into_bytes()),
        );
        dict.insert(b"info".to_vec(), self.info_bencode());
        Bencode::BDict(dict).encode()
    }
}

fn sha1_info_hash(info: &BTreeMap<Vec<u8>, Bencode>) -> [u8; 20] {
    let encoded = Bencode::BDict(info.clone()).encode();
    let digest = Sha1::digest(encoded);
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&digest);
    hash
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub fn sha1_hex(data: &[u8]) -> String {
    bytes_to_hex(&Sha1::digest(data))
}

/// Hashes the given file at `path` over one piece's worth of bytes starting
/// at `offset`, at most `piece_length` bytes. Used by piece validation.
pub fn read_file_range(path: &str, offset: u64, length: u64) -> std::io::Result<Vec<u8>> {
    use std::io::{Read, Seek, SeekFrom};
    let mut file = fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; length as usize];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_torrent_bytes() -> Vec<u8> {
        let mut info = BTreeMap::new();
        info.insert(b"piece length".to_vec(), Bencode::BNumber(4));
        info.insert(
            b"pieces".to_vec(),
            Bencode::BString(Sha1::digest(b"abcd").to_vec()),
        );
        info.insert(b"name".to_vec(), Bencode::BString(b"example".to_vec()));
        let mut file = BTreeMap::new();
        file.insert(b"length".to_vec(), Bencode::BNumber(4));
        file.insert(b"path".to_vec(), Bencode::BString(b"example".to_vec()));
        info.insert(b"files".to_vec(), Bencode::BList(vec![Bencode::BDict(file)]));

        let mut dict = BTreeMap::new();
        dict.insert(
            b"announce".to_vec(),
            Bencode::BString(b"http://example.com/announce".to_vec()),
        );
        dict.insert(b"info".to_vec(), Bencode::BDict(info));
        Bencode::BDict(dict).encode()
    }

    #[test]
    fn test_from_bencoded_full() {
        let metadata = TorrentMetadata::from_bencoded(&sample_torrent_bytes()).unwrap();
        assert_eq!(metadata.tracker_url, "http://example.com/announce");
        assert_eq!(metadata.name, "example");
        assert_eq!(metadata.piece_length, 4);
        assert_eq!(metadata.total_size, 4);
        assert_eq!(metadata.piece_count(), 1);
        assert_eq!(metadata.files.len(), 1);
    }

    #[test]
    fn test_missing_announce_is_an_error() {
        let mut dict = BTreeMap::new();
        dict.insert(b"info".to_vec(), Bencode::BDict(BTreeMap::new()));
        let bytes = Bencode::BDict(dict).encode();

        assert_eq!(
            TorrentMetadata::from_bencoded(&bytes).unwrap_err(),
            MetainfoError::MissingAnnounce
        );
    }

    #[test]
    fn test_write_then_parse_round_trips_info_hash() {
        let metadata = TorrentMetadata::from_bencoded(&sample_torrent_bytes()).unwrap();
        let reencoded = metadata.to_bencoded();
        let reparsed = TorrentMetadata::from_bencoded(&reencoded).unwrap();

        assert_eq!(reparsed.info_hash, metadata.info_hash);
        assert_eq!(reparsed.piece_length, metadata.piece_length);
        assert_eq!(reparsed.pieces, metadata.pieces);
        assert_eq!(reparsed.files, metadata.files);
        assert_eq!(reparsed.name, metadata.name);
    }

    #[test]
    fn test_last_piece_length_not_padded_to_zero() {
        // total_size divides piece_length evenly: last piece must still be
        // a full piece_length, not zero.
        let metadata = TorrentMetadata {
            info_hash: [0; 20],
            name: "n".into(),
            tracker_url: "t".into(),
            piece_length: 10,
            total_size: 20,
            pieces: vec![0u8; 40],
            files: vec![FileEntry {
                length: 20,
                path: "n".into(),
            }],
        };
        assert_eq!(metadata.piece_length_of(1), 10);
    }

    #[test]
    fn test_last_piece_length_short() {
        let metadata = TorrentMetadata {
            info_hash: [0; 20],
            name: "n".into(),
            tracker_url: "t".into(),
            piece_length: 10,
            total_size: 25,
            pieces: vec![0u8; 60],
            files: vec![],
        };
        assert_eq!(metadata.piece_length_of(2), 5);
    }

    #[test]
    fn test_valid_block_boundary() {
        let metadata = TorrentMetadata {
            info_hash: [0; 20],
            name: "n".into(),
            tracker_url: "t".into(),
            piece_length: 16,
            total_size: 16,
            pieces: vec![0u8; 20],
            files: vec![],
        };
        assert!(metadata.valid_block(0, 0, 16));
        assert!(!metadata.valid_block(0, 0, 17));
    }
}
