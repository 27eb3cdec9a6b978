use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::torrent::TorrentMetadata;

const ZERO_CHUNK_LENGTH: usize = 16 * 1024;

#[derive(Debug)]
pub enum StorageError {
    Io(io::Error),
    OffsetOutOfRange { offset: u64, total_size: u64 },
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

struct BackingFile {
    file: Mutex<File>,
    /// Starting byte offset of this file within the torrent's linear address space.
    offset: u64,
    length: u64,
}

/// Maps the linear piece/block address space of a torrent onto one or more
/// backing files on disk, matching the single-file and multi-file layouts
/// of the metainfo format.
pub struct FileSet {
    files: Vec<BackingFile>,
    piece_length: u64,
    total_size: u64,
}

impl FileSet {
    /// Opens (creating if necessary) every backing file for `metadata` under
    /// `download_dir`, laying out a single file directly in `download_dir`
    /// and a multi-file torrent under `download_dir/<name>/`.
    pub fn open(metadata: &TorrentMetadata, download_dir: &str) -> Result<Self, StorageError> {
        let mut files = Vec::with_capacity(metadata.files.len());
        let mut offset = 0u64;

        let single_file = metadata.files.len() == 1;
        for entry in &metadata.files {
            let path: PathBuf = if single_file {
                Path::new(download_dir).join(&metadata.name)
            } else {
                Path::new(download_dir).join(&metadata.name).join(&entry.path)
            };
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(&path)?;
            files.push(BackingFile {
                file: Mutex::new(file),
                offset,
                length: entry.length,
            });
            offset += entry.length;
        }

        Ok(Self {
            files,
            piece_length: metadata.piece_length,
            total_size: metadata.total_size,
        })
    }

    /// Writes `data` at the global byte offset for `(piece_index, block_offset)`,
    /// splitting the write across backing file boundaries as needed.
    pub fn write_block(
        &self,
        piece_index: u32,
        block_offset: u32,
        data: &[u8],
    ) -> Result<(), StorageError> {
        let mut global_offset = piece_index as u64 * self.piece_length + block_offset as u64;
        self.check_offset(global_offset)?;
        let mut remaining = data;

        for backing in &self.files {
            let file_start = backing.offset;
            let file_end = file_start + backing.length;
            if file_start <= global_offset && global_offset < file_end {
                let file_offset = global_offset - file_start;
                let bytes_to_write = remaining.len().min((file_end - global_offset) as usize);

                let mut file = backing.file.lock().expect("file lock poisoned");
                file.seek(SeekFrom::Start(file_offset))?;
                file.write_all(&remaining[..bytes_to_write])?;
                drop(file);

                remaining = &remaining[bytes_to_write..];
                global_offset += bytes_to_write as u64;
                if remaining.is_empty() {
                    break;
                }
            }
        }

        if !remaining.is_empty() {
            return Err(StorageError::OffsetOutOfRange {
                offset: global_offset,
                total_size: self.total_size,
            });
        }
        Ok(())
    }

    /// Reads `length` bytes starting at the global byte offset for
    /// `(piece_index, block_offset)`, gathering across backing files.
    pub fn read_block(
        &self,
        piece_index: u32,
        block_offset: u32,
        length: u32,
    ) -> Result<Vec<u8>, StorageError> {
        let mut global_offset = piece_index as u64 * self.piece_length + block_offset as u64;
        self.check_offset(global_offset)?;
        let mut remaining = length as usize;
        let mut out = Vec::with_capacity(remaining);

        for backing in &self.files {
            let file_start = backing.offset;
            let file_end = file_start + backing.length;
            if remaining == 0 {
                break;
            }
            if file_start <= global_offset && global_offset < file_end {
                let file_offset = global_offset - file_start;
                let bytes_to_read = remaining.min((file_end - global_offset) as usize);

                let mut buf = vec![0u8; bytes_to_read];
                let mut file = backing.file.lock().expect("file lock poisoned");
                file.seek(SeekFrom::Start(file_offset))?;
                file.read_exact(&mut buf)?;
                drop(file);

                out.extend_from_slice(&buf);
                remaining -= bytes_to_read;
                global_offset += bytes_to_read as u64;
            }
        }

        if remaining > 0 {
            return Err(StorageError::OffsetOutOfRange {
                offset: global_offset,
                total_size: self.total_size,
            });
        }
        Ok(out)
    }

    /// Pre-allocates every backing file to its full length with zero bytes,
    /// so random-offset writes during download never need to extend a file.
    pub fn initialize_for_download(&self) -> Result<(), StorageError> {
        let zeroes = [0u8; ZERO_CHUNK_LENGTH];
        for backing in &self.files {
            let mut file = backing.file.lock().expect("file lock poisoned");
            file.seek(SeekFrom::Start(0))?;
            let mut remaining = backing.length as usize;
            while remaining > 0 {
                let chunk = remaining.min(ZERO_CHUNK_LENGTH);
                file.write_all(&zeroes[..chunk])?;
                remaining -= chunk;
            }
        }
        Ok(())
    }

    fn check_offset(&self, offset: u64) -> Result<(), StorageError> {
        if offset >= self.total_size {
            return Err(StorageError::OffsetOutOfRange {
                offset,
                total_size: self.total_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::torrent::FileEntry;

    fn test_metadata(files: Vec<FileEntry>, piece_length: u64) -> TorrentMetadata {
        let total_size = files.iter().map(|f| f.length).sum();
        TorrentMetadata {
            info_hash: [0; 20],
            name: "fileset-test".into(),
            tracker_url: "http://tracker.example/announce".into(),
            piece_length,
            total_size,
            pieces: vec![],
            files,
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dtorrent-fileset-{}-{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_single_file_write_then_read_round_trips() {
        let dir = temp_dir("single");
        let metadata = test_metadata(
            vec![FileEntry {
                length: 32,
                path: "fileset-test".into(),
            }],
            16,
        );
        let set = FileSet::open(&metadata, dir.to_str().unwrap()).unwrap();
        set.initialize_for_download().unwrap();

        set.write_block(0, 0, &[1u8; 16]).unwrap();
        set.write_block(1, 0, &[2u8; 16]).unwrap();

        assert_eq!(set.read_block(0, 0, 16).unwrap(), vec![1u8; 16]);
        assert_eq!(set.read_block(1, 0, 16).unwrap(), vec![2u8; 16]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_write_spans_file_boundary_in_multi_file_torrent() {
        let dir = temp_dir("multi");
        let metadata = test_metadata(
            vec![
                FileEntry {
                    length: 4,
                    path: "a.bin".into(),
                },
                FileEntry {
                    length: 4,
                    path: "b.bin".into(),
                },
            ],
            8,
        );
        let set = FileSet::open(&metadata, dir.to_str().unwrap()).unwrap();
        set.initialize_for_download().unwrap();

        let block = vec![9u8; 8];
        set.write_block(0, 0, &block).unwrap();

        assert_eq!(set.read_block(0, 0, 4).unwrap(), vec![9u8; 4]);
        assert_eq!(set.read_block(0, 4, 4).unwrap(), vec![9u8; 4]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_out_of_range_offset_is_an_error() {
        let dir = temp_dir("range");
        let metadata = test_metadata(
            vec![FileEntry {
                length: 8,
                path: "fileset-test".into(),
            }],
            8,
        );
        let set = FileSet::open(&metadata, dir.to_str().unwrap()).unwrap();
        set.initialize_for_download().unwrap();

        assert!(matches!(
            set.read_block(1, 0, 8),
            Err(StorageError::OffsetOutOfRange { .. })
        ));

        fs::remove_dir_all(&dir).ok();
    }
}
