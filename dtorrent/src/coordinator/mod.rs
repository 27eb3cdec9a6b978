use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use logger::LoggerSender;

use crate::bitfield::PieceBitfield;
use crate::log::TorrentLog;
use crate::peer::{BtPeer, PeerSession};
use crate::storage::FileSet;
use crate::torrent::TorrentMetadata;

#[derive(Debug)]
pub enum CoordinatorError {
    NoPeersAvailable,
}

const CLAIM_RETRY_DELAY: Duration = Duration::from_millis(5);

/// Shared pool of missing pieces. `in_progress` tracks which peer currently
/// holds a piece so no two peers fetch it at once; `failed_with` tracks
/// which peers have already failed a piece so they don't retry it.
struct PiecePool {
    remaining: Vec<u32>,
    in_progress: HashMap<u32, usize>,
    failed_with: HashMap<u32, HashSet<usize>>,
}

/// Drives the download of every missing piece of one torrent across a set
/// of peers. Peers claim pieces from a shared pool on demand rather than
/// receiving a static up-front assignment, so a piece one peer fails to
/// deliver (bad hash, dropped connection, unexpected message) is released
/// back to the pool for any other peer that advertised it to claim.
pub struct Coordinator {
    metadata: Arc<TorrentMetadata>,
    files: Arc<FileSet>,
    log: Arc<TorrentLog>,
    our_peer_id: [u8; 20],
    timeout_secs: u64,
    logger: LoggerSender,
}

impl Coordinator {
    pub fn new(
        metadata: Arc<TorrentMetadata>,
        files: Arc<FileSet>,
        log: Arc<TorrentLog>,
        our_peer_id: [u8; 20],
        timeout_secs: u64,
        logger: LoggerSender,
    ) -> Self {
        Self {
            metadata,
            files,
            log,
            our_peer_id,
            timeout_secs,
            logger,
        }
    }

    /// Connects to every candidate peer, then blocks until every piece has
    /// either been downloaded or every peer that advertised it has failed
    /// on it. Peers that fail to connect or handshake are simply dropped
    /// from the round; pieces only they advertised are skipped.
    pub fn download(&self, candidates: Vec<BtPeer>) -> Result<(), CoordinatorError> {
        let our_bitfield = self.current_bitfield();

        let sessions = self.connect_all(candidates, &our_bitfield);
        if sessions.is_empty() {
            return Err(CoordinatorError::NoPeersAvailable);
        }

        let pool = Arc::new(Mutex::new(PiecePool {
            remaining: our_bitfield.missing(),
            in_progress: HashMap::new(),
            failed_with: HashMap::new(),
        }));

        let handles: Vec<_> = sessions
            .into_iter()
            .enumerate()
            .map(|(peer_idx, session)| self.spawn_peer_worker(peer_idx, session, pool.clone()))
            .collect();

        for handle in handles {
            let _ = handle.join();
        }
        Ok(())
    }

    fn current_bitfield(&self) -> PieceBitfield {
        let piece_count = self.metadata.piece_count() as usize;
        match self.log.get_bitfield(&self.metadata.info_hash_hex()) {
            Some(bits) => PieceBitfield::from_bools(
                bits.into_iter().map(|b| b != 0).collect(),
            ),
            None => PieceBitfield::new_empty(piece_count),
        }
    }

    fn connect_all(&self, candidates: Vec<BtPeer>, our_bitfield: &PieceBitfield) -> Vec<PeerSession> {
        let handles: Vec<_> = candidates
            .into_iter()
            .map(|peer| {
                let info_hash = self.metadata.info_hash;
                let our_peer_id = self.our_peer_id;
                let bitfield = our_bitfield.clone();
                let timeout_secs = self.timeout_secs;
                let logger = self.logger.clone();
                thread::spawn(move || {
                    PeerSession::connect_outgoing(
                        peer,
                        info_hash,
                        our_peer_id,
                        &bitfield,
                        timeout_secs,
                        logger,
                    )
                    .ok()
                })
            })
            .collect();

        handles
            .into_iter()
            .filter_map(|handle| handle.join().ok().flatten())
            .collect()
    }

    /// Claims pieces this peer advertises and hasn't already failed on from
    /// the shared pool until none remain reachable for it, downloading each
    /// claimed piece in turn. If no piece is currently claimable but another
    /// peer still holds one in progress, waits briefly rather than exiting,
    /// since that piece may come back to the pool on failure.
    fn spawn_peer_worker(
        &self,
        peer_idx: usize,
        mut session: PeerSession,
        pool: Arc<Mutex<PiecePool>>,
    ) -> thread::JoinHandle<()> {
        let metadata = self.metadata.clone();
        let files = self.files.clone();
        let log = self.log.clone();
        let logger = self.logger.clone();

        thread::spawn(move || {
            let info_hash_hex = metadata.info_hash_hex();

            'outer: loop {
                let piece_index = loop {
                    let mut pool = pool.lock().expect("piece pool mutex poisoned");
                    let claimable = pool.remaining.iter().copied().find(|&piece| {
                        !pool.in_progress.contains_key(&piece)
                            && session.has_piece(piece)
                            && !pool
                                .failed_with
                                .get(&piece)
                                .map(|tried| tried.contains(&peer_idx))
                                .unwrap_or(false)
                    });
                    match claimable {
                        Some(piece) => {
                            pool.in_progress.insert(piece, peer_idx);
                            break piece;
                        }
                        None if pool.in_progress.is_empty() => break 'outer,
                        None => {
                            drop(pool);
                            thread::sleep(CLAIM_RETRY_DELAY);
                        }
                    }
                };

                let piece_length = metadata.piece_length_of(piece_index);
                let expected_hash = match metadata.expected_piece_hash(piece_index) {
                    Some(hash) => hash.to_vec(),
                    None => {
                        let mut pool = pool.lock().expect("piece pool mutex poisoned");
                        pool.in_progress.remove(&piece_index);
                        pool.remaining.retain(|&p| p != piece_index);
                        continue;
                    }
                };

                match session.download_piece(piece_index, piece_length, &expected_hash) {
                    Ok(piece) => {
                        if let Err(err) = files.write_block(piece_index, 0, &piece) {
                            logger.error(&format!("Failed to persist piece {}: {:?}", piece_index, err));
                        } else {
                            let _ = log.update_bitfield(&info_hash_hex, piece_index, 1);
                            logger.info(&format!("Piece {} saved to disk", piece_index));
                        }
                        let mut pool = pool.lock().expect("piece pool mutex poisoned");
                        pool.in_progress.remove(&piece_index);
                        pool.remaining.retain(|&p| p != piece_index);
                    }
                    Err(err) => {
                        logger.warn(&format!(
                            "Failed to download piece {} from {}: {:?}",
                            piece_index, session.peer().ip, err
                        ));
                        let mut pool = pool.lock().expect("piece pool mutex poisoned");
                        pool.in_progress.remove(&piece_index);
                        pool.failed_with.entry(piece_index).or_default().insert(peer_idx);
                    }
                }
            }
        })
    }
}
