use std::net::TcpStream;

use logger::LoggerSender;

use crate::bitfield::PieceBitfield;
use crate::storage::{FileSet, StorageError};
use crate::torrent::metainfo::{bytes_to_hex, sha1_hex, BLOCK_LENGTH};
use crate::wire::{Handshake, Message};

use super::bt_peer::BtPeer;
use super::socket::{PeerSocket, SocketError};
use super::state::PeerConnState;

#[derive(Debug)]
pub enum SessionError {
    Socket(SocketError),
    InfoHashMismatch,
    UnknownInfoHash,
    PeerChoked,
    PieceHashMismatch { piece_index: u32 },
    UnexpectedMessage,
    Storage(StorageError),
}

impl From<SocketError> for SessionError {
    fn from(err: SocketError) -> Self {
        SessionError::Socket(err)
    }
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        SessionError::Storage(err)
    }
}

/// One TCP connection to a peer, driving it through the lifecycle
/// `New -> Connecting -> Handshaking -> Ready -> Downloading/Serving ->
/// Closed`. Each connection has at most one outstanding block request
/// at a time.
pub struct PeerSession {
    socket: PeerSocket,
    peer: BtPeer,
    state: PeerConnState,
    info_hash: [u8; 20],
    total_pieces: u32,
    peer_bitfield: PieceBitfield,
    logger: LoggerSender,
}

impl PeerSession {
    /// Connects to `peer` as the initiator: send handshake first, then
    /// receive theirs, then exchange bitfields.
    pub fn connect_outgoing(
        peer: BtPeer,
        info_hash: [u8; 20],
        our_peer_id: [u8; 20],
        our_bitfield: &PieceBitfield,
        timeout_secs: u64,
        logger: LoggerSender,
    ) -> Result<Self, SessionError> {
        let mut socket = PeerSocket::connect(&peer.ip, peer.port, timeout_secs)?;

        let handshake = Handshake {
            info_hash,
            peer_id: our_peer_id,
        };
        socket.send_handshake(&handshake)?;
        let their_handshake = socket.recv_handshake()?;
        if their_handshake.info_hash != info_hash {
            return Err(SessionError::InfoHashMismatch);
        }
        logger.info(&format!("Handshake successful with {}:{}", peer.ip, peer.port));

        socket.send_message(&Message::Bitfield {
            bytes: our_bitfield.to_bytes(),
        })?;

        Ok(Self {
            socket,
            peer,
            state: PeerConnState::Ready,
            info_hash,
            total_pieces: our_bitfield.len() as u32,
            peer_bitfield: PieceBitfield::new_empty(our_bitfield.len()),
            logger,
        })
    }

    /// Accepts an inbound connection: the swapped order, receive the
    /// peer's handshake first, then send ours, since for an inbound
    /// connection the roles of send/receive swap.
    pub fn accept_incoming<F>(
        stream: TcpStream,
        our_peer_id: [u8; 20],
        timeout_secs: u64,
        logger: LoggerSender,
        lookup_bitfield: F,
    ) -> Result<Self, SessionError>
    where
        F: FnOnce([u8; 20]) -> Option<PieceBitfield>,
    {
        let mut socket = PeerSocket::from_stream(stream, timeout_secs)?;
        let ip = socket.peer_ip().unwrap_or_else(|| "unknown".to_string());

        let their_handshake = socket.recv_handshake()?;
        let our_bitfield = lookup_bitfield(their_handshake.info_hash)
            .ok_or(SessionError::UnknownInfoHash)?;
        let total_pieces = our_bitfield.len() as u32;

        let handshake = Handshake {
            info_hash: their_handshake.info_hash,
            peer_id: our_peer_id,
        };
        socket.send_handshake(&handshake)?;
        logger.info(&format!("Handshake successful with incoming peer {}", ip));

        socket.send_message(&Message::Bitfield {
            bytes: our_bitfield.to_bytes(),
        })?;

        Ok(Self {
            socket,
            peer: BtPeer::new(ip, 0),
            state: PeerConnState::Ready,
            info_hash: their_handshake.info_hash,
            total_pieces,
            peer_bitfield: PieceBitfield::new_empty(total_pieces as usize),
            logger,
        })
    }

    pub fn peer(&self) -> &BtPeer {
        &self.peer
    }

    pub fn state(&self) -> PeerConnState {
        self.state
    }

    pub fn info_hash(&self) -> [u8; 20] {
        self.info_hash
    }

    pub fn has_piece(&self, index: u32) -> bool {
        self.peer_bitfield.has(index)
    }

    /// Downloads a single piece, requesting one block at a time and waiting
    /// for each reply before issuing the next request. Returns the
    /// reassembled piece bytes; the caller is responsible for persisting
    /// them and notifying the torrent log.
    pub fn download_piece(
        &mut self,
        piece_index: u32,
        piece_length: u64,
        expected_hash: &[u8],
    ) -> Result<Vec<u8>, SessionError> {
        self.state = PeerConnState::Downloading;
        self.socket.send_message(&Message::Interested)?;

        let mut choked = true;
        while choked {
            match self.socket.recv_message()? {
                Message::Unchoke => choked = false,
                Message::Choke => choked = true,
                Message::Bitfield { bytes } => {
                    self.peer_bitfield = PieceBitfield::from_bytes(&bytes, self.total_pieces as usize);
                }
                Message::Have { index } => self.peer_bitfield.set(index),
                Message::KeepAlive => {}
                _ => return Err(SessionError::UnexpectedMessage),
            }
        }

        let mut piece = Vec::with_capacity(piece_length as usize);
        let mut offset: u64 = 0;
        while offset < piece_length {
            let block_length = std::cmp::min(BLOCK_LENGTH as u64, piece_length - offset) as u32;
            self.socket.send_message(&Message::Request {
                index: piece_index,
                begin: offset as u32,
                length: block_length,
            })?;

            loop {
                match self.socket.recv_message()? {
                    Message::Piece {
                        index,
                        begin,
                        block,
                    } if index == piece_index && begin as u64 == offset => {
                        piece.extend_from_slice(&block);
                        break;
                    }
                    Message::Choke => return Err(SessionError::PeerChoked),
                    Message::Have { index } => self.peer_bitfield.set(index),
                    Message::KeepAlive => {}
                    _ => return Err(SessionError::UnexpectedMessage),
                }
            }
            offset += block_length as u64;
        }

        let actual_hash = sha1_hex(&piece);
        if actual_hash != bytes_to_hex(expected_hash) {
            self.state = PeerConnState::Closed;
            return Err(SessionError::PieceHashMismatch { piece_index });
        }

        self.logger
            .info(&format!("Piece {} downloaded from {}", piece_index, self.peer.ip));
        self.state = PeerConnState::Ready;
        Ok(piece)
    }

    /// Serves requests from an interested peer until the connection closes.
    /// There is no choke rotation: every interested peer is unchoked
    /// immediately and stays unchoked.
    pub fn serve_forever(&mut self, files: &FileSet, piece_length: u64) -> Result<(), SessionError> {
        loop {
            match self.socket.recv_message()? {
                Message::Interested => {
                    self.socket.send_message(&Message::Unchoke)?;
                    self.state = PeerConnState::Serving;
                }
                Message::NotInterested => {
                    self.state = PeerConnState::Ready;
                }
                Message::Request {
                    index,
                    begin,
                    length,
                } => {
                    let piece_offset = begin as u64;
                    if piece_offset + length as u64 > piece_length {
                        continue;
                    }
                    let block = files.read_block(index, begin, length)?;
                    self.socket.send_message(&Message::Piece {
                        index,
                        begin,
                        block,
                    })?;
                }
                Message::Cancel { .. } => {}
                Message::KeepAlive => {}
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_empty_peer_bitfield() {
        let bitfield = PieceBitfield::new_empty(0);
        assert!(bitfield.is_empty());
    }
}
