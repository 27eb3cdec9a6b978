use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::wire::{Handshake, Message};

/// The largest legitimate wire `len`: a `piece` message's 1-byte id plus its
/// 8-byte index/offset header plus one full 16 KiB block.
pub const MAX_FRAME_PAYLOAD: u32 = 16 * 1024 + 9;

#[derive(Debug)]
pub enum SocketError {
    Connect(io::Error),
    Io(io::Error),
    ConnectionClosed,
    SetTimeout(io::Error),
    FrameTooLarge(u32),
    Handshake(crate::wire::handshake::HandshakeError),
    Message(crate::wire::message::MessageError),
}

/// A length-exact, timed-out TCP transport for the peer-wire protocol.
///
/// Offers looping reads/writes over a `TcpStream` so callers never have to
/// deal with partial reads or writes themselves.
pub struct PeerSocket {
    stream: TcpStream,
}

impl PeerSocket {
    pub fn connect(ip: &str, port: u16, timeout_secs: u64) -> Result<Self, SocketError> {
        let stream = TcpStream::connect((ip, port)).map_err(SocketError::Connect)?;
        let mut socket = Self { stream };
        socket.set_timeouts(timeout_secs)?;
        Ok(socket)
    }

    pub fn from_stream(stream: TcpStream, timeout_secs: u64) -> Result<Self, SocketError> {
        let mut socket = Self { stream };
        socket.set_timeouts(timeout_secs)?;
        Ok(socket)
    }

    pub fn peer_ip(&self) -> Option<String> {
        self.stream.peer_addr().ok().map(|addr| addr.ip().to_string())
    }

    fn set_timeouts(&mut self, secs: u64) -> Result<(), SocketError> {
        let timeout = Some(Duration::from_secs(secs));
        self.stream
            .set_read_timeout(timeout)
            .map_err(SocketError::SetTimeout)?;
        self.stream
            .set_write_timeout(timeout)
            .map_err(SocketError::SetTimeout)?;
        Ok(())
    }

    /// Reads exactly `n` bytes, looping internally until they arrive or the
    /// stream closes early.
    pub fn recv_exact(&mut self, n: usize) -> Result<Vec<u8>, SocketError> {
        let mut buf = vec![0u8; n];
        let mut received = 0;
        while received < n {
            let read = self.stream.read(&mut buf[received..]).map_err(SocketError::Io)?;
            if read == 0 {
                return Err(SocketError::ConnectionClosed);
            }
            received += read;
        }
        Ok(buf)
    }

    /// Sends the entire slice, looping over partial writes.
    pub fn send_all(&mut self, data: &[u8]) -> Result<(), SocketError> {
        self.stream.write_all(data).map_err(SocketError::Io)
    }

    pub fn send_handshake(&mut self, handshake: &Handshake) -> Result<(), SocketError> {
        self.send_all(&handshake.to_bytes())
    }

    pub fn recv_handshake(&mut self) -> Result<Handshake, SocketError> {
        let buf = self.recv_exact(crate::wire::handshake::HANDSHAKE_LENGTH)?;
        Handshake::from_bytes(&buf).map_err(SocketError::Handshake)
    }

    pub fn send_message(&mut self, message: &Message) -> Result<(), SocketError> {
        self.send_all(&message.to_bytes())
    }

    /// Reads one full frame (length prefix + id + payload) and decodes it.
    pub fn recv_message(&mut self) -> Result<Message, SocketError> {
        let len_bytes = self.recv_exact(4)?;
        let len = u32::from_be_bytes(len_bytes.try_into().expect("recv_exact(4) returns 4 bytes"));

        if len == 0 {
            return Ok(Message::KeepAlive);
        }
        if len > MAX_FRAME_PAYLOAD {
            return Err(SocketError::FrameTooLarge(len));
        }

        let mut frame = self.recv_exact(len as usize)?;
        let id = frame.remove(0);
        Message::from_parts(Some(id), &frame).map_err(SocketError::Message)
    }
}
