/// A single peer-wire message, decoded into a tagged union.
///
/// `KeepAlive` has no id byte on the wire (a `len == 0` frame); every other
/// variant corresponds to one of the ten message ids in the protocol.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Message {
    KeepAlive,
    Choke,
    Unchoke,
    Interested,
    NotInterested,
    Have { index: u32 },
    Bitfield { bytes: Vec<u8> },
    Request { index: u32, begin: u32, length: u32 },
    Piece { index: u32, begin: u32, block: Vec<u8> },
    Cancel { index: u32, begin: u32, length: u32 },
    Port { port: u16 },
}

#[derive(Debug, PartialEq, Eq)]
pub enum MessageError {
    UnknownId(u8),
    TruncatedPayload,
}

impl Message {
    pub fn id(&self) -> Option<u8> {
        match self {
            Message::KeepAlive => None,
            Message::Choke => Some(0),
            Message::Unchoke => Some(1),
            Message::Interested => Some(2),
            Message::NotInterested => Some(3),
            Message::Have { .. } => Some(4),
            Message::Bitfield { .. } => Some(5),
            Message::Request { .. } => Some(6),
            Message::Piece { .. } => Some(7),
            Message::Cancel { .. } => Some(8),
            Message::Port { .. } => Some(9),
        }
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            Message::Have { index } => index.to_be_bytes().to_vec(),
            Message::Bitfield { bytes } => bytes.clone(),
            Message::Request { index, begin, length }
            | Message::Cancel { index, begin, length } => {
                let mut payload = Vec::with_capacity(12);
                payload.extend(index.to_be_bytes());
                payload.extend(begin.to_be_bytes());
                payload.extend(length.to_be_bytes());
                payload
            }
            Message::Piece { index, begin, block } => {
                let mut payload = Vec::with_capacity(8 + block.len());
                payload.extend(index.to_be_bytes());
                payload.extend(begin.to_be_bytes());
                payload.extend(block);
                payload
            }
            Message::Port { port } => port.to_be_bytes().to_vec(),
            _ => Vec::new(),
        }
    }

    /// Encodes this message as `<len:u32-be><id:u8><payload>`, `len` excluding
    /// itself. `KeepAlive` encodes as the empty-payload, id-less `len == 0` frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        let id = self.id();
        let payload = self.payload();

        let len: u32 = match id {
            Some(_) => 1 + payload.len() as u32,
            None => 0,
        };

        let mut bytes = Vec::with_capacity(4 + len as usize);
        bytes.extend(len.to_be_bytes());
        if let Some(id) = id {
            bytes.push(id);
            bytes.extend(payload);
        }
        bytes
    }

    /// Decodes a message already split into its id byte and payload (the
    /// length prefix is consumed by the peer socket layer, not here).
    /// Pass `id = None` for a keep-alive frame.
    pub fn from_parts(id: Option<u8>, payload: &[u8]) -> Result<Self, MessageError> {
        let id = match id {
            None => return Ok(Message::KeepAlive),
            Some(id) => id,
        };

        match id {
            0 => Ok(Message::Choke),
            1 => Ok(Message::Unchoke),
            2 => Ok(Message::Interested),
            3 => Ok(Message::NotInterested),
            4 => Ok(Message::Have {
                index: read_u32(payload, 0)?,
            }),
            5 => Ok(Message::Bitfield {
                bytes: payload.to_vec(),
            }),
            6 => Ok(Message::Request {
                index: read_u32(payload, 0)?,
                begin: read_u32(payload, 4)?,
                length: read_u32(payload, 8)?,
            }),
            7 => {
                if payload.len() < 8 {
                    return Err(MessageError::TruncatedPayload);
                }
                Ok(Message::Piece {
                    index: read_u32(payload, 0)?,
                    begin: read_u32(payload, 4)?,
                    block: payload[8..].to_vec(),
                })
            }
            8 => Ok(Message::Cancel {
                index: read_u32(payload, 0)?,
                begin: read_u32(payload, 4)?,
                length: read_u32(payload, 8)?,
            }),
            9 => {
                if payload.len() < 2 {
                    return Err(MessageError::TruncatedPayload);
                }
                let mut buf = [0u8; 2];
                buf.copy_from_slice(&payload[0..2]);
                Ok(Message::Port {
                    port: u16::from_be_bytes(buf),
                })
            }
            other => Err(MessageError::UnknownId(other)),
        }
    }
}

fn read_u32(payload: &[u8], offset: usize) -> Result<u32, MessageError> {
    if payload.len() < offset + 4 {
        return Err(MessageError::TruncatedPayload);
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&payload[offset..offset + 4]);
    Ok(u32::from_be_bytes(buf))
}
