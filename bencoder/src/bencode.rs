use std::collections::BTreeMap;

/// A decoded bencode value.
#[derive(PartialEq, Debug, Clone)]
pub enum Bencode {
    BNumber(i64),
    BString(Vec<u8>),
    BList(Vec<Bencode>),
    BDict(BTreeMap<Vec<u8>, Bencode>),
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum BencodeError {
    InvalidBencode,
    InvalidBencodeType,
    InvalidBencodeNumber,
    InvalidBencodeString,
    InvalidBencodeList,
    InvalidBencodeDict,
    UnexpectedEnd,
}

impl Bencode {
    /// Parses a bencoded vec of bytes into a Bencode enum.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bencoder::bencode::Bencode;
    ///
    /// let data = b"5:hello";
    /// let bencode = Bencode::decode(data).unwrap();
    /// assert_eq!(bencode, Bencode::BString(b"hello".to_vec()));
    ///
    /// let data = b"i123e";
    /// let bencode = Bencode::decode(data).unwrap();
    /// assert_eq!(bencode, Bencode::BNumber(123));
    /// ```
    pub fn decode(data: &[u8]) -> Result<Bencode, BencodeError> {
        let (bencode, _) = Bencode::do_decode(data)?;
        Ok(bencode)
    }

    fn byte_at(data: &[u8], i: usize) -> Result<u8, BencodeError> {
        data.get(i).copied().ok_or(BencodeError::UnexpectedEnd)
    }

    fn do_decode(data: &[u8]) -> Result<(Bencode, usize), BencodeError> {
        match Self::byte_at(data, 0)? {
            b'i' => Bencode::decode_number(data),
            b'l' => Bencode::decode_list(data),
            b'd' => Bencode::decode_dict(data),
            b'0'..=b'9' => Bencode::decode_string(data),
            _ => Err(BencodeError::InvalidBencode),
        }
    }

    fn decode_string(data: &[u8]) -> Result<(Bencode, usize), BencodeError> {
        let mut i = 0;
        while Self::byte_at(data, i)? != b':' {
            i += 1;
        }
        let length = &data[0..i];
        let length = String::from_utf8(length.to_vec())
            .map_err(|_| BencodeError::InvalidBencodeString)?
            .parse::<i64>()
            .map_err(|_| BencodeError::InvalidBencodeString)?;
        if length < 0 {
            return Err(BencodeError::InvalidBencodeString);
        }

        let start = i + 1;
        let end = start + length as usize;
        if end > data.len() {
            return Err(BencodeError::UnexpectedEnd);
        }

        Ok((Bencode::BString(data[start..end].to_vec()), end))
    }

    fn decode_number(data: &[u8]) -> Result<(Bencode, usize), BencodeError> {
        let mut i = 1;
        while Self::byte_at(data, i)? != b'e' {
            i += 1;
        }
        let number = String::from_utf8(data[1..i].to_vec())
            .map_err(|_| BencodeError::InvalidBencodeNumber)?
            .parse::<i64>()
            .map_err(|_| BencodeError::InvalidBencodeNumber)?;
        Ok((Bencode::BNumber(number), i + 1))
    }

    fn decode_list(data: &[u8]) -> Result<(Bencode, usize), BencodeError> {
        let mut i = 1;
        let mut list = Vec::new();
        while Self::byte_at(data, i)? != b'e' {
            let (value, size) = Bencode::do_decode(&data[i..])?;
            list.push(value);
            i += size;
        }
        Ok((Bencode::BList(list), i + 1))
    }

    fn decode_dict(data: &[u8]) -> Result<(Bencode, usize), BencodeError> {
        let mut i = 1;
        let mut dict = BTreeMap::new();
        while Self::byte_at(data, i)? != b'e' {
            let (key, size) = Bencode::do_decode(&data[i..])?;
            i += size;
            let (value, size) = Bencode::do_decode(&data[i..])?;
            i += size;
            match key {
                Bencode::BString(key) => dict.insert(key, value),
                _ => return Err(BencodeError::InvalidBencodeDict),
            };
        }
        Ok((Bencode::BDict(dict), i + 1))
    }

    /// Canonically re-encodes a Bencode value (dict keys sorted, as `BTreeMap`
    /// already guarantees by construction).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Bencode::BNumber(n) => format!("i{}e", n).into_bytes(),
            Bencode::BString(s) => {
                let mut out = format!("{}:", s.len()).into_bytes();
                out.extend_from_slice(s);
                out
            }
            Bencode::BList(list) => {
                let mut out = vec![b'l'];
                for item in list {
                    out.extend(item.encode());
                }
                out.push(b'e');
                out
            }
            Bencode::BDict(dict) => {
                let mut out = vec![b'd'];
                for (key, value) in dict.iter() {
                    out.extend(Bencode::BString(key.clone()).encode());
                    out.extend(value.encode());
                }
                out.push(b'e');
                out
            }
        }
    }
}

/// Implemented by types that have a canonical bencode representation.
pub trait ToBencode {
    fn to_bencode(&self) -> Bencode;
}

impl ToBencode for String {
    fn to_bencode(&self) -> Bencode {
        Bencode::BString(self.clone().into_bytes())
    }
}

impl ToBencode for Vec<u8> {
    fn to_bencode(&self) -> Bencode {
        Bencode::BString(self.clone())
    }
}

impl ToBencode for i64 {
    fn to_bencode(&self) -> Bencode {
        Bencode::BNumber(*self)
    }
}
