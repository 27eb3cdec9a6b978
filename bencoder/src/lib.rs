pub mod bencode;

pub use bencode::{Bencode, BencodeError, ToBencode};
