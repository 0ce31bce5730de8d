use std::{
    collections::BTreeMap,
    io::{Read, Write},
};

use bytes::BufMut;
use prost::encoding::{decode_varint, encode_varint};

use super::{
    schema::{Dictionary, DictionaryEntry, List, Status},
    Error,
};

/// Upper bound on a single frame read from the socket.
pub const MAX_MESSAGE_SIZE: u64 = 64 * 1024 * 1024;

/// Writes a protobuf message prefixed by its varint length.
pub fn write_message<M: prost::Message>(writer: &mut impl Write, message: &M) -> Result<(), Error> {
    writer.write_all(&message.encode_length_delimited_to_vec())?;
    writer.flush()?;
    Ok(())
}

/// Reads one length-delimited protobuf message, blocking until it is complete.
pub fn read_message<M: prost::Message + Default>(reader: &mut impl Read) -> Result<M, Error> {
    let len = read_varint(reader)?;
    if len > MAX_MESSAGE_SIZE {
        return Err(Error::FrameTooLarge(len));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body)?;

    Ok(M::decode(body.as_slice())?)
}

fn read_varint(reader: &mut impl Read) -> Result<u64, Error> {
    let mut value = 0u64;

    for shift in (0..64).step_by(7) {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;

        value |= u64::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(Error::VarintOverflow)
}

/// Identifier of a remote object. Zero is the server's null reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

pub trait Encode {
    fn encode(&self, buf: &mut Vec<u8>);
}

pub trait Decode: Sized {
    fn decode(buf: &[u8]) -> Result<Self, Error>;
}

pub fn encode_to_vec<T: Encode + ?Sized>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode(&mut buf);
    buf
}

fn zigzag(v: i32) -> u64 {
    ((v << 1) ^ (v >> 31)) as u32 as u64
}

fn unzigzag(v: u64) -> i32 {
    let v = v as u32;
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

fn varint(mut buf: &[u8]) -> Result<u64, Error> {
    Ok(decode_varint(&mut buf)?)
}

fn fixed<const N: usize>(buf: &[u8]) -> Result<[u8; N], Error> {
    buf.get(..N)
        .and_then(|b| <[u8; N]>::try_from(b).ok())
        .ok_or(Error::Truncated {
            needed: N,
            actual: buf.len(),
        })
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, buf: &mut Vec<u8>) {
        (**self).encode(buf)
    }
}

impl Encode for bool {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_varint(u64::from(*self), buf);
    }
}

impl Encode for i32 {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_varint(zigzag(*self), buf);
    }
}

impl Encode for u32 {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_varint(u64::from(*self), buf);
    }
}

impl Encode for u64 {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_varint(*self, buf);
    }
}

impl Encode for f32 {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_f32_le(*self);
    }
}

impl Encode for f64 {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_f64_le(*self);
    }
}

impl Encode for str {
    fn encode(&self, buf: &mut Vec<u8>) {
        encode_varint(self.len() as u64, buf);
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Encode for String {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_str().encode(buf);
    }
}

impl Encode for ObjectId {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.0.encode(buf);
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, buf: &mut Vec<u8>) {
        let list = List {
            items: self.iter().map(encode_to_vec).collect(),
        };
        buf.extend(prost::Message::encode_to_vec(&list));
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_slice().encode(buf);
    }
}

impl<T: Encode> Encode for BTreeMap<String, T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        let dict = Dictionary {
            entries: self
                .iter()
                .map(|(k, v)| DictionaryEntry {
                    key: encode_to_vec(k),
                    value: encode_to_vec(v),
                })
                .collect(),
        };
        buf.extend(prost::Message::encode_to_vec(&dict));
    }
}

impl Decode for () {
    fn decode(_: &[u8]) -> Result<Self, Error> {
        Ok(())
    }
}

impl Decode for bool {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        Ok(varint(buf)? != 0)
    }
}

impl Decode for i32 {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        Ok(unzigzag(varint(buf)?))
    }
}

impl Decode for u32 {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        Ok(varint(buf)? as u32)
    }
}

impl Decode for u64 {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        varint(buf)
    }
}

impl Decode for f32 {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        fixed::<4>(buf).map(f32::from_le_bytes)
    }
}

impl Decode for f64 {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        fixed::<8>(buf).map(f64::from_le_bytes)
    }
}

impl Decode for String {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        let mut cursor = buf;
        let len = decode_varint(&mut cursor)? as usize;

        let bytes = cursor.get(..len).ok_or(Error::Truncated {
            needed: len,
            actual: cursor.len(),
        })?;

        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

impl Decode for ObjectId {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        Ok(ObjectId(varint(buf)?))
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        <List as prost::Message>::decode(buf)?
            .items
            .iter()
            .map(|item| T::decode(item))
            .collect()
    }
}

impl<T: Decode> Decode for BTreeMap<String, T> {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        <Dictionary as prost::Message>::decode(buf)?
            .entries
            .iter()
            .map(|entry| Ok((String::decode(&entry.key)?, T::decode(&entry.value)?)))
            .collect()
    }
}

impl Decode for Status {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        Ok(<Status as prost::Message>::decode(buf)?)
    }
}
