use crate::encoding::{
    reader::Reader,
    tag::{ApplicationTag, Tag},
    writer::Writer,
};
use crate::types::ObjectId;
use crate::{DecodeError, EncodeError};

/// Minimal big-endian octets of an unsigned value (at least one).
pub fn unsigned_octets(value: u32) -> ([u8; 4], usize) {
    let bytes = value.to_be_bytes();
    let len = 4 - (value.leading_zeros() as usize / 8).min(3);
    (bytes, len)
}

/// Minimal two's-complement octets of a signed value (at least one).
pub fn signed_octets(value: i32) -> ([u8; 4], usize) {
    let len = match value {
        -0x80..=0x7F => 1,
        -0x8000..=0x7FFF => 2,
        -0x80_0000..=0x7F_FFFF => 3,
        _ => 4,
    };
    (value.to_be_bytes(), len)
}

pub fn decode_unsigned(r: &mut Reader<'_>, len: usize) -> Result<u32, DecodeError> {
    if !(1..=4).contains(&len) {
        return Err(DecodeError::InvalidLength);
    }
    Ok(r
        .read_slice(len)?
        .iter()
        .fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
}

pub fn decode_signed(r: &mut Reader<'_>, len: usize) -> Result<i32, DecodeError> {
    if !(1..=4).contains(&len) {
        return Err(DecodeError::InvalidLength);
    }
    let raw = r.read_slice(len)?;
    let fill = if raw[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut out = [fill; 4];
    out[4 - len..].copy_from_slice(raw);
    Ok(i32::from_be_bytes(out))
}

pub fn encode_app_unsigned(w: &mut Writer, value: u32) -> Result<(), EncodeError> {
    write_unsigned_like(w, Some(ApplicationTag::Unsigned), 0, value)
}

pub fn encode_app_enumerated(w: &mut Writer, value: u32) -> Result<(), EncodeError> {
    write_unsigned_like(w, Some(ApplicationTag::Enumerated), 0, value)
}

pub fn encode_app_object_id(w: &mut Writer, object_id: ObjectId) -> Result<(), EncodeError> {
    Tag::Application {
        tag: ApplicationTag::ObjectId,
        len: 4,
    }
    .encode(w)?;
    w.write_be_u32(object_id.raw())
}

pub fn encode_ctx_unsigned(w: &mut Writer, number: u8, value: u32) -> Result<(), EncodeError> {
    write_unsigned_like(w, None, number, value)
}

pub fn encode_ctx_object_id(
    w: &mut Writer,
    number: u8,
    object_id: ObjectId,
) -> Result<(), EncodeError> {
    Tag::Context { number, len: 4 }.encode(w)?;
    w.write_be_u32(object_id.raw())
}

fn write_unsigned_like(
    w: &mut Writer,
    application: Option<ApplicationTag>,
    number: u8,
    value: u32,
) -> Result<(), EncodeError> {
    let (bytes, len) = unsigned_octets(value);
    match application {
        Some(tag) => Tag::Application {
            tag,
            len: len as u32,
        },
        None => Tag::Context {
            number,
            len: len as u32,
        },
    }
    .encode(w)?;
    w.write_all(&bytes[4 - len..])
}

pub fn decode_app_unsigned(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: ApplicationTag::Unsigned,
            len,
        } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_enumerated(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: ApplicationTag::Enumerated,
            len,
        } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_object_id(r: &mut Reader<'_>) -> Result<ObjectId, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: ApplicationTag::ObjectId,
            len: 4,
        } => Ok(ObjectId::from_raw(r.read_be_u32()?)),
        _ => Err(DecodeError::InvalidTag),
    }
}

/// Decodes a context-tagged unsigned that must carry tag `number`.
pub fn decode_ctx_unsigned(r: &mut Reader<'_>, number: u8) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Context { number: n, len } if n == number => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_ctx_object_id(r: &mut Reader<'_>, number: u8) -> Result<ObjectId, DecodeError> {
    match Tag::decode(r)? {
        Tag::Context { number: n, len: 4 } if n == number => {
            Ok(ObjectId::from_raw(r.read_be_u32()?))
        }
        _ => Err(DecodeError::InvalidTag),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_app_unsigned, decode_signed, decode_unsigned, encode_app_unsigned,
        encode_ctx_unsigned, signed_octets, unsigned_octets,
    };
    use crate::encoding::{reader::Reader, writer::Writer};
    use proptest::prelude::*;

    #[test]
    fn unsigned_uses_minimal_width() {
        assert_eq!(unsigned_octets(0).1, 1);
        assert_eq!(unsigned_octets(0xFF).1, 1);
        assert_eq!(unsigned_octets(0x100).1, 2);
        assert_eq!(unsigned_octets(0x3F_FFFF).1, 3);
        assert_eq!(unsigned_octets(u32::MAX).1, 4);
    }

    #[test]
    fn priority_is_a_one_octet_context_value() {
        let mut w = Writer::new();
        encode_ctx_unsigned(&mut w, 4, 8).unwrap();
        assert_eq!(w.as_written(), &[0x49, 0x08]);
    }

    #[test]
    fn rejects_oversized_unsigned() {
        let mut r = Reader::new(&[0; 5]);
        assert!(decode_unsigned(&mut r, 5).is_err());
    }

    proptest! {
        #[test]
        fn unsigned_survives_encoding(v in any::<u32>()) {
            let (bytes, len) = unsigned_octets(v);
            let mut r = Reader::new(&bytes[4 - len..]);
            prop_assert_eq!(decode_unsigned(&mut r, len).unwrap(), v);
        }

        #[test]
        fn signed_survives_encoding(v in any::<i32>()) {
            let (bytes, len) = signed_octets(v);
            let mut r = Reader::new(&bytes[4 - len..]);
            prop_assert_eq!(decode_signed(&mut r, len).unwrap(), v);
        }

        #[test]
        fn application_unsigned_survives_encoding(v in any::<u32>()) {
            let mut w = Writer::new();
            encode_app_unsigned(&mut w, v).unwrap();
            let mut r = Reader::new(w.as_written());
            prop_assert_eq!(decode_app_unsigned(&mut r).unwrap(), v);
            prop_assert!(r.is_empty());
        }
    }
}
