use crate::encoding::{
    primitives::{decode_signed, decode_unsigned, signed_octets, unsigned_octets},
    reader::Reader,
    tag::{ApplicationTag, Tag},
    writer::Writer,
};
use crate::types::{BitString, DataValue, Date, ObjectId, Time};
use crate::{DecodeError, EncodeError};

fn u32_len(len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::ValueOutOfRange)
}

fn app(w: &mut Writer, tag: ApplicationTag, len: u32) -> Result<(), EncodeError> {
    Tag::Application { tag, len }.encode(w)
}

/// Encodes an application-tagged value. Array elements are written back to
/// back, the way list and array properties appear on the wire.
pub fn encode_value(w: &mut Writer, value: &DataValue) -> Result<(), EncodeError> {
    match value {
        DataValue::Null => app(w, ApplicationTag::Null, 0),
        DataValue::Boolean(v) => app(w, ApplicationTag::Boolean, u32::from(*v)),
        DataValue::Unsigned(v) => encode_unsigned_like(w, ApplicationTag::Unsigned, *v),
        DataValue::Enumerated(v) => encode_unsigned_like(w, ApplicationTag::Enumerated, *v),
        DataValue::Signed(v) => {
            let (bytes, len) = signed_octets(*v);
            app(w, ApplicationTag::Signed, len as u32)?;
            w.write_all(&bytes[4 - len..])
        }
        DataValue::Real(v) => {
            app(w, ApplicationTag::Real, 4)?;
            w.write_all(&v.to_be_bytes())
        }
        DataValue::Double(v) => {
            app(w, ApplicationTag::Double, 8)?;
            w.write_all(&v.to_be_bytes())
        }
        DataValue::OctetString(v) => {
            app(w, ApplicationTag::OctetString, u32_len(v.len())?)?;
            w.write_all(v)
        }
        DataValue::CharacterString(v) => {
            let bytes = v.as_bytes();
            app(w, ApplicationTag::CharacterString, u32_len(bytes.len() + 1)?)?;
            // Character set 0: UTF-8.
            w.write_u8(0)?;
            w.write_all(bytes)
        }
        DataValue::BitString(v) => {
            if v.unused_bits > 7 {
                return Err(EncodeError::ValueOutOfRange);
            }
            app(w, ApplicationTag::BitString, u32_len(v.data.len() + 1)?)?;
            w.write_u8(v.unused_bits)?;
            w.write_all(&v.data)
        }
        DataValue::Date(v) => {
            app(w, ApplicationTag::Date, 4)?;
            w.write_all(&[v.year_since_1900, v.month, v.day, v.weekday])
        }
        DataValue::Time(v) => {
            app(w, ApplicationTag::Time, 4)?;
            w.write_all(&[v.hour, v.minute, v.second, v.hundredths])
        }
        DataValue::ObjectId(v) => {
            app(w, ApplicationTag::ObjectId, 4)?;
            w.write_be_u32(v.raw())
        }
        DataValue::Array(items) => items.iter().try_for_each(|item| encode_value(w, item)),
    }
}

fn encode_unsigned_like(w: &mut Writer, tag: ApplicationTag, value: u32) -> Result<(), EncodeError> {
    let (bytes, len) = unsigned_octets(value);
    app(w, tag, len as u32)?;
    w.write_all(&bytes[4 - len..])
}

pub fn decode_value(r: &mut Reader<'_>) -> Result<DataValue, DecodeError> {
    let tag = Tag::decode(r)?;
    decode_value_from_tag(r, tag)
}

/// Decodes the value whose tag header has already been read. A constructed
/// value (opening tag) decodes into an `Array` of its children.
pub fn decode_value_from_tag(r: &mut Reader<'_>, tag: Tag) -> Result<DataValue, DecodeError> {
    let (tag, len) = match tag {
        Tag::Application { tag, len } => (tag, len),
        Tag::Opening { number } => {
            let mut children = Vec::new();
            loop {
                let child = Tag::decode(r)?;
                if child.closes(number) {
                    return Ok(DataValue::Array(children));
                }
                children.push(decode_value_from_tag(r, child)?);
            }
        }
        Tag::Context { .. } | Tag::Closing { .. } => return Err(DecodeError::Unsupported),
    };

    match tag {
        ApplicationTag::Null => Ok(DataValue::Null),
        ApplicationTag::Boolean => Ok(DataValue::Boolean(len != 0)),
        ApplicationTag::Unsigned => Ok(DataValue::Unsigned(decode_unsigned(r, len as usize)?)),
        ApplicationTag::Enumerated => Ok(DataValue::Enumerated(decode_unsigned(r, len as usize)?)),
        ApplicationTag::Signed => Ok(DataValue::Signed(decode_signed(r, len as usize)?)),
        ApplicationTag::Real if len == 4 => {
            Ok(DataValue::Real(f32::from_be_bytes(r.read_array::<4>()?)))
        }
        ApplicationTag::Double if len == 8 => {
            Ok(DataValue::Double(f64::from_be_bytes(r.read_array::<8>()?)))
        }
        ApplicationTag::OctetString => {
            Ok(DataValue::OctetString(r.read_slice(len as usize)?.to_vec()))
        }
        ApplicationTag::CharacterString => {
            let raw = r.read_slice(len as usize)?;
            let (charset, text) = raw.split_first().ok_or(DecodeError::InvalidLength)?;
            let text = match charset {
                0 => core::str::from_utf8(text)
                    .map_err(|_| DecodeError::InvalidValue)?
                    .to_string(),
                // ISO 8859-1 maps octets straight onto code points.
                5 => text.iter().map(|b| char::from(*b)).collect(),
                _ => return Err(DecodeError::Unsupported),
            };
            Ok(DataValue::CharacterString(text))
        }
        ApplicationTag::BitString => {
            let raw = r.read_slice(len as usize)?;
            let (unused_bits, data) = raw.split_first().ok_or(DecodeError::InvalidLength)?;
            if *unused_bits > 7 {
                return Err(DecodeError::InvalidValue);
            }
            Ok(DataValue::BitString(BitString::new(*unused_bits, data)))
        }
        ApplicationTag::Date if len == 4 => {
            let [year_since_1900, month, day, weekday] = r.read_array::<4>()?;
            Ok(DataValue::Date(Date {
                year_since_1900,
                month,
                day,
                weekday,
            }))
        }
        ApplicationTag::Time if len == 4 => {
            let [hour, minute, second, hundredths] = r.read_array::<4>()?;
            Ok(DataValue::Time(Time {
                hour,
                minute,
                second,
                hundredths,
            }))
        }
        ApplicationTag::ObjectId if len == 4 => Ok(DataValue::ObjectId(ObjectId::from_raw(r.read_be_u32()?))),
        ApplicationTag::Real
        | ApplicationTag::Double
        | ApplicationTag::Date
        | ApplicationTag::Time
        | ApplicationTag::ObjectId => Err(DecodeError::InvalidLength),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_value, encode_value};
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::{BitString, DataValue, Date, ObjectId, ObjectType, Time};
    use crate::DecodeError;

    fn encoded(value: &DataValue) -> Vec<u8> {
        let mut w = Writer::new();
        encode_value(&mut w, value).unwrap();
        w.into_bytes()
    }

    #[test]
    fn well_known_encodings() {
        assert_eq!(encoded(&DataValue::Null), vec![0x00]);
        assert_eq!(encoded(&DataValue::Boolean(true)), vec![0x11]);
        assert_eq!(encoded(&DataValue::Real(72.5)), vec![0x44, 0x42, 0x91, 0x00, 0x00]);
        assert_eq!(encoded(&DataValue::Signed(-2)), vec![0x31, 0xFE]);
        assert_eq!(
            encoded(&DataValue::from("AHU")),
            vec![0x74, 0x00, b'A', b'H', b'U']
        );
    }

    #[test]
    fn decodes_every_scalar_kind() {
        let values = [
            DataValue::Null,
            DataValue::Boolean(false),
            DataValue::Unsigned(70_000),
            DataValue::Signed(-300),
            DataValue::Real(21.5),
            DataValue::Double(-0.125),
            DataValue::OctetString(vec![0xDE, 0xAD]),
            DataValue::from("zone temp"),
            DataValue::BitString(BitString::from_bits(&[true, false, false, true])),
            DataValue::Enumerated(62),
            DataValue::Date(Date {
                year_since_1900: 126,
                month: 10,
                day: 19,
                weekday: 1,
            }),
            DataValue::Time(Time {
                hour: 23,
                minute: 59,
                second: 58,
                hundredths: 0,
            }),
            DataValue::ObjectId(ObjectId::new(ObjectType::AnalogInput, 4)),
        ];
        for value in values {
            let bytes = encoded(&value);
            let mut r = Reader::new(&bytes);
            assert_eq!(decode_value(&mut r).unwrap(), value);
            assert!(r.is_empty());
        }
    }

    #[test]
    fn constructed_value_becomes_array() {
        let frame = [0x0E, 0x21, 0x01, 0x00, 0x0F];
        let got = decode_value(&mut Reader::new(&frame)).unwrap();
        assert_eq!(
            got,
            DataValue::Array(vec![DataValue::Unsigned(1), DataValue::Null])
        );
    }

    #[test]
    fn latin1_strings_decode() {
        let frame = [0x73, 0x05, b'C', 0xB0];
        let got = decode_value(&mut Reader::new(&frame)).unwrap();
        assert_eq!(got, DataValue::from("C°"));
    }

    #[test]
    fn rejects_bad_lengths_and_charsets() {
        assert_eq!(
            decode_value(&mut Reader::new(&[0x43, 0, 0, 0])),
            Err(DecodeError::InvalidLength)
        );
        assert_eq!(
            decode_value(&mut Reader::new(&[0x72, 0x04, 0x41])),
            Err(DecodeError::Unsupported)
        );
        assert_eq!(
            decode_value(&mut Reader::new(&[0x19, 0x01])),
            Err(DecodeError::Unsupported)
        );
    }
}
