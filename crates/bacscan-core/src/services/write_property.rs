use crate::apdu::ConfirmedRequestHeader;
use crate::encoding::{
    primitives::{decode_unsigned, encode_ctx_object_id, encode_ctx_unsigned},
    reader::Reader,
    tag::Tag,
    writer::Writer,
};
use crate::services::read_property::{decode_property_value, decode_reference, encode_property_value};
use crate::types::{DataValue, ObjectId, PropertyId};
use crate::{DecodeError, EncodeError};

pub const SERVICE_WRITE_PROPERTY: u8 = 0x0F;

#[derive(Debug, Clone, PartialEq)]
pub struct WritePropertyRequest {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub value: DataValue,
    /// Command priority 1–16; omitted means the server's default (16).
    pub priority: Option<u8>,
    pub invoke_id: u8,
}

impl WritePropertyRequest {
    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        if let Some(priority) = self.priority {
            if !(1..=16).contains(&priority) {
                return Err(EncodeError::ValueOutOfRange);
            }
        }
        ConfirmedRequestHeader::unsegmented(self.invoke_id, SERVICE_WRITE_PROPERTY).encode(w)?;
        encode_ctx_object_id(w, 0, self.object_id)?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(idx) = self.array_index {
            encode_ctx_unsigned(w, 2, idx)?;
        }
        encode_property_value(w, &self.value)?;
        if let Some(priority) = self.priority {
            encode_ctx_unsigned(w, 4, u32::from(priority))?;
        }
        Ok(())
    }

    pub fn decode_after_header(r: &mut Reader<'_>, invoke_id: u8) -> Result<Self, DecodeError> {
        let (object_id, property_id, array_index, next) = decode_reference(r)?;
        let value = decode_property_value(r, next)?;
        let priority = if r.is_empty() {
            None
        } else {
            match Tag::decode(r)? {
                Tag::Context { number: 4, len } => {
                    let raw = decode_unsigned(r, len as usize)?;
                    Some(u8::try_from(raw).map_err(|_| DecodeError::InvalidValue)?)
                }
                _ => return Err(DecodeError::InvalidTag),
            }
        };
        Ok(Self {
            object_id,
            property_id,
            array_index,
            value,
            priority,
            invoke_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::WritePropertyRequest;
    use crate::apdu::ConfirmedRequestHeader;
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::{DataValue, ObjectId, ObjectType, PropertyId};
    use crate::EncodeError;

    fn request(value: DataValue, priority: Option<u8>) -> WritePropertyRequest {
        WritePropertyRequest {
            object_id: ObjectId::new(ObjectType::AnalogValue, 1),
            property_id: PropertyId::PresentValue,
            array_index: None,
            value,
            priority,
            invoke_id: 2,
        }
    }

    #[test]
    fn priority_follows_the_value() {
        let mut w = Writer::new();
        request(DataValue::Real(55.0), Some(8)).encode(&mut w).unwrap();
        assert_eq!(
            w.as_written(),
            &[
                0x00, 0x05, 0x02, 0x0F, 0x0C, 0x00, 0x80, 0x00, 0x01, 0x19, 0x55, 0x3E, 0x44, 0x42,
                0x5C, 0x00, 0x00, 0x3F, 0x49, 0x08
            ]
        );
    }

    #[test]
    fn relinquish_decodes_as_null_at_priority() {
        let req = request(DataValue::Null, Some(8));
        let mut w = Writer::new();
        req.encode(&mut w).unwrap();
        let mut r = Reader::new(w.as_written());
        let hdr = ConfirmedRequestHeader::decode(&mut r).unwrap();
        assert_eq!(WritePropertyRequest::decode_after_header(&mut r, hdr.invoke_id).unwrap(), req);
    }

    #[test]
    fn out_of_range_priority_is_not_encoded() {
        let mut w = Writer::new();
        assert_eq!(
            request(DataValue::Real(1.0), Some(17)).encode(&mut w),
            Err(EncodeError::ValueOutOfRange)
        );
        assert!(w.is_empty());
    }
}
