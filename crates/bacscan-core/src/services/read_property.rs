use crate::apdu::{ComplexAckHeader, ConfirmedRequestHeader};
use crate::encoding::{
    primitives::{decode_unsigned, encode_ctx_object_id, encode_ctx_unsigned},
    reader::Reader,
    tag::Tag,
    writer::Writer,
};
use crate::services::value_codec::{decode_value_from_tag, encode_value};
use crate::types::{DataValue, ObjectId, PropertyId};
use crate::{DecodeError, EncodeError};

pub const SERVICE_READ_PROPERTY: u8 = 0x0C;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPropertyRequest {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub invoke_id: u8,
}

impl ReadPropertyRequest {
    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        ConfirmedRequestHeader::unsegmented(self.invoke_id, SERVICE_READ_PROPERTY).encode(w)?;
        encode_ctx_object_id(w, 0, self.object_id)?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(idx) = self.array_index {
            encode_ctx_unsigned(w, 2, idx)?;
        }
        Ok(())
    }

    /// Decodes the service parameters that follow a confirmed request header.
    pub fn decode_after_header(r: &mut Reader<'_>, invoke_id: u8) -> Result<Self, DecodeError> {
        let (object_id, property_id, array_index, _) = decode_reference(r)?;
        Ok(Self {
            object_id,
            property_id,
            array_index,
            invoke_id,
        })
    }
}

/// Object, property and optional index (context tags 0, 1, 2), returning the
/// tag that follows them, if any.
pub(crate) fn decode_reference(
    r: &mut Reader<'_>,
) -> Result<(ObjectId, PropertyId, Option<u32>, Option<Tag>), DecodeError> {
    let object_id = match Tag::decode(r)? {
        Tag::Context { number: 0, len: 4 } => ObjectId::from_raw(r.read_be_u32()?),
        _ => return Err(DecodeError::InvalidTag),
    };
    let property_id = match Tag::decode(r)? {
        Tag::Context { number: 1, len } => PropertyId::from_u32(decode_unsigned(r, len as usize)?),
        _ => return Err(DecodeError::InvalidTag),
    };
    if r.is_empty() {
        return Ok((object_id, property_id, None, None));
    }
    match Tag::decode(r)? {
        Tag::Context { number: 2, len } => {
            let index = decode_unsigned(r, len as usize)?;
            let next = if r.is_empty() { None } else { Some(Tag::decode(r)?) };
            Ok((object_id, property_id, Some(index), next))
        }
        other => Ok((object_id, property_id, None, Some(other))),
    }
}

/// Property value list enclosed in opening/closing tag 3. A single element
/// stays scalar; zero or several elements become an `Array`.
pub(crate) fn decode_property_value(r: &mut Reader<'_>, opening: Option<Tag>) -> Result<DataValue, DecodeError> {
    if opening != Some(Tag::Opening { number: 3 }) {
        return Err(DecodeError::InvalidTag);
    }
    let mut values = Vec::new();
    loop {
        let tag = Tag::decode(r)?;
        if tag.closes(3) {
            break;
        }
        values.push(decode_value_from_tag(r, tag)?);
    }
    Ok(match values.len() {
        1 => values.remove(0),
        _ => DataValue::Array(values),
    })
}

pub(crate) fn encode_property_value(w: &mut Writer, value: &DataValue) -> Result<(), EncodeError> {
    Tag::Opening { number: 3 }.encode(w)?;
    encode_value(w, value)?;
    Tag::Closing { number: 3 }.encode(w)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadPropertyAck {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
    pub value: DataValue,
}

impl ReadPropertyAck {
    /// Encodes the complete complex-ack APDU answering `invoke_id`.
    pub fn encode(&self, w: &mut Writer, invoke_id: u8) -> Result<(), EncodeError> {
        ComplexAckHeader {
            invoke_id,
            segment: None,
            service_choice: SERVICE_READ_PROPERTY,
        }
        .encode(w)?;
        encode_ctx_object_id(w, 0, self.object_id)?;
        encode_ctx_unsigned(w, 1, self.property_id.to_u32())?;
        if let Some(idx) = self.array_index {
            encode_ctx_unsigned(w, 2, idx)?;
        }
        encode_property_value(w, &self.value)
    }

    pub fn decode_after_header(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let (object_id, property_id, array_index, next) = decode_reference(r)?;
        let value = decode_property_value(r, next)?;
        Ok(Self {
            object_id,
            property_id,
            array_index,
            value,
        })
    }
}
