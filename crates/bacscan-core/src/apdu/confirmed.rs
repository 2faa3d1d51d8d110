use crate::apdu::ApduType;
use crate::encoding::{
    primitives::{decode_unsigned, encode_app_enumerated},
    reader::Reader,
    tag::{ApplicationTag, Tag},
    writer::Writer,
};
use crate::types::MaxApdu;
use crate::{DecodeError, EncodeError};

const SEGMENTED: u8 = 0b0000_1000;
const MORE_FOLLOWS: u8 = 0b0000_0100;
const SEGMENTED_RESPONSE_ACCEPTED: u8 = 0b0000_0010;
const SERVER: u8 = 0b0000_0001;

/// Sequence/window octets present on segmented requests and acks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo {
    pub sequence_number: u8,
    pub window_size: u8,
    pub more_follows: bool,
}

fn expect_type(r: &mut Reader<'_>, kind: ApduType) -> Result<u8, DecodeError> {
    let b0 = r.read_u8()?;
    if b0 >> 4 != kind as u8 {
        return Err(DecodeError::InvalidValue);
    }
    Ok(b0)
}

fn read_segment(r: &mut Reader<'_>, b0: u8) -> Result<Option<SegmentInfo>, DecodeError> {
    if b0 & SEGMENTED == 0 {
        return Ok(None);
    }
    Ok(Some(SegmentInfo {
        sequence_number: r.read_u8()?,
        window_size: r.read_u8()?,
        more_follows: b0 & MORE_FOLLOWS != 0,
    }))
}

fn segment_bits(segment: Option<SegmentInfo>) -> u8 {
    match segment {
        Some(info) if info.more_follows => SEGMENTED | MORE_FOLLOWS,
        Some(_) => SEGMENTED,
        None => 0,
    }
}

fn write_segment(w: &mut Writer, segment: Option<SegmentInfo>) -> Result<(), EncodeError> {
    if let Some(info) = segment {
        w.write_u8(info.sequence_number)?;
        w.write_u8(info.window_size)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedRequestHeader {
    pub segmented_response_accepted: bool,
    /// Encoded max-segments field (0 = unspecified).
    pub max_segments: u8,
    pub max_apdu: MaxApdu,
    pub invoke_id: u8,
    pub segment: Option<SegmentInfo>,
    pub service_choice: u8,
}

impl ConfirmedRequestHeader {
    /// Unsegmented request that does not accept a segmented reply.
    pub const fn unsegmented(invoke_id: u8, service_choice: u8) -> Self {
        Self {
            segmented_response_accepted: false,
            max_segments: 0,
            max_apdu: MaxApdu::UpTo1476,
            invoke_id,
            segment: None,
            service_choice,
        }
    }

    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        let mut b0 = ApduType::ConfirmedRequest.first_octet() | segment_bits(self.segment);
        if self.segmented_response_accepted {
            b0 |= SEGMENTED_RESPONSE_ACCEPTED;
        }
        w.write_u8(b0)?;
        w.write_u8((self.max_segments << 4) | self.max_apdu.code())?;
        w.write_u8(self.invoke_id)?;
        write_segment(w, self.segment)?;
        w.write_u8(self.service_choice)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = expect_type(r, ApduType::ConfirmedRequest)?;
        let limits = r.read_u8()?;
        let invoke_id = r.read_u8()?;
        let segment = read_segment(r, b0)?;
        Ok(Self {
            segmented_response_accepted: b0 & SEGMENTED_RESPONSE_ACCEPTED != 0,
            max_segments: limits >> 4,
            max_apdu: MaxApdu::from_code(limits & 0x0F).ok_or(DecodeError::InvalidValue)?,
            invoke_id,
            segment,
            service_choice: r.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexAckHeader {
    pub invoke_id: u8,
    pub segment: Option<SegmentInfo>,
    pub service_choice: u8,
}

impl ComplexAckHeader {
    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        w.write_u8(ApduType::ComplexAck.first_octet() | segment_bits(self.segment))?;
        w.write_u8(self.invoke_id)?;
        write_segment(w, self.segment)?;
        w.write_u8(self.service_choice)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = expect_type(r, ApduType::ComplexAck)?;
        let invoke_id = r.read_u8()?;
        let segment = read_segment(r, b0)?;
        Ok(Self {
            invoke_id,
            segment,
            service_choice: r.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleAck {
    pub invoke_id: u8,
    pub service_choice: u8,
}

impl SimpleAck {
    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        w.write_u8(ApduType::SimpleAck.first_octet())?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.service_choice)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        expect_type(r, ApduType::SimpleAck)?;
        Ok(Self {
            invoke_id: r.read_u8()?,
            service_choice: r.read_u8()?,
        })
    }
}

/// Error PDU. Class and code are optional on decode because some devices
/// send a bare header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPdu {
    pub invoke_id: u8,
    pub service_choice: u8,
    pub error_class: Option<u32>,
    pub error_code: Option<u32>,
}

impl ErrorPdu {
    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        w.write_u8(ApduType::Error.first_octet())?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.service_choice)?;
        if let (Some(class), Some(code)) = (self.error_class, self.error_code) {
            encode_app_enumerated(w, class)?;
            encode_app_enumerated(w, code)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        expect_type(r, ApduType::Error)?;
        let invoke_id = r.read_u8()?;
        let service_choice = r.read_u8()?;
        let (error_class, error_code) = if r.is_empty() {
            (None, None)
        } else {
            let (class, code) = read_class_and_code(r)?;
            (Some(class), Some(code))
        };
        Ok(Self {
            invoke_id,
            service_choice,
            error_class,
            error_code,
        })
    }
}

/// Class and code appear as application enumerations, as context tags 0/1,
/// or wrapped in opening/closing tag 0 depending on the service.
fn read_class_and_code(r: &mut Reader<'_>) -> Result<(u32, u32), DecodeError> {
    let first = Tag::decode(r)?;
    let wrapped = first == Tag::Opening { number: 0 };
    let class_tag = if wrapped { Tag::decode(r)? } else { first };
    let class = read_error_field(r, class_tag, 0)?;
    let code_tag = Tag::decode(r)?;
    let code = read_error_field(r, code_tag, 1)?;
    if wrapped && !Tag::decode(r)?.closes(0) {
        return Err(DecodeError::InvalidTag);
    }
    Ok((class, code))
}

fn read_error_field(r: &mut Reader<'_>, tag: Tag, context_number: u8) -> Result<u32, DecodeError> {
    match tag {
        Tag::Context { number, len } if number == context_number => {
            decode_unsigned(r, len as usize)
        }
        Tag::Application {
            tag: ApplicationTag::Enumerated,
            len,
        } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectPdu {
    pub invoke_id: u8,
    pub reason: u8,
}

impl RejectPdu {
    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        w.write_u8(ApduType::Reject.first_octet())?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.reason)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        expect_type(r, ApduType::Reject)?;
        Ok(Self {
            invoke_id: r.read_u8()?,
            reason: r.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortPdu {
    pub server: bool,
    pub invoke_id: u8,
    pub reason: u8,
}

impl AbortPdu {
    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        let server = if self.server { SERVER } else { 0 };
        w.write_u8(ApduType::Abort.first_octet() | server)?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.reason)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = expect_type(r, ApduType::Abort)?;
        Ok(Self {
            server: b0 & SERVER != 0,
            invoke_id: r.read_u8()?,
            reason: r.read_u8()?,
        })
    }
}
