use crate::apdu::UnconfirmedRequestHeader;
use crate::encoding::{
    primitives::{
        decode_app_enumerated, decode_app_object_id, decode_app_unsigned, encode_app_enumerated,
        encode_app_object_id, encode_app_unsigned,
    },
    reader::Reader,
    writer::Writer,
};
use crate::types::{ObjectId, Segmentation};
use crate::{DecodeError, EncodeError};

pub const SERVICE_I_AM: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IAmRequest {
    pub device_id: ObjectId,
    /// Max APDU length accepted, in octets.
    pub max_apdu: u32,
    pub segmentation: Segmentation,
    pub vendor_id: u32,
}

impl IAmRequest {
    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        UnconfirmedRequestHeader {
            service_choice: SERVICE_I_AM,
        }
        .encode(w)?;
        encode_app_object_id(w, self.device_id)?;
        encode_app_unsigned(w, self.max_apdu)?;
        encode_app_enumerated(w, self.segmentation.to_u32())?;
        encode_app_unsigned(w, self.vendor_id)
    }

    pub fn decode_after_header(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            device_id: decode_app_object_id(r)?,
            max_apdu: decode_app_unsigned(r)?,
            segmentation: Segmentation::from_u32(decode_app_enumerated(r)?),
            vendor_id: decode_app_unsigned(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::IAmRequest;
    use crate::apdu::UnconfirmedRequestHeader;
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::{ObjectId, Segmentation};

    #[test]
    fn segmentation_is_enumerated() {
        let req = IAmRequest {
            device_id: ObjectId::device(1234),
            max_apdu: 1476,
            segmentation: Segmentation::NoSegmentation,
            vendor_id: 260,
        };
        let mut w = Writer::new();
        req.encode(&mut w).unwrap();
        assert_eq!(
            w.as_written(),
            &[0x10, 0x00, 0xC4, 0x02, 0x00, 0x04, 0xD2, 0x22, 0x05, 0xC4, 0x91, 0x03, 0x22, 0x01, 0x04]
        );

        let mut r = Reader::new(w.as_written());
        UnconfirmedRequestHeader::decode(&mut r).unwrap();
        assert_eq!(IAmRequest::decode_after_header(&mut r).unwrap(), req);
    }

    #[test]
    fn truncated_announcement_fails() {
        let frame = [0xC4, 0x02, 0x00, 0x04, 0xD2, 0x22, 0x05];
        assert!(IAmRequest::decode_after_header(&mut Reader::new(&frame)).is_err());
    }
}
