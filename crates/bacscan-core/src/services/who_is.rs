use crate::apdu::UnconfirmedRequestHeader;
use crate::encoding::{
    primitives::{decode_ctx_unsigned, encode_ctx_unsigned},
    reader::Reader,
    writer::Writer,
};
use crate::{DecodeError, EncodeError};

pub const SERVICE_WHO_IS: u8 = 0x08;

/// Who-Is, optionally limited to a device instance range. The limits are
/// either both present or both absent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhoIsRequest {
    pub limits: Option<(u32, u32)>,
}

impl WhoIsRequest {
    pub const fn global() -> Self {
        Self { limits: None }
    }

    pub const fn range(low: u32, high: u32) -> Self {
        Self {
            limits: Some((low, high)),
        }
    }

    /// True when a device with `instance` must answer.
    pub fn matches(&self, instance: u32) -> bool {
        self.limits
            .map_or(true, |(low, high)| (low..=high).contains(&instance))
    }

    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        UnconfirmedRequestHeader {
            service_choice: SERVICE_WHO_IS,
        }
        .encode(w)?;
        if let Some((low, high)) = self.limits {
            encode_ctx_unsigned(w, 0, low)?;
            encode_ctx_unsigned(w, 1, high)?;
        }
        Ok(())
    }

    pub fn decode_after_header(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.is_empty() {
            return Ok(Self::global());
        }
        let low = decode_ctx_unsigned(r, 0)?;
        let high = decode_ctx_unsigned(r, 1)?;
        Ok(Self::range(low, high))
    }
}

#[cfg(test)]
mod tests {
    use super::WhoIsRequest;
    use crate::apdu::UnconfirmedRequestHeader;
    use crate::encoding::{reader::Reader, writer::Writer};

    #[test]
    fn range_limits_are_context_tagged() {
        let mut w = Writer::new();
        WhoIsRequest::range(100, 70_000).encode(&mut w).unwrap();
        assert_eq!(
            w.as_written(),
            &[0x10, 0x08, 0x09, 0x64, 0x1B, 0x01, 0x11, 0x70]
        );

        let mut r = Reader::new(w.as_written());
        UnconfirmedRequestHeader::decode(&mut r).unwrap();
        let decoded = WhoIsRequest::decode_after_header(&mut r).unwrap();
        assert!(decoded.matches(100));
        assert!(decoded.matches(70_000));
        assert!(!decoded.matches(99));
    }

    #[test]
    fn global_matches_everything() {
        let decoded = WhoIsRequest::decode_after_header(&mut Reader::new(&[])).unwrap();
        assert_eq!(decoded, WhoIsRequest::global());
        assert!(decoded.matches(4_194_303));
    }
}
