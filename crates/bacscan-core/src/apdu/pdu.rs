#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApduType {
    ConfirmedRequest = 0,
    UnconfirmedRequest = 1,
    SimpleAck = 2,
    ComplexAck = 3,
    SegmentAck = 4,
    Error = 5,
    Reject = 6,
    Abort = 7,
}

impl ApduType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ConfirmedRequest),
            1 => Some(Self::UnconfirmedRequest),
            2 => Some(Self::SimpleAck),
            3 => Some(Self::ComplexAck),
            4 => Some(Self::SegmentAck),
            5 => Some(Self::Error),
            6 => Some(Self::Reject),
            7 => Some(Self::Abort),
            _ => None,
        }
    }

    /// Type of the APDU starting at `apdu[0]`.
    pub fn of(apdu: &[u8]) -> Option<Self> {
        apdu.first().and_then(|b| Self::from_u8(b >> 4))
    }

    /// True for the PDU types a server sends back for a confirmed request.
    pub const fn is_reply(self) -> bool {
        matches!(
            self,
            Self::SimpleAck
                | Self::ComplexAck
                | Self::SegmentAck
                | Self::Error
                | Self::Reject
                | Self::Abort
        )
    }

    pub const fn first_octet(self) -> u8 {
        (self as u8) << 4
    }
}

/// Invoke id of a reply APDU.
///
/// Every reply type carries it in the second octet, so the receive path can
/// correlate a frame before decoding the rest of it.
pub fn reply_invoke_id(apdu: &[u8]) -> Option<u8> {
    match ApduType::of(apdu) {
        Some(kind) if kind.is_reply() => apdu.get(1).copied(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{reply_invoke_id, ApduType};

    #[test]
    fn classifies_by_high_nibble() {
        assert_eq!(ApduType::of(&[0x30, 7, 0x0C]), Some(ApduType::ComplexAck));
        assert_eq!(ApduType::of(&[0x71, 7, 4]), Some(ApduType::Abort));
        assert_eq!(ApduType::of(&[0x90]), None);
        assert_eq!(ApduType::of(&[]), None);
    }

    #[test]
    fn invoke_id_only_for_replies() {
        assert_eq!(reply_invoke_id(&[0x20, 9, 0x0F]), Some(9));
        assert_eq!(reply_invoke_id(&[0x10, 0x00]), None);
        assert_eq!(reply_invoke_id(&[0x50]), None);
    }
}
