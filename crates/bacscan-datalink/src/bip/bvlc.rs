//! BACnet Virtual Link Control framing for BACnet/IP (Annex J).

use crate::DataLinkError;
use bacscan_core::encoding::{reader::Reader, writer::Writer};
use bacscan_core::{DecodeError, EncodeError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const BVLC_TYPE_BIP: u8 = 0x81;
pub const BVLC_HEADER_LEN: usize = 4;

const BVLC_RESULT: u8 = 0x00;
const FORWARDED_NPDU: u8 = 0x04;
const DISTRIBUTE_BROADCAST: u8 = 0x09;
const ORIGINAL_UNICAST: u8 = 0x0A;
const ORIGINAL_BROADCAST: u8 = 0x0B;

/// The BVLC functions a discovery proxy sends or accepts. BBMD and
/// foreign-device administration arrives as [`Other`](Self::Other).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvlcFunction {
    Result,
    ForwardedNpdu,
    DistributeBroadcastToNetwork,
    OriginalUnicastNpdu,
    OriginalBroadcastNpdu,
    Other(u8),
}

impl From<u8> for BvlcFunction {
    fn from(code: u8) -> Self {
        match code {
            BVLC_RESULT => Self::Result,
            FORWARDED_NPDU => Self::ForwardedNpdu,
            DISTRIBUTE_BROADCAST => Self::DistributeBroadcastToNetwork,
            ORIGINAL_UNICAST => Self::OriginalUnicastNpdu,
            ORIGINAL_BROADCAST => Self::OriginalBroadcastNpdu,
            other => Self::Other(other),
        }
    }
}

impl From<BvlcFunction> for u8 {
    fn from(function: BvlcFunction) -> Self {
        match function {
            BvlcFunction::Result => BVLC_RESULT,
            BvlcFunction::ForwardedNpdu => FORWARDED_NPDU,
            BvlcFunction::DistributeBroadcastToNetwork => DISTRIBUTE_BROADCAST,
            BvlcFunction::OriginalUnicastNpdu => ORIGINAL_UNICAST,
            BvlcFunction::OriginalBroadcastNpdu => ORIGINAL_BROADCAST,
            BvlcFunction::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvlcHeader {
    pub function: BvlcFunction,
    /// Whole frame length, header included.
    pub length: u16,
}

impl BvlcHeader {
    pub fn for_payload(function: BvlcFunction, payload_len: usize) -> Result<Self, EncodeError> {
        let length = u16::try_from(payload_len + BVLC_HEADER_LEN).map_err(|_| {
            EncodeError::FrameTooLarge {
                limit: usize::from(u16::MAX),
            }
        })?;
        Ok(Self { function, length })
    }

    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        w.write_all(&[BVLC_TYPE_BIP, self.function.into()])?;
        w.write_be_u16(self.length)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let [kind, function] = r.read_array::<2>()?;
        if kind != BVLC_TYPE_BIP {
            return Err(DecodeError::InvalidValue);
        }
        let length = r.read_be_u16()?;
        if usize::from(length) < BVLC_HEADER_LEN {
            return Err(DecodeError::InvalidLength);
        }
        Ok(Self {
            function: function.into(),
            length,
        })
    }

    pub fn payload_len(&self) -> usize {
        usize::from(self.length) - BVLC_HEADER_LEN
    }
}

/// Wraps an NPDU in an Original-Unicast or Original-Broadcast frame.
pub fn encode_frame(broadcast: bool, npdu: &[u8], limit: usize) -> Result<Vec<u8>, DataLinkError> {
    let function = if broadcast {
        BvlcFunction::OriginalBroadcastNpdu
    } else {
        BvlcFunction::OriginalUnicastNpdu
    };
    let mut w = Writer::with_limit(limit);
    BvlcHeader::for_payload(function, npdu.len())
        .and_then(|header| header.encode(&mut w))
        .and_then(|()| w.write_all(npdu))
        .map_err(|_| DataLinkError::FrameTooLarge)?;
    Ok(w.into_bytes())
}

/// Unwraps one datagram received from `sender`. Returns the NPDU and the
/// node that originated it, which for a Forwarded-NPDU is the address the
/// BBMD recorded rather than the BBMD itself.
pub fn decode_frame(frame: &[u8], sender: SocketAddr) -> Result<(&[u8], SocketAddr), DataLinkError> {
    let mut r = Reader::new(frame);
    let header = BvlcHeader::decode(&mut r).map_err(|_| DataLinkError::InvalidFrame)?;
    let body = r
        .read_slice(header.payload_len())
        .map_err(|_| DataLinkError::InvalidFrame)?;

    match header.function {
        BvlcFunction::OriginalUnicastNpdu
        | BvlcFunction::OriginalBroadcastNpdu
        | BvlcFunction::DistributeBroadcastToNetwork => Ok((body, sender)),
        BvlcFunction::ForwardedNpdu => match body {
            [a, b, c, d, hi, lo, npdu @ ..] => {
                let origin = SocketAddr::new(
                    IpAddr::V4(Ipv4Addr::new(*a, *b, *c, *d)),
                    u16::from_be_bytes([*hi, *lo]),
                );
                Ok((npdu, origin))
            }
            _ => Err(DataLinkError::InvalidFrame),
        },
        BvlcFunction::Result => match body {
            [0, 0] => Err(DataLinkError::InvalidFrame),
            [hi, lo] => Err(DataLinkError::BvlcResult(u16::from_be_bytes([*hi, *lo]))),
            _ => Err(DataLinkError::InvalidFrame),
        },
        BvlcFunction::Other(code) => Err(DataLinkError::UnsupportedBvlcFunction(code)),
    }
}
