use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};

/// Network layer protocol version (always `0x01`).
pub const NPDU_VERSION: u8 = 0x01;

const NETWORK_MESSAGE: u8 = 0x80;
const HAS_DESTINATION: u8 = 0x20;
const HAS_SOURCE: u8 = 0x08;
const EXPECTING_REPLY: u8 = 0x04;
const PRIORITY_MASK: u8 = 0x03;

/// DNET/SNET plus MAC of a device behind a router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddress {
    pub network: u16,
    pub mac: Vec<u8>,
}

/// NPDU header.
///
/// The proxy only ever originates local frames, but replies routed from other
/// networks still carry source/destination specifiers that must be skipped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Npdu {
    pub expecting_reply: bool,
    pub priority: u8,
    pub destination: Option<RemoteAddress>,
    pub source: Option<RemoteAddress>,
    pub hop_count: Option<u8>,
    /// Network layer message type; `None` for frames carrying an APDU.
    pub network_message: Option<u8>,
}

impl Npdu {
    /// Local frame that does not expect a reply (unconfirmed requests, acks).
    pub fn local() -> Self {
        Self::default()
    }

    /// Local frame carrying a confirmed request.
    pub fn expecting_reply() -> Self {
        Self {
            expecting_reply: true,
            ..Self::default()
        }
    }

    pub fn control(&self) -> u8 {
        let mut control = self.priority & PRIORITY_MASK;
        if self.network_message.is_some() {
            control |= NETWORK_MESSAGE;
        }
        if self.destination.is_some() {
            control |= HAS_DESTINATION;
        }
        if self.source.is_some() {
            control |= HAS_SOURCE;
        }
        if self.expecting_reply {
            control |= EXPECTING_REPLY;
        }
        control
    }

    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        w.write_u8(NPDU_VERSION)?;
        w.write_u8(self.control())?;
        if let Some(dest) = &self.destination {
            write_address(w, dest)?;
        }
        if let Some(src) = &self.source {
            write_address(w, src)?;
        }
        if self.destination.is_some() {
            w.write_u8(self.hop_count.unwrap_or(255))?;
        }
        if let Some(message) = self.network_message {
            w.write_u8(message)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != NPDU_VERSION {
            return Err(DecodeError::InvalidValue);
        }
        let control = r.read_u8()?;
        let destination = if control & HAS_DESTINATION != 0 {
            Some(read_address(r)?)
        } else {
            None
        };
        let source = if control & HAS_SOURCE != 0 {
            Some(read_address(r)?)
        } else {
            None
        };
        let hop_count = if destination.is_some() {
            Some(r.read_u8()?)
        } else {
            None
        };
        let network_message = if control & NETWORK_MESSAGE != 0 {
            let message = r.read_u8()?;
            if message >= 0x80 {
                // proprietary network messages carry a vendor id
                r.read_be_u16()?;
            }
            Some(message)
        } else {
            None
        };

        Ok(Self {
            expecting_reply: control & EXPECTING_REPLY != 0,
            priority: control & PRIORITY_MASK,
            destination,
            source,
            hop_count,
            network_message,
        })
    }
}

/// Splits a received NPDU into its header and the APDU that follows it.
pub fn split_apdu(frame: &[u8]) -> Result<(Npdu, &[u8]), DecodeError> {
    let mut r = Reader::new(frame);
    let npdu = Npdu::decode(&mut r)?;
    Ok((npdu, r.rest()))
}

fn write_address(w: &mut Writer, address: &RemoteAddress) -> Result<(), EncodeError> {
    let len = u8::try_from(address.mac.len()).map_err(|_| EncodeError::ValueOutOfRange)?;
    w.write_be_u16(address.network)?;
    w.write_u8(len)?;
    w.write_all(&address.mac)
}

fn read_address(r: &mut Reader<'_>) -> Result<RemoteAddress, DecodeError> {
    let network = r.read_be_u16()?;
    let len = r.read_u8()?;
    let mac = r.read_slice(usize::from(len))?.to_vec();
    Ok(RemoteAddress { network, mac })
}

#[cfg(test)]
mod tests {
    use super::{split_apdu, Npdu, RemoteAddress};
    use crate::encoding::writer::Writer;

    #[test]
    fn confirmed_requests_set_expecting_reply() {
        let mut w = Writer::new();
        Npdu::expecting_reply().encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x01, 0x04]);
    }

    #[test]
    fn routed_reply_skips_source_specifier() {
        // I-Am relayed by a router from network 5, MAC 0x0A
        let frame = [0x01, 0x08, 0x00, 0x05, 0x01, 0x0A, 0x10, 0x00];
        let (npdu, apdu) = split_apdu(&frame).unwrap();
        assert_eq!(
            npdu.source,
            Some(RemoteAddress {
                network: 5,
                mac: vec![0x0A]
            })
        );
        assert_eq!(apdu, &[0x10, 0x00]);
    }

    #[test]
    fn network_messages_are_flagged() {
        let frame = [0x01, 0x80, 0x01, 0x00, 0x05];
        let (npdu, _) = split_apdu(&frame).unwrap();
        assert_eq!(npdu.network_message, Some(0x01));
    }

    #[test]
    fn wrong_version_is_rejected() {
        assert!(split_apdu(&[0x02, 0x00]).is_err());
    }
}
