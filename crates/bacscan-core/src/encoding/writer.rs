use crate::EncodeError;

/// Largest NPDU that fits in one BACnet/IP datagram (1497 octets of BVLC
/// payload on an Ethernet MTU).
pub const MAX_NPDU_LEN: usize = 1497;

/// Growable frame builder.
///
/// Writes append to an owned buffer and fail with
/// [`EncodeError::FrameTooLarge`] once the configured limit would be exceeded.
#[derive(Debug, Clone)]
pub struct Writer {
    buf: Vec<u8>,
    limit: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Writer capped at [`MAX_NPDU_LEN`].
    pub fn new() -> Self {
        Self::with_limit(MAX_NPDU_LEN)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::with_capacity(limit.min(256)),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_written(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), EncodeError> {
        self.write_all(&[value])
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        if self.buf.len().saturating_add(data.len()) > self.limit {
            return Err(EncodeError::FrameTooLarge { limit: self.limit });
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    pub fn write_be_u16(&mut self, value: u16) -> Result<(), EncodeError> {
        self.write_all(&value.to_be_bytes())
    }

    pub fn write_be_u32(&mut self, value: u32) -> Result<(), EncodeError> {
        self.write_all(&value.to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::Writer;
    use crate::EncodeError;

    #[test]
    fn appends_big_endian() {
        let mut w = Writer::new();
        w.write_u8(0x81).unwrap();
        w.write_be_u16(0x0102).unwrap();
        w.write_be_u32(0xBAC0_0001).unwrap();
        assert_eq!(
            w.into_bytes(),
            vec![0x81, 0x01, 0x02, 0xBA, 0xC0, 0x00, 0x01]
        );
    }

    #[test]
    fn refuses_to_grow_past_limit() {
        let mut w = Writer::with_limit(3);
        w.write_all(&[1, 2]).unwrap();
        assert_eq!(
            w.write_all(&[3, 4]).unwrap_err(),
            EncodeError::FrameTooLarge { limit: 3 }
        );
        assert_eq!(w.as_written(), &[1, 2]);
    }
}
