use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};

const CONTEXT_CLASS: u8 = 0b0000_1000;
const EXTENDED_TAG_NUMBER: u8 = 0x0F;
const EXTENDED_LENGTH: u8 = 5;
const OPENING: u8 = 6;
const CLOSING: u8 = 7;

/// Application tag numbers (BACnet application datatypes).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationTag {
    Null = 0,
    Boolean = 1,
    Unsigned = 2,
    Signed = 3,
    Real = 4,
    Double = 5,
    OctetString = 6,
    CharacterString = 7,
    BitString = 8,
    Enumerated = 9,
    Date = 10,
    Time = 11,
    ObjectId = 12,
}

impl ApplicationTag {
    pub fn from_u8(value: u8) -> Result<Self, DecodeError> {
        Ok(match value {
            0 => Self::Null,
            1 => Self::Boolean,
            2 => Self::Unsigned,
            3 => Self::Signed,
            4 => Self::Real,
            5 => Self::Double,
            6 => Self::OctetString,
            7 => Self::CharacterString,
            8 => Self::BitString,
            9 => Self::Enumerated,
            10 => Self::Date,
            11 => Self::Time,
            12 => Self::ObjectId,
            _ => return Err(DecodeError::InvalidTag),
        })
    }
}

/// A decoded tag header. `len` is the length of the content that follows;
/// for application booleans it carries the value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Application { tag: ApplicationTag, len: u32 },
    Context { number: u8, len: u32 },
    Opening { number: u8 },
    Closing { number: u8 },
}

impl Tag {
    pub fn encode(self, w: &mut Writer) -> Result<(), EncodeError> {
        match self {
            Tag::Application { tag, len } => write_header(w, tag as u8, 0, len),
            Tag::Context { number, len } => write_header(w, number, CONTEXT_CLASS, len),
            Tag::Opening { number } => write_initial(w, number, CONTEXT_CLASS | OPENING),
            Tag::Closing { number } => write_initial(w, number, CONTEXT_CLASS | CLOSING),
        }
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let initial = r.read_u8()?;
        let number = match initial >> 4 {
            EXTENDED_TAG_NUMBER => r.read_u8()?,
            n => n,
        };
        let lvt = initial & 0x07;
        let context = initial & CONTEXT_CLASS != 0;

        match (context, lvt) {
            (true, OPENING) => Ok(Tag::Opening { number }),
            (true, CLOSING) => Ok(Tag::Closing { number }),
            (true, _) => Ok(Tag::Context {
                number,
                len: read_length(r, lvt)?,
            }),
            (false, _) => Ok(Tag::Application {
                tag: ApplicationTag::from_u8(number)?,
                len: read_length(r, lvt)?,
            }),
        }
    }

    /// True for the closing tag with the given context number.
    pub fn closes(self, number: u8) -> bool {
        self == Tag::Closing { number }
    }
}

fn write_initial(w: &mut Writer, number: u8, low_bits: u8) -> Result<(), EncodeError> {
    if number < EXTENDED_TAG_NUMBER {
        w.write_u8((number << 4) | low_bits)
    } else {
        w.write_u8((EXTENDED_TAG_NUMBER << 4) | low_bits)?;
        w.write_u8(number)
    }
}

fn write_header(w: &mut Writer, number: u8, class: u8, len: u32) -> Result<(), EncodeError> {
    if len < u32::from(EXTENDED_LENGTH) {
        return write_initial(w, number, class | len as u8);
    }
    write_initial(w, number, class | EXTENDED_LENGTH)?;
    match len {
        0..=253 => w.write_u8(len as u8),
        254..=0xFFFF => {
            w.write_u8(254)?;
            w.write_be_u16(len as u16)
        }
        _ => {
            w.write_u8(255)?;
            w.write_be_u32(len)
        }
    }
}

fn read_length(r: &mut Reader<'_>, lvt: u8) -> Result<u32, DecodeError> {
    if lvt < EXTENDED_LENGTH {
        return Ok(u32::from(lvt));
    }
    if lvt > EXTENDED_LENGTH {
        return Err(DecodeError::InvalidLength);
    }
    match r.read_u8()? {
        254 => Ok(u32::from(r.read_be_u16()?)),
        255 => r.read_be_u32(),
        short => Ok(u32::from(short)),
    }
}
