use core::fmt;
use core::str::FromStr;

use crate::types::{ObjectType, ParseIdentifierError};

/// Largest instance number an object identifier can carry.
pub const MAX_INSTANCE: u32 = 0x3F_FFFF;
/// Largest object type an object identifier can carry.
pub const MAX_OBJECT_TYPE: u16 = 0x03FF;

/// A packed BACnet object identifier combining an [`ObjectType`] and a 22-bit
/// instance number into a single `u32`.
///
/// The upper 10 bits encode the object type and the lower 22 bits encode the
/// instance number, matching the BACnet wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Creates an `ObjectId` from a type and instance number. Out-of-range
    /// parts are masked; use [`ObjectId::try_new`] to reject them instead.
    pub const fn new(object_type: ObjectType, instance: u32) -> Self {
        Self((((object_type.to_u16() as u32) & MAX_OBJECT_TYPE as u32) << 22) | (instance & MAX_INSTANCE))
    }

    pub fn try_new(object_type: ObjectType, instance: u32) -> Result<Self, ParseIdentifierError> {
        if object_type.to_u16() > MAX_OBJECT_TYPE {
            return Err(ParseIdentifierError::TypeOutOfRange(object_type.to_u16()));
        }
        if instance > MAX_INSTANCE {
            return Err(ParseIdentifierError::InstanceOutOfRange(u64::from(instance)));
        }
        Ok(Self::new(object_type, instance))
    }

    /// Device object identifier for a device instance.
    pub const fn device(instance: u32) -> Self {
        Self::new(ObjectType::Device, instance)
    }

    /// Returns the raw packed `u32` representation.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Constructs an `ObjectId` from a pre-packed `u32`.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn object_type(self) -> ObjectType {
        ObjectType::from_u16(((self.0 >> 22) & MAX_OBJECT_TYPE as u32) as u16)
    }

    pub const fn instance(self) -> u32 {
        self.0 & MAX_INSTANCE
    }
}

/// Renders as `analog-input:1`; proprietary types render numerically.
impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type(), self.instance())
    }
}

/// Accepts `analog-input:1`, `analogInput,1`, `0 1` and `0:1`.
impl FromStr for ObjectId {
    type Err = ParseIdentifierError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        let separator = |c: char| c == ':' || c == ',' || c.is_whitespace();
        let (kind, instance) = trimmed
            .split_once(separator)
            .ok_or_else(|| ParseIdentifierError::Malformed(trimmed.to_string()))?;
        let object_type: ObjectType = kind.parse()?;
        let instance: u64 = instance
            .trim_start_matches(separator)
            .parse()
            .map_err(|_| ParseIdentifierError::Malformed(trimmed.to_string()))?;
        let instance =
            u32::try_from(instance).map_err(|_| ParseIdentifierError::InstanceOutOfRange(instance))?;
        Self::try_new(object_type, instance)
    }
}
