use crate::types::{Date, ObjectId, Time};

/// An owned bit string: `unused_bits` (0–7) trailing bits of the last octet
/// are padding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitString {
    pub unused_bits: u8,
    pub data: Vec<u8>,
}

impl BitString {
    pub fn new(unused_bits: u8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            unused_bits,
            data: data.into(),
        }
    }

    /// Builds a bit string from individual bits, most significant first.
    pub fn from_bits(bits: &[bool]) -> Self {
        let mut data = vec![0u8; bits.len().div_ceil(8)];
        for (i, bit) in bits.iter().enumerate() {
            if *bit {
                data[i / 8] |= 0x80 >> (i % 8);
            }
        }
        let unused_bits = ((8 - bits.len() % 8) % 8) as u8;
        Self { unused_bits, data }
    }

    pub fn len(&self) -> usize {
        (self.data.len() * 8).saturating_sub(usize::from(self.unused_bits))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bit(&self, index: usize) -> Option<bool> {
        if index >= self.len() {
            return None;
        }
        Some(self.data[index / 8] & (0x80 >> (index % 8)) != 0)
    }

    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len()).filter_map(|i| self.bit(i))
    }
}

/// An application-tagged property value. `Array` holds the elements of a
/// list or array property (object-list, priority-array, state-text).
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Null,
    Boolean(bool),
    Unsigned(u32),
    Signed(i32),
    Real(f32),
    Double(f64),
    OctetString(Vec<u8>),
    CharacterString(String),
    BitString(BitString),
    Enumerated(u32),
    Date(Date),
    Time(Time),
    ObjectId(ObjectId),
    Array(Vec<DataValue>),
}

impl DataValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view used for analog points and priority arbitration.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Unsigned(v) | Self::Enumerated(v) => Some(f64::from(*v)),
            Self::Signed(v) => Some(f64::from(*v)),
            Self::Real(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            Self::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::CharacterString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Self::ObjectId(id) => Some(*id),
            _ => None,
        }
    }

    /// Elements of an array value; a scalar is a one-element slice.
    pub fn elements(&self) -> &[DataValue] {
        match self {
            Self::Array(items) => items,
            other => core::slice::from_ref(other),
        }
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f32> for DataValue {
    fn from(value: f32) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::CharacterString(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        Self::CharacterString(value)
    }
}

impl From<ObjectId> for DataValue {
    fn from(value: ObjectId) -> Self {
        Self::ObjectId(value)
    }
}
