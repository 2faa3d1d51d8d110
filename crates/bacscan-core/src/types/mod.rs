use thiserror::Error;

/// Declares a BACnet enumeration with named standard values, a catch-all
/// variant for vendor/unknown values, and kebab-case names.
macro_rules! named_codes {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $repr:ty, $other:ident, $to:ident, $from:ident {
            $($variant:ident = $value:literal => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant,)+
            $other($repr),
        }

        impl $name {
            pub const fn $to(self) -> $repr {
                match self {
                    $(Self::$variant => $value,)+
                    Self::$other(v) => v,
                }
            }

            pub const fn $from(value: $repr) -> Self {
                match value {
                    $($value => Self::$variant,)+
                    v => Self::$other(v),
                }
            }

            /// Standard kebab-case name, `None` for vendor/unknown values.
            pub const fn name(self) -> Option<&'static str> {
                match self {
                    $(Self::$variant => Some($text),)+
                    Self::$other(_) => None,
                }
            }

            /// Looks up a standard value by name. Accepts `analog-input`,
            /// `analogInput` and `ANALOG_INPUT` spellings.
            pub fn from_name(text: &str) -> Option<Self> {
                let wanted = crate::types::fold_name(text);
                [$(Self::$variant,)+]
                    .into_iter()
                    .find(|v| v.name().map(crate::types::fold_name).as_deref() == Some(wanted.as_str()))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self.name() {
                    Some(text) => f.write_str(text),
                    None => write!(f, "{}", self.$to()),
                }
            }
        }

        impl core::str::FromStr for $name {
            type Err = crate::types::ParseIdentifierError;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                let text = text.trim();
                if let Ok(raw) = text.parse::<$repr>() {
                    return Ok(Self::$from(raw));
                }
                Self::from_name(text).ok_or_else(|| crate::types::ParseIdentifierError::UnknownName {
                    kind: stringify!($name),
                    text: text.to_string(),
                })
            }
        }
    };
}

pub mod data_value;
pub mod date_time;
pub mod enums;
pub mod object_id;
pub mod object_type;
pub mod property_id;

pub use data_value::{BitString, DataValue};
pub use date_time::{Date, Time};
pub use enums::{AbortReason, ErrorClass, ErrorCode, MaxApdu, RejectReason, Segmentation};
pub use object_id::ObjectId;
pub use object_type::ObjectType;
pub use property_id::PropertyId;

/// Failure to parse a textual object/property identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdentifierError {
    #[error("unknown {kind} `{text}`")]
    UnknownName { kind: &'static str, text: String },
    #[error("`{0}` is not of the form <object-type>:<instance>")]
    Malformed(String),
    #[error("instance {0} exceeds 4194303")]
    InstanceOutOfRange(u64),
    #[error("object type {0} exceeds 1023")]
    TypeOutOfRange(u16),
}

/// Lowercases and drops separators so `analogInput`, `analog-input` and
/// `ANALOG_INPUT` compare equal.
pub(crate) fn fold_name(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
