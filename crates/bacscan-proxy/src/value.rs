//! JSON rendering of property values, and typed parsing of values to write.

use crate::ProxyError;
use bacscan_core::types::{DataValue, ObjectId, ObjectType, PropertyId};
use core::fmt;
use core::str::FromStr;
use serde_json::{json, Value};

/// Renders a property value as JSON.
///
/// Reals are printed at `f32` precision, object identifiers as
/// `analog-input:1`, bit strings as arrays of booleans, octet strings as hex,
/// dates and times as text.
pub fn value_to_json(value: &DataValue) -> Value {
    match value {
        DataValue::Null => Value::Null,
        DataValue::Boolean(v) => json!(v),
        DataValue::Unsigned(v) | DataValue::Enumerated(v) => json!(v),
        DataValue::Signed(v) => json!(v),
        DataValue::Real(v) => v
            .to_string()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map_or(Value::Null, Value::Number),
        DataValue::Double(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
        DataValue::OctetString(bytes) => {
            Value::String(bytes.iter().map(|b| format!("{b:02x}")).collect())
        }
        DataValue::CharacterString(text) => Value::String(text.clone()),
        DataValue::BitString(bits) => Value::Array(bits.bits().map(Value::Bool).collect()),
        DataValue::Date(date) => Value::String(date.to_string()),
        DataValue::Time(time) => Value::String(time.to_string()),
        DataValue::ObjectId(id) => Value::String(id.to_string()),
        DataValue::Array(items) => Value::Array(items.iter().map(value_to_json).collect()),
    }
}

/// Application type a written value is encoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Boolean,
    Unsigned,
    Signed,
    Real,
    Double,
    CharacterString,
    Enumerated,
    ObjectId,
}

impl ValueKind {
    const NAMES: [(&'static str, Self); 9] = [
        ("null", Self::Null),
        ("boolean", Self::Boolean),
        ("unsigned", Self::Unsigned),
        ("signed", Self::Signed),
        ("real", Self::Real),
        ("double", Self::Double),
        ("string", Self::CharacterString),
        ("enumerated", Self::Enumerated),
        ("object-id", Self::ObjectId),
    ];

    pub fn name(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map_or("null", |(name, _)| name)
    }

    /// The type a property conventionally takes on objects of `object_type`.
    pub fn for_property(object_type: ObjectType, property_id: PropertyId) -> Option<Self> {
        match property_id {
            PropertyId::PresentValue | PropertyId::RelinquishDefault => match object_type {
                ObjectType::AnalogInput | ObjectType::AnalogOutput | ObjectType::AnalogValue => {
                    Some(Self::Real)
                }
                ObjectType::BinaryInput | ObjectType::BinaryOutput | ObjectType::BinaryValue => {
                    Some(Self::Enumerated)
                }
                ObjectType::MultiStateInput
                | ObjectType::MultiStateOutput
                | ObjectType::MultiStateValue
                | ObjectType::PositiveIntegerValue
                | ObjectType::Accumulator => Some(Self::Unsigned),
                ObjectType::IntegerValue => Some(Self::Signed),
                ObjectType::LargeAnalogValue => Some(Self::Double),
                ObjectType::CharacterStringValue => Some(Self::CharacterString),
                _ => None,
            },
            PropertyId::ObjectName | PropertyId::Description | PropertyId::Location => {
                Some(Self::CharacterString)
            }
            PropertyId::OutOfService => Some(Self::Boolean),
            PropertyId::CovIncrement | PropertyId::HighLimit | PropertyId::LowLimit => {
                Some(Self::Real)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueKind {
    type Err = ProxyError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let wanted = text.trim().to_ascii_lowercase();
        let wanted = match wanted.as_str() {
            "bool" => "boolean",
            "uint" | "unsigned-integer" => "unsigned",
            "int" | "integer" => "signed",
            "float" => "real",
            "character-string" | "characterstring" | "str" => "string",
            "enum" => "enumerated",
            "object-identifier" | "objectid" => "object-id",
            other => other,
        };
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| ProxyError::InvalidArgument(format!("unknown value type `{text}`")))
    }
}

/// Builds the value to write for `object_type`/`property_id`.
///
/// `null` (or the strings `null`/`relinquish`) always produces `Null`, which
/// relinquishes a commandable property at the write priority. Otherwise the
/// explicit `kind`, the property's conventional type, or the JSON type
/// decides the encoding, in that order. Numbers may be given as strings.
pub fn value_from_json(
    json: &Value,
    object_type: ObjectType,
    property_id: PropertyId,
    kind: Option<ValueKind>,
) -> Result<DataValue, ProxyError> {
    if is_relinquish(json) {
        return Ok(DataValue::Null);
    }
    let kind = kind
        .or_else(|| ValueKind::for_property(object_type, property_id))
        .unwrap_or_else(|| kind_of_json(json));
    convert(json, kind)
}

fn is_relinquish(json: &Value) -> bool {
    match json {
        Value::Null => true,
        Value::String(text) => {
            let text = text.trim();
            text.eq_ignore_ascii_case("null") || text.eq_ignore_ascii_case("relinquish")
        }
        _ => false,
    }
}

fn kind_of_json(json: &Value) -> ValueKind {
    match json {
        Value::Null => ValueKind::Null,
        Value::Bool(_) => ValueKind::Boolean,
        Value::Number(n) if n.is_u64() => ValueKind::Unsigned,
        Value::Number(n) if n.is_i64() => ValueKind::Signed,
        Value::Number(_) => ValueKind::Real,
        _ => ValueKind::CharacterString,
    }
}

fn invalid(json: &Value, kind: ValueKind) -> ProxyError {
    ProxyError::InvalidArgument(format!("{json} is not a valid {kind} value"))
}

fn convert(json: &Value, kind: ValueKind) -> Result<DataValue, ProxyError> {
    let text = json.as_str().map(str::trim);
    let number = || json.as_f64().or_else(|| text.and_then(|t| t.parse::<f64>().ok()));
    let integer = || {
        json.as_i64()
            .or_else(|| text.and_then(|t| t.parse::<i64>().ok()))
    };

    match kind {
        ValueKind::Null => Ok(DataValue::Null),
        ValueKind::Boolean => match (json, text) {
            (Value::Bool(v), _) => Ok(DataValue::Boolean(*v)),
            (Value::Number(n), _) => Ok(DataValue::Boolean(n.as_f64() != Some(0.0))),
            (_, Some("true" | "1" | "active" | "on")) => Ok(DataValue::Boolean(true)),
            (_, Some("false" | "0" | "inactive" | "off")) => Ok(DataValue::Boolean(false)),
            _ => Err(invalid(json, kind)),
        },
        ValueKind::Enumerated => match (json, text.map(str::to_ascii_lowercase).as_deref()) {
            (Value::Bool(v), _) => Ok(DataValue::Enumerated(u32::from(*v))),
            (_, Some("active" | "on")) => Ok(DataValue::Enumerated(1)),
            (_, Some("inactive" | "off")) => Ok(DataValue::Enumerated(0)),
            _ => integer()
                .and_then(|v| u32::try_from(v).ok())
                .map(DataValue::Enumerated)
                .ok_or_else(|| invalid(json, kind)),
        },
        ValueKind::Unsigned => integer()
            .and_then(|v| u32::try_from(v).ok())
            .map(DataValue::Unsigned)
            .ok_or_else(|| invalid(json, kind)),
        ValueKind::Signed => integer()
            .and_then(|v| i32::try_from(v).ok())
            .map(DataValue::Signed)
            .ok_or_else(|| invalid(json, kind)),
        ValueKind::Real => number()
            .filter(|v| v.is_finite() && v.abs() <= f64::from(f32::MAX))
            .map(|v| DataValue::Real(v as f32))
            .ok_or_else(|| invalid(json, kind)),
        ValueKind::Double => number()
            .filter(|v| v.is_finite())
            .map(DataValue::Double)
            .ok_or_else(|| invalid(json, kind)),
        ValueKind::CharacterString => match json {
            Value::String(text) => Ok(DataValue::CharacterString(text.clone())),
            Value::Number(n) => Ok(DataValue::CharacterString(n.to_string())),
            Value::Bool(v) => Ok(DataValue::CharacterString(v.to_string())),
            _ => Err(invalid(json, kind)),
        },
        ValueKind::ObjectId => text
            .and_then(|t| t.parse::<ObjectId>().ok())
            .map(DataValue::ObjectId)
            .ok_or_else(|| invalid(json, kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::{value_from_json, value_to_json, ValueKind};
    use crate::ProxyError;
    use bacscan_core::types::{BitString, DataValue, ObjectId, ObjectType, PropertyId};
    use serde_json::json;

    #[test]
    fn renders_values_for_callers() {
        assert_eq!(value_to_json(&DataValue::Real(21.1)), json!(21.1));
        assert_eq!(value_to_json(&DataValue::Enumerated(1)), json!(1));
        assert_eq!(value_to_json(&DataValue::Real(f32::NAN)), json!(null));
        assert_eq!(
            value_to_json(&DataValue::ObjectId(ObjectId::new(ObjectType::AnalogInput, 3))),
            json!("analog-input:3")
        );
        assert_eq!(
            value_to_json(&DataValue::BitString(BitString::from_bits(&[false, true, false, false]))),
            json!([false, true, false, false])
        );
        assert_eq!(
            value_to_json(&DataValue::Array(vec![DataValue::Null, DataValue::Real(72.5)])),
            json!([null, 72.5])
        );
        assert_eq!(value_to_json(&DataValue::OctetString(vec![0xC0, 0xA8])), json!("c0a8"));
    }

    #[test]
    fn present_value_type_follows_object_type() {
        let pv = PropertyId::PresentValue;
        assert_eq!(
            value_from_json(&json!(72), ObjectType::AnalogValue, pv, None).unwrap(),
            DataValue::Real(72.0)
        );
        assert_eq!(
            value_from_json(&json!("active"), ObjectType::BinaryOutput, pv, None).unwrap(),
            DataValue::Enumerated(1)
        );
        assert_eq!(
            value_from_json(&json!("3"), ObjectType::MultiStateValue, pv, None).unwrap(),
            DataValue::Unsigned(3)
        );
        assert_eq!(
            value_from_json(&json!(-4), ObjectType::IntegerValue, pv, None).unwrap(),
            DataValue::Signed(-4)
        );
    }

    #[test]
    fn null_and_relinquish_clear_a_priority_slot() {
        for json in [json!(null), json!("null"), json!("Relinquish")] {
            assert_eq!(
                value_from_json(&json, ObjectType::AnalogOutput, PropertyId::PresentValue, None)
                    .unwrap(),
                DataValue::Null
            );
        }
    }

    #[test]
    fn explicit_kind_wins_and_is_validated() {
        let custom = PropertyId::Proprietary(5000);
        assert_eq!(
            value_from_json(&json!(5), ObjectType::Device, custom, Some(ValueKind::Double)).unwrap(),
            DataValue::Double(5.0)
        );
        assert_eq!(
            value_from_json(&json!(5), ObjectType::Device, custom, None).unwrap(),
            DataValue::Unsigned(5)
        );
        assert!(matches!(
            value_from_json(&json!(-1), ObjectType::Device, custom, Some(ValueKind::Unsigned)),
            Err(ProxyError::InvalidArgument(_))
        ));
        assert!(matches!(
            value_from_json(&json!("warm"), ObjectType::AnalogValue, PropertyId::PresentValue, None),
            Err(ProxyError::InvalidArgument(_))
        ));
    }

    #[test]
    fn kind_names_parse() {
        assert_eq!("real".parse::<ValueKind>().unwrap(), ValueKind::Real);
        assert_eq!("Enum".parse::<ValueKind>().unwrap(), ValueKind::Enumerated);
        assert_eq!("object-id".parse::<ValueKind>().unwrap().to_string(), "object-id");
        assert!("decimal".parse::<ValueKind>().is_err());
    }
}
