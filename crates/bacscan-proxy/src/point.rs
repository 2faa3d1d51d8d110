//! Point view of a device readout.
//!
//! Maps each object to a simplified kind and direction, the way building
//! automation front-ends list them.

use crate::DeviceReadout;
use bacscan_core::types::{DataValue, ObjectId, ObjectType, PropertyId};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PointKind {
    Analog,
    Binary,
    MultiState,
    Integer,
    Text,
    Accumulator,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PointDirection {
    Input,
    Output,
    Value,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointClassification {
    pub kind: PointKind,
    pub direction: PointDirection,
    /// Present-value accepts writes.
    pub writable: bool,
}

pub fn classify_point(object_type: ObjectType) -> PointClassification {
    use ObjectType as T;

    let kind = match object_type {
        T::AnalogInput | T::AnalogOutput | T::AnalogValue | T::LargeAnalogValue => {
            PointKind::Analog
        }
        T::BinaryInput | T::BinaryOutput | T::BinaryValue => PointKind::Binary,
        T::MultiStateInput | T::MultiStateOutput | T::MultiStateValue => PointKind::MultiState,
        T::IntegerValue | T::PositiveIntegerValue => PointKind::Integer,
        T::CharacterStringValue => PointKind::Text,
        T::Accumulator | T::PulseConverter => PointKind::Accumulator,
        _ => PointKind::Unknown,
    };
    let direction = match object_type {
        T::AnalogInput | T::BinaryInput | T::MultiStateInput | T::Accumulator => {
            PointDirection::Input
        }
        T::AnalogOutput | T::BinaryOutput | T::MultiStateOutput => PointDirection::Output,
        _ if kind == PointKind::Unknown => PointDirection::Unknown,
        _ => PointDirection::Value,
    };
    let writable = matches!(direction, PointDirection::Output | PointDirection::Value);

    PointClassification {
        kind,
        direction,
        writable,
    }
}

/// One object of a device, with what the readout learned about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub object_id: ObjectId,
    pub name: Option<String>,
    pub classification: PointClassification,
    pub present_value: Option<DataValue>,
    pub units: Option<u32>,
}

impl Point {
    /// Lists the readout's objects as points, skipping the device object and
    /// objects that are not points.
    pub fn from_readout(readout: &DeviceReadout) -> Vec<Self> {
        readout
            .objects
            .iter()
            .filter(|id| id.object_type() != ObjectType::Device)
            .filter_map(|&object_id| {
                let classification = classify_point(object_id.object_type());
                if classification.kind == PointKind::Unknown {
                    return None;
                }
                let name = readout
                    .value(object_id, PropertyId::ObjectName)
                    .and_then(DataValue::as_str)
                    .map(str::to_string);
                let units = match readout.value(object_id, PropertyId::Units) {
                    Some(DataValue::Enumerated(units)) => Some(*units),
                    _ => None,
                };
                Some(Self {
                    object_id,
                    name,
                    classification,
                    present_value: readout.value(object_id, PropertyId::PresentValue).cloned(),
                    units,
                })
            })
            .collect()
    }
}
