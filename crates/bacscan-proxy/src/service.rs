//! Control surface over a [`Proxy`].
//!
//! Every operation takes textual arguments and answers with a [`Reply`] that
//! serializes as `{"status":"done", ...}` or `{"status":"error","error":...}`.
//! Failures never escape as panics or `Err`; they become error replies.

use crate::point::{Point, PointDirection, PointKind};
use crate::resolver::parse_device_address;
use crate::value::{value_from_json, value_to_json, ValueKind};
use crate::{DeviceAnnouncement, PropertyReference, Proxy, ProxyError, ScanTarget};
use bacscan_core::types::{ObjectId, PropertyId};
use bacscan_datalink::{BacnetIpTransport, DataLink};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Outcome of one control operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reply<T> {
    Done(T),
    Error { error: String },
}

impl<T> Reply<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

impl<T> From<Result<T, ProxyError>> for Reply<T> {
    fn from(result: Result<T, ProxyError>) -> Self {
        match result {
            Ok(payload) => Self::Done(payload),
            Err(err) => Self::Error {
                error: err.to_string(),
            },
        }
    }
}

impl<T: Serialize> Reply<T> {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self)
            .unwrap_or_else(|err| json!({ "status": "error", "error": err.to_string() }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Started {
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Devices {
    pub devices: Vec<DeviceRecord>,
}

/// One discovered device in the shape control clients consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    #[serde(rename = "pduSource")]
    pub pdu_source: String,
    #[serde(rename = "deviceIdentifier")]
    pub device_identifier: String,
    #[serde(rename = "maxAPDULengthAccepted")]
    pub max_apdu_length_accepted: u32,
    #[serde(rename = "segmentationSupported")]
    pub segmentation_supported: String,
    #[serde(rename = "vendorID")]
    pub vendor_id: u32,
    #[serde(rename = "object-name", skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_ip_target: Option<String>,
    pub device_instance: u32,
}

impl DeviceRecord {
    pub fn new(device: &DeviceAnnouncement, scanned_ip_target: Option<String>) -> Self {
        Self {
            pdu_source: device.address.to_string(),
            device_identifier: device.device_id.to_string(),
            max_apdu_length_accepted: device.max_apdu,
            segmentation_supported: device.segmentation.to_string(),
            vendor_id: device.vendor_id,
            object_name: device.object_name.clone(),
            scanned_ip_target,
            device_instance: device.device_id.instance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyValue {
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Readout {
    /// `"<object>/<property>"` to the value, or `{"error": ...}`.
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Points {
    pub points: Vec<PointRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRecord {
    pub object: String,
    pub name: Option<String>,
    pub kind: PointKind,
    pub direction: PointDirection,
    pub writable: bool,
    #[serde(rename = "present-value")]
    pub present_value: Value,
    pub units: Option<u32>,
}

impl From<&Point> for PointRecord {
    fn from(point: &Point) -> Self {
        Self {
            object: point.object_id.to_string(),
            name: point.name.clone(),
            kind: point.classification.kind,
            direction: point.classification.direction,
            writable: point.classification.writable,
            present_value: point.present_value.as_ref().map_or(Value::Null, value_to_json),
            units: point.units,
        }
    }
}

/// A control operation as it arrives on the JSON-lines control channel,
/// e.g. `{"op":"scan","network":"192.168.1.0/24"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlRequest {
    Start {
        bind_address: Option<String>,
    },
    Stop,
    Scan {
        network: String,
        window_ms: Option<u64>,
    },
    WhoIs {
        low: Option<u32>,
        high: Option<u32>,
        destination: Option<String>,
    },
    ReadProperty {
        device_address: String,
        object_identifier: String,
        property_identifier: String,
        property_array_index: Option<u32>,
    },
    WriteProperty {
        device_address: String,
        object_identifier: String,
        property_identifier: String,
        value: Value,
        priority: Option<u8>,
        property_array_index: Option<u32>,
        value_type: Option<String>,
    },
    ReadDeviceAll {
        device_address: String,
        device_object_identifier: String,
    },
    Points {
        device_address: String,
        device_object_identifier: String,
    },
    Devices,
}

/// Text-in, [`Reply`]-out wrapper around one [`Proxy`].
#[derive(Debug)]
pub struct ProxyService<D: DataLink = BacnetIpTransport> {
    proxy: Proxy<D>,
}

impl<D: DataLink> Default for ProxyService<D> {
    fn default() -> Self {
        Self::new(Proxy::default())
    }
}

impl ProxyService<BacnetIpTransport> {
    /// Starts the proxy. The reply carries the interface address only.
    pub async fn start(&self, bind_address: Option<&str>) -> Reply<Started> {
        let started = async {
            let bind_address = bind_address
                .map(|text| {
                    text.trim().parse::<Ipv4Addr>().map_err(|_| {
                        ProxyError::InvalidArgument(format!("`{text}` is not an IPv4 address"))
                    })
                })
                .transpose()?;
            let address = self.proxy.start(bind_address).await?;
            Ok::<_, ProxyError>(Started {
                address: address.ip().to_string(),
            })
        };
        started.await.into()
    }

    /// Runs one JSON control request and renders its reply.
    pub async fn handle(&self, request: ControlRequest) -> Value {
        match request {
            ControlRequest::Start { bind_address } => {
                self.start(bind_address.as_deref()).await.to_json()
            }
            ControlRequest::Stop => self.stop().await.to_json(),
            ControlRequest::Scan { network, window_ms } => self
                .scan(&network, window_ms.map(Duration::from_millis))
                .await
                .to_json(),
            ControlRequest::WhoIs {
                low,
                high,
                destination,
            } => self.who_is(low, high, destination.as_deref()).await.to_json(),
            ControlRequest::ReadProperty {
                device_address,
                object_identifier,
                property_identifier,
                property_array_index,
            } => self
                .read_property(
                    &device_address,
                    &object_identifier,
                    &property_identifier,
                    property_array_index,
                )
                .await
                .to_json(),
            ControlRequest::WriteProperty {
                device_address,
                object_identifier,
                property_identifier,
                value,
                priority,
                property_array_index,
                value_type,
            } => self
                .write_property(
                    &device_address,
                    &object_identifier,
                    &property_identifier,
                    &value,
                    priority,
                    property_array_index,
                    value_type.as_deref(),
                )
                .await
                .to_json(),
            ControlRequest::ReadDeviceAll {
                device_address,
                device_object_identifier,
            } => self
                .read_device_all(&device_address, &device_object_identifier)
                .await
                .to_json(),
            ControlRequest::Points {
                device_address,
                device_object_identifier,
            } => self
                .points(&device_address, &device_object_identifier)
                .await
                .to_json(),
            ControlRequest::Devices => self.devices().await.to_json(),
        }
    }

    /// Parses one control line and runs it. Malformed lines get an error
    /// reply.
    pub async fn handle_line(&self, line: &str) -> Value {
        match serde_json::from_str::<ControlRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(err) => Reply::<Empty>::Error {
                error: format!("invalid request: {err}"),
            }
            .to_json(),
        }
    }
}

impl<D: DataLink> ProxyService<D> {
    pub fn new(proxy: Proxy<D>) -> Self {
        Self { proxy }
    }

    pub fn proxy(&self) -> &Proxy<D> {
        &self.proxy
    }

    /// Always succeeds, whether or not the proxy was running.
    pub async fn stop(&self) -> Reply<Empty> {
        self.proxy.stop().await;
        Reply::Done(Empty {})
    }

    pub async fn scan(&self, network: &str, window: Option<Duration>) -> Reply<Devices> {
        let scanned = async {
            let target: ScanTarget = network.parse()?;
            let devices = self.proxy.scan_range(&target, window).await?;
            let scanned_ip_target = network.trim().to_string();
            Ok::<_, ProxyError>(Devices {
                devices: devices
                    .iter()
                    .map(|device| DeviceRecord::new(device, Some(scanned_ip_target.clone())))
                    .collect(),
            })
        };
        scanned.await.into()
    }

    pub async fn who_is(
        &self,
        low: Option<u32>,
        high: Option<u32>,
        destination: Option<&str>,
    ) -> Reply<Devices> {
        let found = async {
            let destination = destination.map(|text| self.address(text)).transpose()?;
            let devices = self.proxy.who_is(low, high, destination).await?;
            let target = destination.map(|address| address.to_string());
            Ok::<_, ProxyError>(Devices {
                devices: devices
                    .iter()
                    .map(|device| DeviceRecord::new(device, target.clone()))
                    .collect(),
            })
        };
        found.await.into()
    }

    /// Devices found by the most recent scan.
    pub async fn devices(&self) -> Reply<Devices> {
        let registry = self.proxy.devices().await;
        Reply::Done(Devices {
            devices: registry.iter().map(|device| DeviceRecord::new(device, None)).collect(),
        })
    }

    pub async fn read_property(
        &self,
        device_address: &str,
        object_identifier: &str,
        property_identifier: &str,
        array_index: Option<u32>,
    ) -> Reply<PropertyValue> {
        let read = async {
            let reference =
                self.reference(device_address, object_identifier, property_identifier, array_index)?;
            let value = self.proxy.read_property(&reference).await?;
            Ok::<_, ProxyError>(PropertyValue {
                value: value_to_json(&value),
            })
        };
        read.await.into()
    }

    /// Writes `value`, typed by `value_type` when given and otherwise by the
    /// property's conventional type. `null` relinquishes at `priority`.
    #[allow(clippy::too_many_arguments)]
    pub async fn write_property(
        &self,
        device_address: &str,
        object_identifier: &str,
        property_identifier: &str,
        value: &Value,
        priority: Option<u8>,
        array_index: Option<u32>,
        value_type: Option<&str>,
    ) -> Reply<Empty> {
        let written = async {
            let reference =
                self.reference(device_address, object_identifier, property_identifier, array_index)?;
            let kind = value_type.map(str::parse::<ValueKind>).transpose()?;
            let value = value_from_json(
                value,
                reference.object_id.object_type(),
                reference.property_id,
                kind,
            )?;
            self.proxy.write_property(&reference, value, priority).await?;
            Ok::<_, ProxyError>(Empty {})
        };
        written.await.into()
    }

    pub async fn read_device_all(
        &self,
        device_address: &str,
        device_object_identifier: &str,
    ) -> Reply<Readout> {
        let read = async {
            let (address, device_id) = self.device(device_address, device_object_identifier)?;
            let readout = self.proxy.read_device_all(address, device_id).await?;
            let properties = readout
                .properties
                .iter()
                .map(|read| {
                    let rendered = match &read.outcome {
                        Ok(value) => value_to_json(value),
                        Err(error) => json!({ "error": error }),
                    };
                    (read.key(), rendered)
                })
                .collect();
            Ok::<_, ProxyError>(Readout { properties })
        };
        read.await.into()
    }

    pub async fn points(&self, device_address: &str, device_object_identifier: &str) -> Reply<Points> {
        let listed = async {
            let (address, device_id) = self.device(device_address, device_object_identifier)?;
            let readout = self.proxy.read_device_all(address, device_id).await?;
            Ok::<_, ProxyError>(Points {
                points: Point::from_readout(&readout).iter().map(PointRecord::from).collect(),
            })
        };
        listed.await.into()
    }

    fn address(&self, text: &str) -> Result<SocketAddr, ProxyError> {
        parse_device_address(text, self.proxy.config().device_port)
    }

    fn reference(
        &self,
        device_address: &str,
        object_identifier: &str,
        property_identifier: &str,
        array_index: Option<u32>,
    ) -> Result<PropertyReference, ProxyError> {
        let address = self.address(device_address)?;
        let object_id: ObjectId = object_identifier.parse()?;
        let property_id: PropertyId = property_identifier.parse()?;
        let reference = PropertyReference::new(address, object_id, property_id);
        Ok(match array_index {
            Some(index) => reference.with_array_index(index),
            None => reference,
        })
    }

    fn device(
        &self,
        device_address: &str,
        device_object_identifier: &str,
    ) -> Result<(SocketAddr, ObjectId), ProxyError> {
        let address = self.address(device_address)?;
        let device_id = match device_object_identifier.trim().parse::<u32>() {
            Ok(instance) => ObjectId::device(instance),
            Err(_) => device_object_identifier.parse()?,
        };
        Ok((address, device_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bacscan_core::types::{ObjectType, Segmentation};

    fn idle() -> ProxyService {
        ProxyService::default()
    }

    #[test]
    fn replies_carry_a_status_discriminator() {
        let done: Reply<Devices> = Ok::<_, ProxyError>(Devices { devices: vec![] }).into();
        assert_eq!(done.to_json(), json!({ "status": "done", "devices": [] }));

        let failed: Reply<Devices> = Err(ProxyError::NotRunning).into();
        assert_eq!(
            failed.to_json(),
            json!({ "status": "error", "error": ProxyError::NotRunning.to_string() })
        );
        assert_eq!(Reply::Done(Empty {}).to_json(), json!({ "status": "done" }));
    }

    #[test]
    fn device_records_use_client_field_names() {
        let device = DeviceAnnouncement {
            address: SocketAddr::from(([192, 168, 1, 20], 47808)),
            device_id: ObjectId::device(1234),
            max_apdu: 1476,
            segmentation: Segmentation::NoSegmentation,
            vendor_id: 15,
            object_name: Some("AHU-1".to_string()),
        };
        let record = DeviceRecord::new(&device, Some("192.168.1.0/24".to_string()));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "pduSource": "192.168.1.20:47808",
                "deviceIdentifier": "device:1234",
                "maxAPDULengthAccepted": 1476,
                "segmentationSupported": "no-segmentation",
                "vendorID": 15,
                "object-name": "AHU-1",
                "scanned_ip_target": "192.168.1.0/24",
                "device_instance": 1234,
            })
        );

        let unnamed = DeviceAnnouncement {
            object_name: None,
            ..device
        };
        let value = serde_json::to_value(DeviceRecord::new(&unnamed, None)).unwrap();
        assert!(value.get("object-name").is_none());
        assert!(value.get("scanned_ip_target").is_none());
    }

    #[test]
    fn control_requests_parse_from_json() {
        let request: ControlRequest =
            serde_json::from_str(r#"{"op":"scan","network":"10.0.0.0/24"}"#).unwrap();
        assert_eq!(
            request,
            ControlRequest::Scan {
                network: "10.0.0.0/24".to_string(),
                window_ms: None,
            }
        );
        let request: ControlRequest = serde_json::from_str(r#"{"op":"stop"}"#).unwrap();
        assert_eq!(request, ControlRequest::Stop);
        let request: ControlRequest = serde_json::from_str(
            r#"{"op":"write_property","device_address":"10.0.0.5","object_identifier":"analog-value:1",
                "property_identifier":"present-value","value":72.5,"priority":8}"#,
        )
        .unwrap();
        assert!(matches!(request, ControlRequest::WriteProperty { priority: Some(8), .. }));
    }

    #[tokio::test]
    async fn idle_service_reports_errors_without_panicking() {
        let service = idle();
        assert_eq!(service.stop().await.to_json(), json!({ "status": "done" }));

        let reply = service.read_property("10.0.0.5", "analog-input:1", "present-value", None).await;
        assert_eq!(reply, Reply::Error { error: ProxyError::NotRunning.to_string() });

        let reply = service.scan("10.0.0.0/33", None).await;
        assert!(!reply.is_done());

        let reply = service
            .write_property("10.0.0.5", "analog-value:1", "present-value", &json!(72), Some(0), None, None)
            .await;
        assert_eq!(reply, Reply::Error { error: ProxyError::InvalidPriority(0).to_string() });

        assert_eq!(service.devices().await.to_json(), json!({ "status": "done", "devices": [] }));
    }

    #[tokio::test]
    async fn malformed_lines_get_error_replies() {
        let service = idle();
        let reply = service.handle_line("{\"op\":\"launch\"}").await;
        assert_eq!(reply["status"], "error");
        let reply = service.handle_line("not json").await;
        assert_eq!(reply["status"], "error");
        let reply = service.handle_line(r#"{"op":"start","bind_address":"not-an-ip"}"#).await;
        assert_eq!(reply["status"], "error");
    }

    #[test]
    fn device_identifier_accepts_bare_instance() {
        let service = idle();
        let (address, device_id) = service.device("10.0.0.5", "77").unwrap();
        assert_eq!(address, SocketAddr::from(([10, 0, 0, 5], 47808)));
        assert_eq!(device_id, ObjectId::device(77));
        let (_, device_id) = service.device("10.0.0.5:47809", "device:78").unwrap();
        assert_eq!(device_id.object_type(), ObjectType::Device);
        assert!(service.device("10.0.0.5", "nonsense").is_err());
    }
}
