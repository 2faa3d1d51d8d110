//! Point-to-point ReadProperty / WriteProperty exchanges.

use crate::endpoint::Endpoint;
use crate::{Proxy, ProxyError, RemoteRejection};
use bacscan_core::apdu::{AbortPdu, ApduType, ComplexAckHeader, ErrorPdu, RejectPdu, SimpleAck};
use bacscan_core::encoding::{reader::Reader, writer::Writer};
use bacscan_core::npdu::Npdu;
use bacscan_core::services::{
    ReadPropertyAck, ReadPropertyRequest, WritePropertyRequest, SERVICE_READ_PROPERTY,
    SERVICE_WRITE_PROPERTY,
};
use bacscan_core::types::{
    AbortReason, DataValue, ErrorClass, ErrorCode, ObjectId, ObjectType, PropertyId, RejectReason,
};
use bacscan_core::EncodeError;
use bacscan_datalink::{DataLink, DataLinkAddress};
use std::fmt;
use std::net::SocketAddr;
use tokio::time::timeout;

/// One property of one object on one device, optionally a single array
/// element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyReference {
    pub address: SocketAddr,
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
}

impl PropertyReference {
    pub fn new(address: SocketAddr, object_id: ObjectId, property_id: PropertyId) -> Self {
        Self {
            address,
            object_id,
            property_id,
            array_index: None,
        }
    }

    pub fn with_array_index(mut self, index: u32) -> Self {
        self.array_index = Some(index);
        self
    }
}

impl fmt::Display for PropertyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.address, self.object_id, self.property_id)?;
        if let Some(index) = self.array_index {
            write!(f, "[{index}]")?;
        }
        Ok(())
    }
}

/// Command priority for a write, 1 (highest) to 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    pub const HIGHEST: Self = Self(1);
    pub const LOWEST: Self = Self(16);

    pub fn new(level: u8) -> Result<Self, ProxyError> {
        if (1..=16).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ProxyError::InvalidPriority(level))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Priority {
    type Error = ProxyError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

/// Result of reading every object on a device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReadout {
    pub address: SocketAddr,
    pub device_id: ObjectId,
    /// Objects in object-list order.
    pub objects: Vec<ObjectId>,
    /// One entry per property read, in read order. A failed read carries
    /// the rendered error.
    pub properties: Vec<PropertyRead>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRead {
    pub object_id: ObjectId,
    pub property_id: PropertyId,
    pub outcome: Result<DataValue, String>,
}

impl PropertyRead {
    /// Key used in rendered readouts: `analog-input:1/present-value`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.object_id, self.property_id)
    }
}

impl DeviceReadout {
    pub fn value(&self, object_id: ObjectId, property_id: PropertyId) -> Option<&DataValue> {
        self.properties
            .iter()
            .find(|read| read.object_id == object_id && read.property_id == property_id)
            .and_then(|read| read.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &PropertyRead> {
        self.properties.iter().filter(|read| read.outcome.is_err())
    }
}

/// Properties read for each object by [`Proxy::read_device_all`].
pub fn properties_of_interest(object_type: ObjectType) -> Vec<PropertyId> {
    use PropertyId as P;

    if object_type == ObjectType::Device {
        return vec![
            P::ObjectName,
            P::VendorName,
            P::VendorIdentifier,
            P::ModelName,
            P::FirmwareRevision,
            P::ApplicationSoftwareVersion,
            P::Description,
            P::Location,
            P::SystemStatus,
            P::ProtocolVersion,
            P::ProtocolRevision,
            P::MaxApduLengthAccepted,
            P::SegmentationSupported,
            P::DatabaseRevision,
        ];
    }

    let mut properties = vec![P::ObjectName, P::Description, P::PresentValue, P::StatusFlags];
    match object_type {
        ObjectType::AnalogInput | ObjectType::AnalogOutput | ObjectType::AnalogValue => {
            properties.push(P::Units)
        }
        ObjectType::BinaryInput | ObjectType::BinaryOutput | ObjectType::BinaryValue => {
            properties.extend([P::ActiveText, P::InactiveText])
        }
        ObjectType::MultiStateInput
        | ObjectType::MultiStateOutput
        | ObjectType::MultiStateValue => properties.extend([P::NumberOfStates, P::StateText]),
        _ => {}
    }
    if object_type.is_commandable() {
        properties.extend([P::PriorityArray, P::RelinquishDefault]);
    }
    properties.push(P::OutOfService);
    properties
}

impl<D: DataLink> Proxy<D> {
    /// Reads one property. Timeouts are retried up to
    /// [`ProxyConfig::read_retries`](crate::ProxyConfig::read_retries) times.
    pub async fn read_property(&self, reference: &PropertyReference) -> Result<DataValue, ProxyError> {
        self.live().await?.read_value(reference).await
    }

    /// Writes one property, at `priority` when given.
    ///
    /// The write is sent once and never retried. A [`ProxyError::Timeout`]
    /// does not mean the device ignored it: the acknowledgement may have been
    /// lost after the value was applied. Re-read the property when the
    /// outcome matters.
    pub async fn write_property(
        &self,
        reference: &PropertyReference,
        value: DataValue,
        priority: Option<u8>,
    ) -> Result<(), ProxyError> {
        let priority = priority.map(Priority::new).transpose()?;
        self.live().await?.write_value(reference, value, priority).await
    }

    /// Reads the device's object list and then [`properties_of_interest`]
    /// for every object. Individual property failures are recorded in the
    /// readout; only failing to obtain the object list, or the proxy going
    /// away, fails the call.
    pub async fn read_device_all(
        &self,
        address: SocketAddr,
        device_id: ObjectId,
    ) -> Result<DeviceReadout, ProxyError> {
        let endpoint = self.live().await?;
        let mut objects = endpoint.read_object_list(address, device_id).await?;
        if !objects.contains(&device_id) {
            objects.insert(0, device_id);
        }

        let mut properties = Vec::new();
        for &object_id in &objects {
            for property_id in properties_of_interest(object_id.object_type()) {
                let reference = PropertyReference::new(address, object_id, property_id);
                let outcome = match endpoint.read_value(&reference).await {
                    Ok(value) => Ok(value),
                    Err(err @ (ProxyError::Stopped | ProxyError::NotRunning)) => return Err(err),
                    Err(err) => {
                        log::debug!("{reference}: {err}");
                        Err(err.to_string())
                    }
                };
                properties.push(PropertyRead {
                    object_id,
                    property_id,
                    outcome,
                });
            }
        }

        Ok(DeviceReadout {
            address,
            device_id,
            objects,
            properties,
        })
    }
}

impl<D: DataLink> Endpoint<D> {
    pub(crate) async fn read_value(&self, reference: &PropertyReference) -> Result<DataValue, ProxyError> {
        let mut attempt = 0;
        loop {
            match self.read_once(reference).await {
                Err(ProxyError::Timeout) if attempt < self.config().read_retries => {
                    attempt += 1;
                    log::debug!("{reference}: timed out, retry {attempt}");
                }
                result => return result,
            }
        }
    }

    async fn read_once(&self, reference: &PropertyReference) -> Result<DataValue, ProxyError> {
        let payload = self
            .confirmed_exchange(reference.address, SERVICE_READ_PROPERTY, |w, invoke_id| {
                ReadPropertyRequest {
                    object_id: reference.object_id,
                    property_id: reference.property_id,
                    array_index: reference.array_index,
                    invoke_id,
                }
                .encode(w)
            })
            .await?;
        let ack = ReadPropertyAck::decode_after_header(&mut Reader::new(&payload))?;
        if ack.object_id != reference.object_id || ack.property_id != reference.property_id {
            log::debug!(
                "{reference}: ack names {} {} instead",
                ack.object_id,
                ack.property_id
            );
        }
        Ok(ack.value)
    }

    pub(crate) async fn write_value(
        &self,
        reference: &PropertyReference,
        value: DataValue,
        priority: Option<Priority>,
    ) -> Result<(), ProxyError> {
        let mut request = WritePropertyRequest {
            object_id: reference.object_id,
            property_id: reference.property_id,
            array_index: reference.array_index,
            value,
            priority: priority.map(Priority::get),
            invoke_id: 0,
        };
        self.confirmed_exchange(reference.address, SERVICE_WRITE_PROPERTY, move |w, invoke_id| {
            request.invoke_id = invoke_id;
            request.encode(w)
        })
        .await?;
        Ok(())
    }

    /// Reads an object list whole, or element by element when the device
    /// refuses the whole-list read.
    async fn read_object_list(
        &self,
        address: SocketAddr,
        device_id: ObjectId,
    ) -> Result<Vec<ObjectId>, ProxyError> {
        let whole = PropertyReference::new(address, device_id, PropertyId::ObjectList);
        match self.read_value(&whole).await {
            Ok(value) => object_ids(&value),
            Err(ProxyError::RemoteRejected(rejection)) if rejection.suggests_element_reads() => {
                log::debug!("{whole}: {rejection}, reading element by element");
                self.read_object_list_by_index(whole).await
            }
            Err(ProxyError::UnsupportedResponse) => {
                log::debug!("{whole}: segmented reply, reading element by element");
                self.read_object_list_by_index(whole).await
            }
            Err(err) => Err(err),
        }
    }

    async fn read_object_list_by_index(
        &self,
        whole: PropertyReference,
    ) -> Result<Vec<ObjectId>, ProxyError> {
        let limit = self.config().max_object_list_len;
        let count = match self.read_value(&whole.with_array_index(0)).await? {
            DataValue::Unsigned(count) if count <= limit => count,
            DataValue::Unsigned(count) => {
                log::warn!("{whole}: device reports {count} objects, limit is {limit}");
                return Err(ProxyError::UnsupportedResponse);
            }
            _ => return Err(ProxyError::UnsupportedResponse),
        };
        let mut objects = Vec::with_capacity(count as usize);
        for index in 1..=count {
            let element = self.read_value(&whole.with_array_index(index)).await?;
            objects.push(element.as_object_id().ok_or(ProxyError::UnsupportedResponse)?);
        }
        Ok(objects)
    }

    /// Sends one confirmed request and waits for its reply. Returns the
    /// service payload of a ComplexAck, empty for a SimpleAck.
    async fn confirmed_exchange<F>(
        &self,
        address: SocketAddr,
        service_choice: u8,
        encode: F,
    ) -> Result<Vec<u8>, ProxyError>
    where
        F: FnOnce(&mut Writer, u8) -> Result<(), EncodeError>,
    {
        let peer = DataLinkAddress::Ip(address);
        let (exchange, reply) = self.waiters.register_exchange(peer)?;
        let invoke_id = exchange.invoke_id();

        let mut w = Writer::new();
        Npdu::expecting_reply().encode(&mut w)?;
        encode(&mut w, invoke_id)?;
        self.send(peer, w.as_written()).await?;
        log::debug!("sent service {service_choice} to {peer} with invoke id {invoke_id}");

        let apdu = match timeout(self.config().response_timeout, reply).await {
            Ok(Ok(apdu)) => apdu,
            Ok(Err(_)) => return Err(ProxyError::Stopped),
            Err(_) => return Err(ProxyError::Timeout),
        };
        drop(exchange);
        reply_payload(&apdu, service_choice).map(<[u8]>::to_vec)
    }
}

fn reply_payload(apdu: &[u8], service_choice: u8) -> Result<&[u8], ProxyError> {
    let mut r = Reader::new(apdu);
    match ApduType::of(apdu) {
        Some(ApduType::ComplexAck) => {
            let header = ComplexAckHeader::decode(&mut r)?;
            if header.segment.is_some() || header.service_choice != service_choice {
                return Err(ProxyError::UnsupportedResponse);
            }
            Ok(r.rest())
        }
        Some(ApduType::SimpleAck) => {
            let ack = SimpleAck::decode(&mut r)?;
            if ack.service_choice != service_choice {
                return Err(ProxyError::UnsupportedResponse);
            }
            Ok(&[])
        }
        Some(ApduType::Error) => Err(remote_service_error(ErrorPdu::decode(&mut r)?).into()),
        Some(ApduType::Reject) => {
            let reject = RejectPdu::decode(&mut r)?;
            Err(RemoteRejection::Reject {
                reason: RejectReason::from_u8(reject.reason),
            }
            .into())
        }
        Some(ApduType::Abort) => {
            let abort = AbortPdu::decode(&mut r)?;
            Err(RemoteRejection::Abort {
                reason: AbortReason::from_u8(abort.reason),
                server: abort.server,
            }
            .into())
        }
        _ => Err(ProxyError::UnsupportedResponse),
    }
}

fn remote_service_error(err: ErrorPdu) -> RemoteRejection {
    RemoteRejection::Error {
        service_choice: err.service_choice,
        class: err.error_class.map(ErrorClass::from_u32),
        code: err.error_code.map(ErrorCode::from_u32),
    }
}

fn object_ids(value: &DataValue) -> Result<Vec<ObjectId>, ProxyError> {
    value
        .elements()
        .iter()
        .map(DataValue::as_object_id)
        .collect::<Option<Vec<_>>>()
        .ok_or(ProxyError::UnsupportedResponse)
}
