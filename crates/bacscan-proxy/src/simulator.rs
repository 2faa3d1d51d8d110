//! Lightweight simulated BACnet device.
//!
//! [`SimulatedDevice`] answers Who-Is, ReadProperty and WriteProperty over any
//! [`DataLink`]. Commandable objects keep a 16-slot priority array and derive
//! their present value from it. Used by the integration tests and the
//! `bacscan-simulator` binary.

use crate::ProxyError;
use bacscan_core::apdu::{
    AbortPdu, ApduType, ConfirmedRequestHeader, ErrorPdu, SimpleAck, UnconfirmedRequestHeader,
};
use bacscan_core::encoding::{reader::Reader, writer::Writer};
use bacscan_core::npdu::split_apdu;
use bacscan_core::npdu::Npdu;
use bacscan_core::services::{
    IAmRequest, ReadPropertyAck, ReadPropertyRequest, WhoIsRequest, WritePropertyRequest,
    SERVICE_READ_PROPERTY, SERVICE_WHO_IS, SERVICE_WRITE_PROPERTY,
};
use bacscan_core::types::{
    AbortReason, DataValue, ErrorClass, ErrorCode, ObjectId, ObjectType, PropertyId, Segmentation,
};
use bacscan_datalink::{DataLink, DataLinkAddress, DataLinkError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const PRIORITY_SLOTS: usize = 16;
const DEFAULT_WRITE_PRIORITY: u8 = 16;

type Properties = HashMap<PropertyId, DataValue>;

#[derive(Debug, Default)]
struct ObjectTable {
    order: Vec<ObjectId>,
    properties: HashMap<ObjectId, Properties>,
}

impl ObjectTable {
    fn insert(&mut self, id: ObjectId, properties: Properties) {
        if !self.properties.contains_key(&id) {
            self.order.push(id);
        }
        self.properties.insert(id, properties);
    }
}

/// A failed request, answered with an Error PDU.
type Refusal = (ErrorClass, ErrorCode);

/// A simulated BACnet device.
#[derive(Debug)]
pub struct SimulatedDevice<D: DataLink> {
    pub device_id: ObjectId,
    vendor_id: u32,
    max_apdu: usize,
    objects: Arc<RwLock<ObjectTable>>,
    datalink: D,
}

impl<D: DataLink> SimulatedDevice<D> {
    /// Creates a device with the given instance number. Its object name is
    /// `SimDevice-<instance>`.
    pub fn new(instance: u32, datalink: D) -> Self {
        let device_id = ObjectId::device(instance);
        let mut device = Properties::new();
        device.insert(PropertyId::ObjectIdentifier, DataValue::ObjectId(device_id));
        device.insert(
            PropertyId::ObjectName,
            DataValue::CharacterString(format!("SimDevice-{instance}")),
        );
        device.insert(
            PropertyId::ObjectType,
            DataValue::Enumerated(u32::from(ObjectType::Device.to_u16())),
        );
        device.insert(PropertyId::VendorName, DataValue::from("bacscan"));
        device.insert(PropertyId::VendorIdentifier, DataValue::Unsigned(0));
        device.insert(PropertyId::ModelName, DataValue::from("simulator"));
        device.insert(PropertyId::SystemStatus, DataValue::Enumerated(0));
        device.insert(PropertyId::ProtocolVersion, DataValue::Unsigned(1));
        device.insert(PropertyId::ProtocolRevision, DataValue::Unsigned(14));
        device.insert(PropertyId::MaxApduLengthAccepted, DataValue::Unsigned(1476));
        device.insert(
            PropertyId::SegmentationSupported,
            DataValue::Enumerated(Segmentation::NoSegmentation.to_u32()),
        );

        let mut objects = ObjectTable::default();
        objects.insert(device_id, device);

        Self {
            device_id,
            vendor_id: 0,
            max_apdu: 1476,
            objects: Arc::new(RwLock::new(objects)),
            datalink,
        }
    }

    pub fn with_vendor_id(mut self, vendor_id: u32) -> Self {
        self.vendor_id = vendor_id;
        self
    }

    /// Replies longer than `max_apdu` octets are answered with a
    /// segmentation-not-supported abort instead.
    pub fn with_max_apdu(mut self, max_apdu: usize) -> Self {
        self.max_apdu = max_apdu;
        self
    }

    /// Adds or replaces an object. Object identifier, name and type are
    /// filled in when missing.
    pub async fn add_object(&self, id: ObjectId, mut properties: Properties) {
        properties
            .entry(PropertyId::ObjectIdentifier)
            .or_insert(DataValue::ObjectId(id));
        properties
            .entry(PropertyId::ObjectName)
            .or_insert_with(|| DataValue::CharacterString(id.to_string()));
        properties
            .entry(PropertyId::ObjectType)
            .or_insert(DataValue::Enumerated(u32::from(id.object_type().to_u16())));
        self.objects.write().await.insert(id, properties);
    }

    /// Adds a commandable object with an empty priority array whose present
    /// value falls back to `relinquish_default`.
    pub async fn add_commandable(&self, id: ObjectId, name: &str, relinquish_default: DataValue) {
        let mut properties = Properties::new();
        properties.insert(PropertyId::ObjectName, DataValue::from(name));
        properties.insert(PropertyId::PresentValue, relinquish_default.clone());
        properties.insert(
            PropertyId::PriorityArray,
            DataValue::Array(vec![DataValue::Null; PRIORITY_SLOTS]),
        );
        properties.insert(PropertyId::RelinquishDefault, relinquish_default);
        properties.insert(PropertyId::OutOfService, DataValue::Boolean(false));
        self.add_object(id, properties).await;
    }

    /// Current value of a property, as a read would return it.
    pub async fn property(&self, id: ObjectId, property_id: PropertyId) -> Option<DataValue> {
        self.read(id, property_id, None).await.ok()
    }

    /// Answers requests until the data link fails.
    pub async fn run(&self) -> Result<(), ProxyError> {
        let mut buf = [0u8; 1600];
        loop {
            let (n, source) = match self.datalink.recv(&mut buf).await {
                Ok(received) => received,
                Err(DataLinkError::InvalidFrame | DataLinkError::UnsupportedBvlcFunction(_)) => {
                    continue
                }
                Err(err) => return Err(err.into()),
            };
            if let Err(err) = self.handle_frame(&buf[..n], source).await {
                log::debug!("simulator {}: error handling frame from {source}: {err}", self.device_id);
            }
        }
    }

    async fn handle_frame(&self, frame: &[u8], source: DataLinkAddress) -> Result<(), ProxyError> {
        let (npdu, apdu) = split_apdu(frame)?;
        if npdu.network_message.is_some() {
            return Ok(());
        }
        let mut r = Reader::new(apdu);

        match ApduType::of(apdu) {
            Some(ApduType::UnconfirmedRequest) => {
                let header = UnconfirmedRequestHeader::decode(&mut r)?;
                if header.service_choice == SERVICE_WHO_IS {
                    let who_is = WhoIsRequest::decode_after_header(&mut r)?;
                    if who_is.matches(self.device_id.instance()) {
                        self.send_i_am(source).await?;
                    }
                }
            }
            Some(ApduType::ConfirmedRequest) => {
                let header = ConfirmedRequestHeader::decode(&mut r)?;
                match header.service_choice {
                    SERVICE_READ_PROPERTY => {
                        let request = ReadPropertyRequest::decode_after_header(&mut r, header.invoke_id)?;
                        self.answer_read(request, source).await?;
                    }
                    SERVICE_WRITE_PROPERTY => {
                        let request =
                            WritePropertyRequest::decode_after_header(&mut r, header.invoke_id)?;
                        self.answer_write(request, source).await?;
                    }
                    other => log::debug!("simulator: ignoring confirmed service {other}"),
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn send_i_am(&self, target: DataLinkAddress) -> Result<(), ProxyError> {
        let i_am = IAmRequest {
            device_id: self.device_id,
            max_apdu: 1476,
            segmentation: Segmentation::NoSegmentation,
            vendor_id: self.vendor_id,
        };
        let mut w = Writer::new();
        Npdu::local().encode(&mut w)?;
        i_am.encode(&mut w)?;
        self.reply(target, w).await
    }

    async fn answer_read(
        &self,
        request: ReadPropertyRequest,
        source: DataLinkAddress,
    ) -> Result<(), ProxyError> {
        let invoke_id = request.invoke_id;
        let value = match self
            .read(request.object_id, request.property_id, request.array_index)
            .await
        {
            Ok(value) => value,
            Err(refusal) => {
                return self
                    .refuse(source, invoke_id, SERVICE_READ_PROPERTY, refusal)
                    .await
            }
        };

        let ack = ReadPropertyAck {
            object_id: request.object_id,
            property_id: request.property_id,
            array_index: request.array_index,
            value,
        };
        let mut w = Writer::new();
        Npdu::local().encode(&mut w)?;
        let npdu_len = w.len();
        let fits = ack.encode(&mut w, invoke_id).is_ok() && w.len() - npdu_len <= self.max_apdu;
        if !fits {
            let mut w = Writer::new();
            Npdu::local().encode(&mut w)?;
            AbortPdu {
                server: true,
                invoke_id,
                reason: AbortReason::SegmentationNotSupported.to_u8(),
            }
            .encode(&mut w)?;
            return self.reply(source, w).await;
        }
        self.reply(source, w).await
    }

    async fn answer_write(
        &self,
        request: WritePropertyRequest,
        source: DataLinkAddress,
    ) -> Result<(), ProxyError> {
        let invoke_id = request.invoke_id;
        if let Err(refusal) = self.write(request).await {
            return self
                .refuse(source, invoke_id, SERVICE_WRITE_PROPERTY, refusal)
                .await;
        }
        let mut w = Writer::new();
        Npdu::local().encode(&mut w)?;
        SimpleAck {
            invoke_id,
            service_choice: SERVICE_WRITE_PROPERTY,
        }
        .encode(&mut w)?;
        self.reply(source, w).await
    }

    async fn refuse(
        &self,
        target: DataLinkAddress,
        invoke_id: u8,
        service_choice: u8,
        (class, code): Refusal,
    ) -> Result<(), ProxyError> {
        let mut w = Writer::new();
        Npdu::local().encode(&mut w)?;
        ErrorPdu {
            invoke_id,
            service_choice,
            error_class: Some(class.to_u32()),
            error_code: Some(code.to_u32()),
        }
        .encode(&mut w)?;
        self.reply(target, w).await
    }

    async fn reply(&self, target: DataLinkAddress, w: Writer) -> Result<(), ProxyError> {
        self.datalink.send(target, w.as_written()).await?;
        Ok(())
    }

    async fn read(
        &self,
        id: ObjectId,
        property_id: PropertyId,
        array_index: Option<u32>,
    ) -> Result<DataValue, Refusal> {
        let objects = self.objects.read().await;
        let properties = objects
            .properties
            .get(&id)
            .ok_or((ErrorClass::Object, ErrorCode::UnknownObject))?;
        let value = if id == self.device_id && property_id == PropertyId::ObjectList {
            DataValue::Array(objects.order.iter().copied().map(DataValue::ObjectId).collect())
        } else {
            properties
                .get(&property_id)
                .cloned()
                .ok_or((ErrorClass::Property, ErrorCode::UnknownProperty))?
        };

        let Some(index) = array_index else {
            return Ok(value);
        };
        let DataValue::Array(items) = value else {
            return Err((ErrorClass::Property, ErrorCode::PropertyIsNotAnArray));
        };
        match index {
            0 => Ok(DataValue::Unsigned(items.len() as u32)),
            n => items
                .into_iter()
                .nth(n as usize - 1)
                .ok_or((ErrorClass::Property, ErrorCode::InvalidArrayIndex)),
        }
    }

    async fn write(&self, request: WritePropertyRequest) -> Result<(), Refusal> {
        let mut objects = self.objects.write().await;
        let properties = objects
            .properties
            .get_mut(&request.object_id)
            .ok_or((ErrorClass::Object, ErrorCode::UnknownObject))?;
        if !properties.contains_key(&request.property_id) {
            return Err((ErrorClass::Property, ErrorCode::UnknownProperty));
        }
        if matches!(
            request.property_id,
            PropertyId::ObjectIdentifier | PropertyId::ObjectType | PropertyId::PriorityArray
        ) || request.array_index.is_some()
        {
            return Err((ErrorClass::Property, ErrorCode::WriteAccessDenied));
        }

        let commanded = request.property_id == PropertyId::PresentValue
            && properties.contains_key(&PropertyId::PriorityArray);
        if !commanded {
            if request.value.is_null() {
                return Err((ErrorClass::Property, ErrorCode::InvalidDataType));
            }
            properties.insert(request.property_id, request.value);
            return Ok(());
        }

        let priority = request.priority.unwrap_or(DEFAULT_WRITE_PRIORITY);
        if !(1..=16).contains(&priority) {
            return Err((ErrorClass::Property, ErrorCode::ValueOutOfRange));
        }
        if let Some(DataValue::Array(slots)) = properties.get_mut(&PropertyId::PriorityArray) {
            if let Some(slot) = slots.get_mut(usize::from(priority) - 1) {
                *slot = request.value;
            }
        }
        let present = effective_value(properties);
        properties.insert(PropertyId::PresentValue, present);
        Ok(())
    }
}

/// Highest-priority commanded value, else the relinquish default.
fn effective_value(properties: &Properties) -> DataValue {
    let commanded = match properties.get(&PropertyId::PriorityArray) {
        Some(DataValue::Array(slots)) => slots.iter().find(|slot| !slot.is_null()).cloned(),
        _ => None,
    };
    commanded
        .or_else(|| properties.get(&PropertyId::RelinquishDefault).cloned())
        .unwrap_or(DataValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bacscan_core::apdu::ComplexAckHeader;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockDataLink {
        sent: Arc<Mutex<Vec<(DataLinkAddress, Vec<u8>)>>>,
    }

    impl DataLink for MockDataLink {
        async fn send(&self, address: DataLinkAddress, payload: &[u8]) -> Result<(), DataLinkError> {
            self.sent
                .lock()
                .expect("poisoned lock")
                .push((address, payload.to_vec()));
            Ok(())
        }

        async fn recv(&self, _buf: &mut [u8]) -> Result<(usize, DataLinkAddress), DataLinkError> {
            std::future::pending().await
        }
    }

    fn source() -> DataLinkAddress {
        DataLinkAddress::Ip("127.0.0.1:47808".parse().unwrap())
    }

    fn frame(encode: impl FnOnce(&mut Writer)) -> Vec<u8> {
        let mut w = Writer::new();
        Npdu::expecting_reply().encode(&mut w).unwrap();
        encode(&mut w);
        w.into_bytes()
    }

    fn last_apdu(sent: &Arc<Mutex<Vec<(DataLinkAddress, Vec<u8>)>>>) -> Vec<u8> {
        let sent = sent.lock().unwrap();
        let (_, frame) = sent.last().unwrap();
        split_apdu(frame).unwrap().1.to_vec()
    }

    async fn read(sim: &SimulatedDevice<MockDataLink>, object_id: ObjectId, property_id: PropertyId, array_index: Option<u32>) {
        let request = ReadPropertyRequest {
            object_id,
            property_id,
            array_index,
            invoke_id: 4,
        };
        let bytes = frame(|w| request.encode(w).unwrap());
        sim.handle_frame(&bytes, source()).await.unwrap();
    }

    fn decode_ack(apdu: &[u8]) -> ReadPropertyAck {
        let mut r = Reader::new(apdu);
        let header = ComplexAckHeader::decode(&mut r).unwrap();
        assert_eq!(header.invoke_id, 4);
        ReadPropertyAck::decode_after_header(&mut r).unwrap()
    }

    #[tokio::test]
    async fn who_is_outside_range_is_ignored() {
        let dl = MockDataLink::default();
        let sent = dl.sent.clone();
        let sim = SimulatedDevice::new(50, dl);

        let bytes = frame(|w| WhoIsRequest::range(1, 10).encode(w).unwrap());
        sim.handle_frame(&bytes, source()).await.unwrap();
        assert!(sent.lock().unwrap().is_empty());

        let bytes = frame(|w| WhoIsRequest::range(50, 50).encode(w).unwrap());
        sim.handle_frame(&bytes, source()).await.unwrap();
        let apdu = last_apdu(&sent);
        let mut r = Reader::new(&apdu);
        UnconfirmedRequestHeader::decode(&mut r).unwrap();
        let i_am = IAmRequest::decode_after_header(&mut r).unwrap();
        assert_eq!(i_am.device_id, ObjectId::device(50));
    }

    #[tokio::test]
    async fn object_list_reads_whole_and_by_index() {
        let dl = MockDataLink::default();
        let sent = dl.sent.clone();
        let sim = SimulatedDevice::new(1, dl);
        let ai = ObjectId::new(ObjectType::AnalogInput, 1);
        sim.add_object(ai, Properties::new()).await;

        read(&sim, sim.device_id, PropertyId::ObjectList, None).await;
        let ack = decode_ack(&last_apdu(&sent));
        assert_eq!(
            ack.value,
            DataValue::Array(vec![DataValue::ObjectId(sim.device_id), DataValue::ObjectId(ai)])
        );

        read(&sim, sim.device_id, PropertyId::ObjectList, Some(0)).await;
        assert_eq!(decode_ack(&last_apdu(&sent)).value, DataValue::Unsigned(2));

        read(&sim, sim.device_id, PropertyId::ObjectList, Some(2)).await;
        assert_eq!(decode_ack(&last_apdu(&sent)).value, DataValue::ObjectId(ai));
    }

    #[tokio::test]
    async fn unknown_object_and_property_are_refused() {
        let dl = MockDataLink::default();
        let sent = dl.sent.clone();
        let sim = SimulatedDevice::new(1, dl);

        read(&sim, ObjectId::new(ObjectType::AnalogInput, 9), PropertyId::PresentValue, None).await;
        let error = ErrorPdu::decode(&mut Reader::new(&last_apdu(&sent))).unwrap();
        assert_eq!((error.error_class, error.error_code), (Some(1), Some(31)));

        read(&sim, sim.device_id, PropertyId::Units, None).await;
        let error = ErrorPdu::decode(&mut Reader::new(&last_apdu(&sent))).unwrap();
        assert_eq!((error.error_class, error.error_code), (Some(2), Some(32)));
    }

    #[tokio::test]
    async fn oversized_reply_aborts() {
        let dl = MockDataLink::default();
        let sent = dl.sent.clone();
        let sim = SimulatedDevice::new(1, dl).with_max_apdu(50);
        for instance in 0..20 {
            sim.add_object(ObjectId::new(ObjectType::BinaryInput, instance), Properties::new())
                .await;
        }

        read(&sim, sim.device_id, PropertyId::ObjectList, None).await;
        let abort = AbortPdu::decode(&mut Reader::new(&last_apdu(&sent))).unwrap();
        assert!(abort.server);
        assert_eq!(abort.reason, AbortReason::SegmentationNotSupported.to_u8());
    }

    #[tokio::test]
    async fn priority_array_drives_present_value() {
        let dl = MockDataLink::default();
        let sent = dl.sent.clone();
        let sim = SimulatedDevice::new(1, dl);
        let av = ObjectId::new(ObjectType::AnalogValue, 1);
        sim.add_commandable(av, "Setpoint", DataValue::Real(20.0)).await;

        let write = |value: DataValue, priority: u8| {
            let request = WritePropertyRequest {
                object_id: av,
                property_id: PropertyId::PresentValue,
                array_index: None,
                value,
                priority: Some(priority),
                invoke_id: 7,
            };
            frame(|w| request.encode(w).unwrap())
        };

        sim.handle_frame(&write(DataValue::Real(22.5), 8), source()).await.unwrap();
        let ack = SimpleAck::decode(&mut Reader::new(&last_apdu(&sent))).unwrap();
        assert_eq!(ack.invoke_id, 7);
        sim.handle_frame(&write(DataValue::Real(18.0), 12), source()).await.unwrap();
        assert_eq!(sim.property(av, PropertyId::PresentValue).await, Some(DataValue::Real(22.5)));

        sim.handle_frame(&write(DataValue::Null, 8), source()).await.unwrap();
        assert_eq!(sim.property(av, PropertyId::PresentValue).await, Some(DataValue::Real(18.0)));

        sim.handle_frame(&write(DataValue::Null, 12), source()).await.unwrap();
        assert_eq!(sim.property(av, PropertyId::PresentValue).await, Some(DataValue::Real(20.0)));
        let slots = sim.property(av, PropertyId::PriorityArray).await.unwrap();
        assert!(slots.elements().iter().all(DataValue::is_null));
    }
}
