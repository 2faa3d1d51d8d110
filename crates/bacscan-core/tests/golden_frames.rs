use bacscan_core::apdu::{
    reply_invoke_id, ApduType, ComplexAckHeader, ConfirmedRequestHeader, ErrorPdu,
    UnconfirmedRequestHeader,
};
use bacscan_core::encoding::{reader::Reader, writer::Writer};
use bacscan_core::npdu::{split_apdu, Npdu};
use bacscan_core::services::{
    IAmRequest, ReadPropertyAck, ReadPropertyRequest, WhoIsRequest, WritePropertyRequest,
    SERVICE_I_AM, SERVICE_READ_PROPERTY,
};
use bacscan_core::types::{
    DataValue, ErrorClass, ErrorCode, ObjectId, ObjectType, PropertyId, Segmentation,
};

#[test]
fn who_is_global_frame_matches_fixture() {
    let mut w = Writer::new();
    Npdu::local().encode(&mut w).unwrap();
    WhoIsRequest::global().encode(&mut w).unwrap();

    assert_eq!(w.as_written(), &[0x01, 0x00, 0x10, 0x08]);
}

#[test]
fn who_is_range_frame_matches_fixture() {
    let mut w = Writer::new();
    Npdu::local().encode(&mut w).unwrap();
    WhoIsRequest::range(1, 10).encode(&mut w).unwrap();

    assert_eq!(w.as_written(), &[0x01, 0x00, 0x10, 0x08, 0x09, 0x01, 0x19, 0x0A]);
}

#[test]
fn read_property_frame_matches_fixture() {
    let mut w = Writer::new();
    Npdu::expecting_reply().encode(&mut w).unwrap();
    ReadPropertyRequest {
        object_id: ObjectId::new(ObjectType::Device, 123),
        property_id: PropertyId::ObjectName,
        array_index: None,
        invoke_id: 1,
    }
    .encode(&mut w)
    .unwrap();

    assert_eq!(
        w.as_written(),
        &[0x01, 0x04, 0x00, 0x05, 0x01, 0x0C, 0x0C, 0x02, 0x00, 0x00, 0x7B, 0x19, 0x4D]
    );
}

#[test]
fn relinquish_frame_matches_fixture() {
    let mut w = Writer::new();
    Npdu::expecting_reply().encode(&mut w).unwrap();
    WritePropertyRequest {
        object_id: ObjectId::new(ObjectType::BinaryOutput, 3),
        property_id: PropertyId::PresentValue,
        array_index: None,
        value: DataValue::Null,
        priority: Some(8),
        invoke_id: 7,
    }
    .encode(&mut w)
    .unwrap();

    assert_eq!(
        w.as_written(),
        &[
            0x01, 0x04, 0x00, 0x05, 0x07, 0x0F, 0x0C, 0x01, 0x00, 0x00, 0x03, 0x19, 0x55, 0x3E,
            0x00, 0x3F, 0x49, 0x08
        ]
    );
}

#[test]
fn captured_i_am_decodes() {
    // I-Am from device 260001, vendor 15, no segmentation.
    let frame = [
        0x01, 0x00, 0x10, 0x00, 0xC4, 0x02, 0x03, 0xF7, 0xA1, 0x22, 0x01, 0xE0, 0x91, 0x03, 0x21,
        0x0F,
    ];
    let (_, apdu) = split_apdu(&frame).unwrap();
    let mut r = Reader::new(apdu);
    let header = UnconfirmedRequestHeader::decode(&mut r).unwrap();
    assert_eq!(header.service_choice, SERVICE_I_AM);

    let i_am = IAmRequest::decode_after_header(&mut r).unwrap();
    assert_eq!(i_am.device_id, ObjectId::device(260_001));
    assert_eq!(i_am.max_apdu, 480);
    assert_eq!(i_am.segmentation, Segmentation::NoSegmentation);
    assert_eq!(i_am.vendor_id, 15);
}

#[test]
fn routed_read_property_ack_decodes() {
    // Ack relayed by a router: source specifier SNET 5 / SLEN 1 / SADR 0x11.
    let frame = [
        0x01, 0x08, 0x00, 0x05, 0x01, 0x11, 0x30, 0x2A, 0x0C, 0x0C, 0x00, 0x00, 0x00, 0x02, 0x19,
        0x55, 0x3E, 0x44, 0x41, 0xB4, 0x00, 0x00, 0x3F,
    ];
    let (npdu, apdu) = split_apdu(&frame).unwrap();
    assert_eq!(npdu.source.map(|s| s.network), Some(5));
    assert_eq!(ApduType::of(apdu), Some(ApduType::ComplexAck));
    assert_eq!(reply_invoke_id(apdu), Some(0x2A));

    let mut r = Reader::new(apdu);
    let header = ComplexAckHeader::decode(&mut r).unwrap();
    assert_eq!(header.service_choice, SERVICE_READ_PROPERTY);
    let ack = ReadPropertyAck::decode_after_header(&mut r).unwrap();
    assert_eq!(ack.object_id, ObjectId::new(ObjectType::AnalogInput, 2));
    assert_eq!(ack.value, DataValue::Real(22.5));
}

#[test]
fn unknown_object_error_decodes() {
    let frame = [0x01, 0x00, 0x50, 0x01, 0x0C, 0x91, 0x01, 0x91, 0x1F];
    let (_, apdu) = split_apdu(&frame).unwrap();
    let error = ErrorPdu::decode(&mut Reader::new(apdu)).unwrap();
    assert_eq!(error.error_class.map(ErrorClass::from_u32), Some(ErrorClass::Object));
    assert_eq!(error.error_code.map(ErrorCode::from_u32), Some(ErrorCode::UnknownObject));
}

#[test]
fn confirmed_header_never_asks_for_segmentation() {
    let mut w = Writer::new();
    ConfirmedRequestHeader::unsegmented(200, SERVICE_READ_PROPERTY)
        .encode(&mut w)
        .unwrap();
    assert_eq!(w.as_written(), &[0x00, 0x05, 200, 0x0C]);
}
