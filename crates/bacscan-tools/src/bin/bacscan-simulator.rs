use bacscan_core::types::{DataValue, ObjectId, ObjectType, PropertyId};
use bacscan_datalink::BacnetIpTransport;
use bacscan_proxy::SimulatedDevice;
use clap::Parser;
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};

// Engineering units: degrees Celsius.
const DEGREES_CELSIUS: u32 = 62;

#[derive(Parser, Debug)]
#[command(name = "bacscan-simulator", about = "Answer Who-Is and property requests as a fake device")]
struct Args {
    /// Device instance number.
    #[arg(long, default_value_t = 9999)]
    instance: u32,
    /// Address to bind.
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    bind: Ipv4Addr,
    #[arg(long, default_value_t = 47808)]
    port: u16,
    #[arg(long, default_value_t = 260)]
    vendor_id: u32,
    /// Largest reply the device sends before aborting.
    #[arg(long, default_value_t = 1476)]
    max_apdu: usize,
    /// Number of analog-input objects to create.
    #[arg(long, default_value_t = 3)]
    analog_inputs: u32,
    /// Number of binary-input objects to create.
    #[arg(long, default_value_t = 2)]
    binary_inputs: u32,
    /// Number of commandable analog-value objects to create.
    #[arg(long, default_value_t = 2)]
    analog_values: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let transport = BacnetIpTransport::bind(SocketAddr::from((args.bind, args.port))).await?;
    let local = transport.local_addr()?;
    let sim = SimulatedDevice::new(args.instance, transport)
        .with_vendor_id(args.vendor_id)
        .with_max_apdu(args.max_apdu);

    for i in 0..args.analog_inputs {
        let mut props = HashMap::new();
        props.insert(PropertyId::ObjectName, DataValue::from(format!("AI-{i}")));
        props.insert(PropertyId::PresentValue, DataValue::Real(20.0 + i as f32));
        props.insert(PropertyId::Units, DataValue::Enumerated(DEGREES_CELSIUS));
        sim.add_object(ObjectId::new(ObjectType::AnalogInput, i), props)
            .await;
    }

    for i in 0..args.binary_inputs {
        let mut props = HashMap::new();
        props.insert(PropertyId::ObjectName, DataValue::from(format!("BI-{i}")));
        props.insert(PropertyId::PresentValue, DataValue::Enumerated(0));
        sim.add_object(ObjectId::new(ObjectType::BinaryInput, i), props)
            .await;
    }

    for i in 0..args.analog_values {
        sim.add_commandable(
            ObjectId::new(ObjectType::AnalogValue, i),
            &format!("AV-{i}"),
            DataValue::Real(0.0),
        )
        .await;
    }

    println!(
        "Simulated device {} on {local} ({} AI, {} BI, {} AV). Ctrl+C to stop.",
        args.instance, args.analog_inputs, args.binary_inputs, args.analog_values
    );
    sim.run().await?;
    Ok(())
}
