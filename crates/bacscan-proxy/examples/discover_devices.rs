//! Discover BACnet devices on the local subnet using Who-Is.
//!
//! Usage:
//!   cargo run -p bacscan-proxy --example discover_devices

use bacscan_proxy::{Proxy, ProxyConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Bind on the interface that routes outward, ephemeral port.
    let proxy = Proxy::new(
        ProxyConfig::default()
            .with_port(0)
            .with_scan_window(Duration::from_secs(3)),
    );
    let address = proxy.start(None).await?;
    println!("Listening on {address}");

    let devices = proxy.who_is(None, None, None).await?;
    if devices.is_empty() {
        println!("No devices found.");
    } else {
        for device in &devices {
            println!(
                "Device {} at {} (vendor {}, name {:?})",
                device.device_id.instance(),
                device.address,
                device.vendor_id,
                device.object_name,
            );
        }
        println!("\nDiscovered {} device(s).", devices.len());
    }

    proxy.stop().await;
    Ok(())
}
