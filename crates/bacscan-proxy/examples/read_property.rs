//! Read a device's object-name.
//!
//! Usage:
//!   cargo run -p bacscan-proxy --example read_property -- --ip 192.168.1.100 --instance 1

use bacscan_proxy::{ObjectId, PropertyId, PropertyReference, Proxy, ProxyConfig};
use std::net::{IpAddr, SocketAddr};

fn arg(name: &str) -> Option<String> {
    std::env::args().skip_while(|a| a != name).nth(1)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let ip: IpAddr = arg("--ip").ok_or("usage: --ip <device-ip>")?.parse()?;
    let instance: u32 = arg("--instance").map_or(Ok(1), |text| text.parse())?;

    let proxy = Proxy::new(ProxyConfig::default().with_port(0));
    proxy.start(None).await?;

    let reference = PropertyReference::new(
        SocketAddr::new(ip, 47808),
        ObjectId::device(instance),
        PropertyId::ObjectName,
    );
    let value = proxy.read_property(&reference).await?;
    println!("{reference}: {value:?}");

    proxy.stop().await;
    Ok(())
}
