//! Local interface lookup: which address to bind, and which subnet it sits on.

use crate::ProxyError;
use ipnetwork::Ipv4Network;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;

/// An IPv4 address of this host together with its subnet mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalInterface {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

impl LocalInterface {
    pub fn new(ip: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        Self { ip, netmask }
    }

    /// The interface's subnet in CIDR form, e.g. `192.168.1.17/24`.
    pub fn cidr(&self) -> Result<Ipv4Network, ProxyError> {
        Ipv4Network::with_netmask(self.ip, self.netmask).map_err(|e| {
            ProxyError::AddressResolution(format!("netmask {} of {}: {e}", self.netmask, self.ip))
        })
    }

    /// Directed broadcast address of the subnet. Falls back to the limited
    /// broadcast address when the mask is not a valid prefix.
    pub fn broadcast(&self) -> Ipv4Addr {
        self.cidr()
            .map(|network| network.broadcast())
            .unwrap_or(Ipv4Addr::BROADCAST)
    }
}

/// Finds the interface the host would use to reach `target`.
///
/// Connecting a UDP socket only selects a route; no datagram is sent.
pub async fn local_ip_for(target: Ipv4Addr) -> Result<LocalInterface, ProxyError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(|e| ProxyError::AddressResolution(format!("probe socket: {e}")))?;
    socket
        .connect((target, 9))
        .await
        .map_err(|e| ProxyError::AddressResolution(format!("no route to {target}: {e}")))?;
    let ip = match socket
        .local_addr()
        .map_err(|e| ProxyError::AddressResolution(e.to_string()))?
        .ip()
    {
        IpAddr::V4(ip) => ip,
        IpAddr::V6(ip) => {
            return Err(ProxyError::AddressResolution(format!(
                "outbound address {ip} is not IPv4"
            )))
        }
    };
    log::debug!("outbound interface towards {target} is {ip}");
    local_interface(ip)
}

/// Validates that `ip` belongs to this host and returns its interface.
pub fn local_interface(ip: Ipv4Addr) -> Result<LocalInterface, ProxyError> {
    find_interface(&interfaces()?, ip).ok_or(ProxyError::NotLocalAddress(ip))
}

/// IPv4 addresses of every interface on this host.
pub fn interfaces() -> Result<Vec<LocalInterface>, ProxyError> {
    let interfaces = if_addrs::get_if_addrs()
        .map_err(|e| ProxyError::AddressResolution(format!("listing interfaces: {e}")))?;
    Ok(interfaces
        .into_iter()
        .filter_map(|iface| match iface.addr {
            if_addrs::IfAddr::V4(ref addr) => Some(LocalInterface::new(addr.ip, addr.netmask)),
            _ => None,
        })
        .collect())
}

fn find_interface(interfaces: &[LocalInterface], ip: Ipv4Addr) -> Option<LocalInterface> {
    interfaces.iter().copied().find(|iface| iface.ip == ip)
}

/// Parses `a.b.c.d` or `a.b.c.d:port`; a bare address gets `default_port`.
pub fn parse_device_address(text: &str, default_port: u16) -> Result<SocketAddr, ProxyError> {
    let text = text.trim();
    if let Ok(addr) = text.parse::<SocketAddr>() {
        return Ok(addr);
    }
    text.parse::<Ipv4Addr>()
        .map(|ip| SocketAddr::new(IpAddr::V4(ip), default_port))
        .map_err(|_| ProxyError::InvalidArgument(format!("`{text}` is not a device address")))
}
