use core::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataLinkAddress {
    /// A single BACnet/IP node.
    Ip(SocketAddr),
    /// A broadcast destination: the limited broadcast address or a
    /// subnet-directed one such as `192.168.1.255`.
    Broadcast(SocketAddr),
}

impl DataLinkAddress {
    pub const BACNET_IP_DEFAULT_PORT: u16 = 47808;

    pub fn local_broadcast(port: u16) -> Self {
        Self::Broadcast(SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), port))
    }

    pub fn bacnet_default(addr: IpAddr) -> Self {
        Self::Ip(SocketAddr::new(addr, Self::BACNET_IP_DEFAULT_PORT))
    }

    pub fn as_socket_addr(self) -> SocketAddr {
        match self {
            Self::Ip(addr) | Self::Broadcast(addr) => addr,
        }
    }

    pub fn is_broadcast(self) -> bool {
        match self {
            Self::Broadcast(_) => true,
            Self::Ip(addr) => matches!(addr.ip(), IpAddr::V4(v4) if v4.is_broadcast()),
        }
    }
}

impl From<SocketAddr> for DataLinkAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::Ip(addr)
    }
}

impl fmt::Display for DataLinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_socket_addr())
    }
}
