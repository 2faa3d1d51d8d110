use bacscan_datalink::DataLinkAddress;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Tunables for a [`Proxy`](crate::Proxy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Local UDP port the endpoint binds. `0` picks an ephemeral port.
    pub port: u16,
    /// Port assumed for devices when an address carries none.
    pub device_port: u16,
    pub response_timeout: Duration,
    pub scan_window: Duration,
    /// Extra attempts for a read that timed out. Writes are never retried.
    pub read_retries: u8,
    /// Read each discovered device's object name after a scan.
    pub resolve_names: bool,
    /// Bind the socket on the interface address instead of `0.0.0.0`.
    ///
    /// Broadcast I-Am replies are only delivered to wildcard-bound sockets on
    /// most platforms, so this is off by default.
    pub bind_interface_only: bool,
    /// Address used to find the outbound interface when none is given.
    pub probe_target: Ipv4Addr,
    /// Largest object list read one element at a time. A device reporting
    /// more entries fails the readout with
    /// [`ProxyError::UnsupportedResponse`](crate::ProxyError::UnsupportedResponse).
    pub max_object_list_len: u32,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: DataLinkAddress::BACNET_IP_DEFAULT_PORT,
            device_port: DataLinkAddress::BACNET_IP_DEFAULT_PORT,
            response_timeout: Duration::from_secs(3),
            scan_window: Duration::from_secs(3),
            read_retries: 0,
            resolve_names: true,
            bind_interface_only: false,
            probe_target: Ipv4Addr::new(8, 8, 8, 8),
            max_object_list_len: 65_535,
        }
    }
}

impl ProxyConfig {
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_scan_window(mut self, window: Duration) -> Self {
        self.scan_window = window;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_device_port(mut self, port: u16) -> Self {
        self.device_port = port;
        self
    }

    pub fn with_read_retries(mut self, retries: u8) -> Self {
        self.read_retries = retries;
        self
    }

    pub fn with_resolve_names(mut self, resolve: bool) -> Self {
        self.resolve_names = resolve;
        self
    }

    pub fn with_bind_interface_only(mut self, interface_only: bool) -> Self {
        self.bind_interface_only = interface_only;
        self
    }

    pub fn with_probe_target(mut self, target: Ipv4Addr) -> Self {
        self.probe_target = target;
        self
    }

    pub fn with_max_object_list_len(mut self, len: u32) -> Self {
        self.max_object_list_len = len;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::ProxyConfig;
    use std::time::Duration;

    #[test]
    fn defaults_follow_bacnet_ip_conventions() {
        let config = ProxyConfig::default();
        assert_eq!(config.port, 47808);
        assert_eq!(config.device_port, 47808);
        assert_eq!(config.response_timeout, Duration::from_secs(3));
        assert_eq!(config.read_retries, 0);
        assert!(config.resolve_names);
        assert!(!config.bind_interface_only);
        assert_eq!(config.max_object_list_len, 65_535);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = ProxyConfig::default()
            .with_port(0)
            .with_scan_window(Duration::from_millis(250))
            .with_read_retries(2)
            .with_resolve_names(false);
        assert_eq!(config.port, 0);
        assert_eq!(config.scan_window, Duration::from_millis(250));
        assert_eq!(config.read_retries, 2);
        assert!(!config.resolve_names);
    }
}
