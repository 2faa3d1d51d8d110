//! Who-Is scans: one request out, every I-Am collected for a fixed window.

use crate::endpoint::Endpoint;
use crate::transaction::PropertyReference;
use crate::{DeviceRegistry, Proxy, ProxyError};
use bacscan_core::encoding::writer::Writer;
use bacscan_core::npdu::Npdu;
use bacscan_core::services::{IAmRequest, WhoIsRequest};
use bacscan_core::types::object_id::MAX_INSTANCE;
use bacscan_core::types::{DataValue, ObjectId, PropertyId, Segmentation};
use bacscan_datalink::{DataLink, DataLinkAddress};
use ipnetwork::Ipv4Network;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

/// A device that answered a Who-Is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAnnouncement {
    pub address: SocketAddr,
    pub device_id: ObjectId,
    pub max_apdu: u32,
    pub segmentation: Segmentation,
    pub vendor_id: u32,
    /// Filled in after the window closes when name resolution is enabled.
    pub object_name: Option<String>,
}

impl DeviceAnnouncement {
    fn from_i_am(address: SocketAddr, i_am: &IAmRequest) -> Self {
        Self {
            address,
            device_id: i_am.device_id,
            max_apdu: i_am.max_apdu,
            segmentation: i_am.segmentation,
            vendor_id: i_am.vendor_id,
            object_name: None,
        }
    }
}

/// What a scan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTarget {
    /// Every device in an IPv4 block; Who-Is goes to the block's broadcast
    /// address and replies from outside the block are dropped.
    Network(Ipv4Network),
    /// Devices whose instance lies in `low..=high`. Without a destination
    /// the Who-Is goes to the local subnet broadcast.
    Instances {
        low: u32,
        high: u32,
        destination: Option<SocketAddr>,
    },
}

impl ScanTarget {
    pub fn instances(
        low: u32,
        high: u32,
        destination: Option<SocketAddr>,
    ) -> Result<Self, ProxyError> {
        let target = Self::Instances {
            low,
            high,
            destination,
        };
        target.validate()?;
        Ok(target)
    }

    pub fn validate(&self) -> Result<(), ProxyError> {
        match *self {
            Self::Network(_) => Ok(()),
            Self::Instances { low, high, .. } if low > high => Err(ProxyError::InvalidScanTarget(
                format!("instance range {low}..={high} is inverted"),
            )),
            Self::Instances { high, .. } if high > MAX_INSTANCE => Err(
                ProxyError::InvalidScanTarget(format!("instance {high} exceeds {MAX_INSTANCE}")),
            ),
            Self::Instances { .. } => Ok(()),
        }
    }
}

/// Parses CIDR notation. A bare address is a single-host block.
impl FromStr for ScanTarget {
    type Err = ProxyError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        text.trim()
            .parse::<Ipv4Network>()
            .map(Self::Network)
            .map_err(|e| ProxyError::InvalidScanTarget(format!("`{}`: {e}", text.trim())))
    }
}

impl<D: DataLink> Proxy<D> {
    /// Sends one Who-Is for `target` and collects the I-Am replies that
    /// arrive within `window` (the configured scan window when `None`).
    ///
    /// Devices are listed in the order their first reply arrived; repeated
    /// replies from the same (address, device) pair are dropped. An empty
    /// list is a successful scan. Scans on one proxy run one at a time.
    pub async fn scan_range(
        &self,
        target: &ScanTarget,
        window: Option<Duration>,
    ) -> Result<Vec<DeviceAnnouncement>, ProxyError> {
        target.validate()?;
        let endpoint = self.live().await?;
        let port = endpoint.config().device_port;

        let (request, destination, filter) = match *target {
            ScanTarget::Network(network) => {
                let destination = if network.prefix() == 32 {
                    DataLinkAddress::Ip(SocketAddr::new(IpAddr::V4(network.ip()), port))
                } else {
                    DataLinkAddress::Broadcast(SocketAddr::new(IpAddr::V4(network.broadcast()), port))
                };
                (WhoIsRequest::global(), destination, Some(network))
            }
            ScanTarget::Instances {
                low,
                high,
                destination,
            } => (
                WhoIsRequest::range(low, high),
                destination
                    .map(DataLinkAddress::Ip)
                    .unwrap_or_else(|| subnet_broadcast(&endpoint, port)),
                None,
            ),
        };

        let window = window.unwrap_or(endpoint.config().scan_window);
        discover(&endpoint, request, destination, window, filter).await
    }

    /// Lower-level Who-Is with optional instance limits and an explicit
    /// destination (the local subnet broadcast when `None`). Limits must be
    /// given together.
    pub async fn who_is(
        &self,
        low: Option<u32>,
        high: Option<u32>,
        destination: Option<SocketAddr>,
    ) -> Result<Vec<DeviceAnnouncement>, ProxyError> {
        let request = match (low, high) {
            (Some(low), Some(high)) => {
                ScanTarget::instances(low, high, destination)?;
                WhoIsRequest::range(low, high)
            }
            (None, None) => WhoIsRequest::global(),
            _ => {
                return Err(ProxyError::InvalidArgument(
                    "who-is limits must be given together".to_string(),
                ))
            }
        };
        let endpoint = self.live().await?;
        let port = endpoint.config().device_port;
        let destination = destination
            .map(DataLinkAddress::Ip)
            .unwrap_or_else(|| subnet_broadcast(&endpoint, port));
        let window = endpoint.config().scan_window;
        discover(&endpoint, request, destination, window, None).await
    }
}

impl<D: DataLink> Proxy<D> {
    /// Devices found by the most recent scan. Empty when the proxy is not
    /// running.
    pub async fn devices(&self) -> DeviceRegistry {
        match self.live().await {
            Ok(endpoint) => endpoint.registry(),
            Err(_) => DeviceRegistry::new(),
        }
    }
}

fn subnet_broadcast<D: DataLink>(endpoint: &Endpoint<D>, port: u16) -> DataLinkAddress {
    DataLinkAddress::Broadcast(SocketAddr::new(
        IpAddr::V4(endpoint.interface().broadcast()),
        port,
    ))
}

async fn discover<D: DataLink>(
    endpoint: &Arc<Endpoint<D>>,
    request: WhoIsRequest,
    destination: DataLinkAddress,
    window: Duration,
    filter: Option<Ipv4Network>,
) -> Result<Vec<DeviceAnnouncement>, ProxyError> {
    // Held through name resolution so registries are replaced in scan order.
    let _serial = endpoint.scan_lock.lock().await;
    let mut registry = endpoint
        .collect_announcements(request, destination, window, filter)
        .await?;
    log::info!("who-is to {destination}: {} device(s)", registry.len());
    if endpoint.config().resolve_names && !registry.is_empty() {
        resolve_names(endpoint, &mut registry).await?;
    }
    let devices = registry.to_vec();
    endpoint.replace_registry(registry);
    Ok(devices)
}

/// Reads every device's object name concurrently. A device that does not
/// answer keeps `object_name: None`.
async fn resolve_names<D: DataLink>(
    endpoint: &Arc<Endpoint<D>>,
    registry: &mut DeviceRegistry,
) -> Result<(), ProxyError> {
    let mut lookups = JoinSet::new();
    for (slot, device) in registry.iter().enumerate() {
        let endpoint = endpoint.clone();
        let reference =
            PropertyReference::new(device.address, device.device_id, PropertyId::ObjectName);
        lookups.spawn(async move { (slot, reference, endpoint.read_value(&reference).await) });
    }

    while let Some(joined) = lookups.join_next().await {
        let (slot, reference, result) = match joined {
            Ok(lookup) => lookup,
            Err(err) => {
                log::warn!("name lookup task failed: {err}");
                continue;
            }
        };
        match result {
            Ok(DataValue::CharacterString(name)) => {
                if let Some(device) = registry.get_mut(slot) {
                    device.object_name = Some(name);
                }
            }
            Ok(other) => log::warn!("{reference}: unexpected value {other:?}"),
            Err(ProxyError::Stopped) => return Err(ProxyError::Stopped),
            Err(err) => log::warn!("{reference}: {err}"),
        }
    }
    Ok(())
}

impl<D: DataLink> Endpoint<D> {
    /// Opens the announcement listener, sends the Who-Is and gathers replies
    /// until `window` elapses. The listener is removed on every exit path.
    /// Callers hold `scan_lock`.
    pub(crate) async fn collect_announcements(
        &self,
        request: WhoIsRequest,
        destination: DataLinkAddress,
        window: Duration,
        filter: Option<Ipv4Network>,
    ) -> Result<DeviceRegistry, ProxyError> {
        let (_listener, mut announcements) = self.waiters.open_scan()?;

        let mut w = Writer::new();
        Npdu::local().encode(&mut w)?;
        request.encode(&mut w)?;
        self.send(destination, w.as_written()).await?;
        log::debug!("who-is {:?} sent to {destination}, listening {window:?}", request.limits);

        let deadline = Instant::now() + window;
        let mut registry = DeviceRegistry::new();
        loop {
            let (source, i_am) = match timeout_at(deadline, announcements.recv()).await {
                Ok(Some(announcement)) => announcement,
                Ok(None) => return Err(ProxyError::Stopped),
                Err(_) => break,
            };
            let address = source.as_socket_addr();
            if let Some(network) = filter {
                let inside = matches!(address.ip(), IpAddr::V4(ip) if network.contains(ip));
                if !inside {
                    log::debug!("dropping I-Am from {address}: outside {network}");
                    continue;
                }
            }
            if !request.matches(i_am.device_id.instance()) {
                continue;
            }
            if !registry.insert(DeviceAnnouncement::from_i_am(address, &i_am)) {
                log::debug!("duplicate I-Am from {address} ({})", i_am.device_id);
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::ScanTarget;
    use crate::ProxyError;
    use std::net::Ipv4Addr;

    #[test]
    fn parses_cidr_and_single_hosts() {
        let ScanTarget::Network(network) = "192.168.1.0/24".parse().unwrap() else {
            panic!("expected a network target");
        };
        assert_eq!(network.broadcast(), Ipv4Addr::new(192, 168, 1, 255));

        let ScanTarget::Network(host) = "10.0.0.7".parse().unwrap() else {
            panic!("expected a network target");
        };
        assert_eq!(host.prefix(), 32);
    }

    #[test]
    fn rejects_malformed_targets() {
        for text in ["192.168.1.0/33", "300.1.1.0/24", "not-a-network", ""] {
            assert!(
                matches!(text.parse::<ScanTarget>(), Err(ProxyError::InvalidScanTarget(_))),
                "{text}"
            );
        }
        assert!(matches!(
            ScanTarget::instances(10, 5, None),
            Err(ProxyError::InvalidScanTarget(_))
        ));
        assert!(matches!(
            ScanTarget::instances(0, 4_194_304, None),
            Err(ProxyError::InvalidScanTarget(_))
        ));
        assert!(ScanTarget::instances(5, 5, None).is_ok());
    }
}
