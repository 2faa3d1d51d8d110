use crate::endpoint::Endpoint;
use crate::resolver::{self, LocalInterface};
use crate::{ProxyConfig, ProxyError};
use bacscan_datalink::{BacnetIpTransport, DataLink};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Owner of the one live BACnet/IP endpoint.
///
/// Discovery and transactions clone the endpoint handle under a read lock, so
/// a concurrent [`stop`](Proxy::stop) either happens before the call (which
/// then fails with [`ProxyError::NotRunning`]) or releases the call's waiter
/// with [`ProxyError::Stopped`].
#[derive(Debug)]
pub struct Proxy<D: DataLink = BacnetIpTransport> {
    config: ProxyConfig,
    endpoint: RwLock<Option<Arc<Endpoint<D>>>>,
}

impl<D: DataLink> Default for Proxy<D> {
    fn default() -> Self {
        Self::new(ProxyConfig::default())
    }
}

impl Proxy<BacnetIpTransport> {
    /// Binds the endpoint and starts its receive loop.
    ///
    /// With no `bind_address` the interface facing
    /// [`ProxyConfig::probe_target`] is used; a supplied address must belong
    /// to this host. Returns the interface address and the bound port.
    pub async fn start(&self, bind_address: Option<Ipv4Addr>) -> Result<SocketAddr, ProxyError> {
        let mut slot = self.endpoint.write().await;
        if let Some(live) = slot.as_ref() {
            return Err(ProxyError::AlreadyRunning {
                address: live.address(),
            });
        }

        let interface = match bind_address {
            Some(ip) => resolver::local_interface(ip)?,
            None => resolver::local_ip_for(self.config.probe_target).await?,
        };
        let socket_ip = if self.config.bind_interface_only || interface.ip.is_loopback() {
            interface.ip
        } else {
            Ipv4Addr::UNSPECIFIED
        };
        let bind_addr = SocketAddr::new(IpAddr::V4(socket_ip), self.config.port);
        let transport = BacnetIpTransport::bind(bind_addr)
            .await
            .map_err(|source| ProxyError::Bind {
                address: bind_addr,
                source,
            })?;
        let port = transport
            .local_addr()
            .map_err(|source| ProxyError::Bind {
                address: bind_addr,
                source,
            })?
            .port();

        let address = SocketAddr::new(IpAddr::V4(interface.ip), port);
        *slot = Some(Endpoint::spawn(transport, interface, address, self.config.clone()));
        log::info!("proxy started on {address} (socket {bind_addr})");
        Ok(address)
    }
}

impl<D: DataLink> Proxy<D> {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            endpoint: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Starts the proxy over an already bound data link.
    pub async fn attach(
        &self,
        datalink: D,
        interface: LocalInterface,
        address: SocketAddr,
    ) -> Result<(), ProxyError> {
        let mut slot = self.endpoint.write().await;
        if let Some(live) = slot.as_ref() {
            return Err(ProxyError::AlreadyRunning {
                address: live.address(),
            });
        }
        *slot = Some(Endpoint::spawn(datalink, interface, address, self.config.clone()));
        log::info!("proxy attached on {address}");
        Ok(())
    }

    /// Tears the endpoint down. Every pending scan and transaction returns
    /// [`ProxyError::Stopped`]. Returns whether a proxy was running; stopping
    /// an idle proxy is a no-op.
    pub async fn stop(&self) -> bool {
        let endpoint = self.endpoint.write().await.take();
        match endpoint {
            Some(endpoint) => {
                endpoint.shutdown().await;
                log::info!("proxy on {} stopped", endpoint.address());
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.endpoint.read().await.is_some()
    }

    pub async fn local_address(&self) -> Option<SocketAddr> {
        self.endpoint.read().await.as_ref().map(|e| e.address())
    }

    pub(crate) async fn live(&self) -> Result<Arc<Endpoint<D>>, ProxyError> {
        self.endpoint
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or(ProxyError::NotRunning)
    }
}
