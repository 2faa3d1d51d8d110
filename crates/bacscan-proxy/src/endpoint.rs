use crate::waiters::WaiterTable;
use crate::{DeviceRegistry, LocalInterface, ProxyConfig, ProxyError};
use bacscan_core::apdu::{reply_invoke_id, ApduType, UnconfirmedRequestHeader};
use bacscan_core::encoding::reader::Reader;
use bacscan_core::npdu::split_apdu;
use bacscan_core::services::{IAmRequest, SERVICE_I_AM};
use bacscan_core::DecodeError;
use bacscan_datalink::{DataLink, DataLinkAddress, DataLinkError};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const RECV_BUF_LEN: usize = 1600;
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// One bound data link plus the task that drains it.
///
/// The receive loop is the only reader of the data link. Callers register
/// in the waiter table first, then send, then wait.
#[derive(Debug)]
pub(crate) struct Endpoint<D: DataLink> {
    datalink: Arc<D>,
    interface: LocalInterface,
    address: SocketAddr,
    config: ProxyConfig,
    pub(crate) waiters: Arc<WaiterTable>,
    pub(crate) scan_lock: tokio::sync::Mutex<()>,
    registry: Mutex<DeviceRegistry>,
    shutdown: watch::Sender<bool>,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

impl<D: DataLink> Endpoint<D> {
    pub(crate) fn spawn(
        datalink: D,
        interface: LocalInterface,
        address: SocketAddr,
        config: ProxyConfig,
    ) -> Arc<Self> {
        let datalink = Arc::new(datalink);
        let waiters = Arc::new(WaiterTable::default());
        let (shutdown, signal) = watch::channel(false);
        let receiver = tokio::spawn(receive_loop(datalink.clone(), waiters.clone(), signal));
        Arc::new(Self {
            datalink,
            interface,
            address,
            config,
            waiters,
            scan_lock: tokio::sync::Mutex::new(()),
            registry: Mutex::new(DeviceRegistry::new()),
            shutdown,
            receiver: Mutex::new(Some(receiver)),
        })
    }

    pub(crate) fn address(&self) -> SocketAddr {
        self.address
    }

    pub(crate) fn interface(&self) -> LocalInterface {
        self.interface
    }

    pub(crate) fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub(crate) fn registry(&self) -> DeviceRegistry {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn replace_registry(&self, registry: DeviceRegistry) {
        *self.registry.lock().unwrap_or_else(PoisonError::into_inner) = registry;
    }

    pub(crate) async fn send(&self, destination: DataLinkAddress, frame: &[u8]) -> Result<(), ProxyError> {
        self.datalink.send(destination, frame).await?;
        Ok(())
    }

    /// Stops the receive loop and releases every waiter with
    /// [`ProxyError::Stopped`].
    pub(crate) async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        self.waiters.close();
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(receiver) = receiver {
            if let Err(err) = receiver.await {
                log::warn!("receive loop ended abnormally: {err}");
            }
        }
    }
}

async fn receive_loop<D: DataLink>(
    datalink: Arc<D>,
    waiters: Arc<WaiterTable>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = [0u8; RECV_BUF_LEN];
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            received = datalink.recv(&mut buf) => match received {
                Ok((n, source)) => {
                    if let Err(err) = dispatch(&waiters, &buf[..n], source) {
                        log::debug!("dropping frame from {source}: {err}");
                    }
                }
                Err(err @ (DataLinkError::InvalidFrame | DataLinkError::UnsupportedBvlcFunction(_))) => {
                    log::debug!("ignoring datagram: {err}");
                }
                Err(err) => {
                    log::warn!("receive failed: {err}");
                    tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                }
            },
        }
    }
    log::debug!("receive loop stopped");
}

/// Routes one inbound NPDU: I-Am to the open scan window, replies to the
/// exchange waiting on (source, invoke id). Everything else is dropped.
fn dispatch(
    waiters: &WaiterTable,
    frame: &[u8],
    source: DataLinkAddress,
) -> Result<(), ProxyError> {
    let (npdu, apdu) = split_apdu(frame)?;
    if npdu.network_message.is_some() {
        return Ok(());
    }

    match ApduType::of(apdu) {
        Some(ApduType::UnconfirmedRequest) => {
            let mut r = Reader::new(apdu);
            let header = UnconfirmedRequestHeader::decode(&mut r)?;
            if header.service_choice != SERVICE_I_AM {
                return Ok(());
            }
            let i_am = IAmRequest::decode_after_header(&mut r)?;
            if !waiters.announce(source, i_am) {
                log::debug!("I-Am from {source} ({}) outside a scan window", i_am.device_id);
            }
        }
        Some(kind) if kind.is_reply() => {
            let invoke_id = reply_invoke_id(apdu).ok_or(DecodeError::UnexpectedEof)?;
            if !waiters.complete(source, invoke_id, apdu.to_vec()) {
                log::debug!("unmatched {kind:?} from {source} for invoke id {invoke_id}");
            }
        }
        other => log::debug!("ignoring {other:?} APDU from {source}"),
    }
    Ok(())
}
