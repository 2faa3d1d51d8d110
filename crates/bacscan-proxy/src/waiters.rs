//! Registry of callers waiting on the receive loop.
//!
//! Confirmed requests wait on a oneshot keyed by (peer, invoke id). A scan
//! opens the single announcement listener for the length of its window.
//! Closing the table drops every sender, which wakes each waiter with a
//! closed channel.

use crate::ProxyError;
use bacscan_core::services::IAmRequest;
use bacscan_datalink::DataLinkAddress;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

pub(crate) type Announcement = (DataLinkAddress, IAmRequest);

#[derive(Debug, Default)]
struct TableState {
    closed: bool,
    exchanges: HashMap<(DataLinkAddress, u8), oneshot::Sender<Vec<u8>>>,
    next_invoke_id: u8,
    listener: Option<(u64, mpsc::UnboundedSender<Announcement>)>,
    next_listener_id: u64,
}

#[derive(Debug, Default)]
pub(crate) struct WaiterTable {
    state: Mutex<TableState>,
}

impl WaiterTable {
    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves an invoke id not already pending for `peer`.
    pub(crate) fn register_exchange(
        &self,
        peer: DataLinkAddress,
    ) -> Result<(ExchangeGuard<'_>, oneshot::Receiver<Vec<u8>>), ProxyError> {
        let mut state = self.lock();
        if state.closed {
            return Err(ProxyError::Stopped);
        }
        let start = state.next_invoke_id;
        let invoke_id = (0..=u8::MAX)
            .map(|offset| start.wrapping_add(offset))
            .find(|id| !state.exchanges.contains_key(&(peer, *id)))
            .ok_or(ProxyError::ExchangeTableFull)?;
        state.next_invoke_id = invoke_id.wrapping_add(1);
        let (tx, rx) = oneshot::channel();
        state.exchanges.insert((peer, invoke_id), tx);
        Ok((
            ExchangeGuard {
                table: self,
                key: (peer, invoke_id),
            },
            rx,
        ))
    }

    /// Hands a reply APDU to the exchange waiting on it. Returns false when
    /// nobody is waiting.
    pub(crate) fn complete(&self, peer: DataLinkAddress, invoke_id: u8, apdu: Vec<u8>) -> bool {
        let Some(tx) = self.lock().exchanges.remove(&(peer, invoke_id)) else {
            return false;
        };
        tx.send(apdu).is_ok()
    }

    /// Opens the announcement listener for a scan window.
    pub(crate) fn open_scan(
        &self,
    ) -> Result<(ScanGuard<'_>, mpsc::UnboundedReceiver<Announcement>), ProxyError> {
        let mut state = self.lock();
        if state.closed {
            return Err(ProxyError::Stopped);
        }
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        if state.listener.replace((id, tx)).is_some() {
            log::warn!("scan listener replaced while another window was open");
        }
        Ok((ScanGuard { table: self, id }, rx))
    }

    /// Delivers an I-Am to the open scan window. Returns false when no window
    /// is open.
    pub(crate) fn announce(&self, source: DataLinkAddress, i_am: IAmRequest) -> bool {
        match &self.lock().listener {
            Some((_, tx)) => tx.send((source, i_am)).is_ok(),
            None => false,
        }
    }

    /// Refuses new registrations and releases every current waiter.
    pub(crate) fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.exchanges.clear();
        state.listener = None;
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        let state = self.lock();
        state.exchanges.len() + usize::from(state.listener.is_some())
    }
}

/// Removes its exchange from the table when dropped, whichever way the
/// waiting call ends.
#[derive(Debug)]
pub(crate) struct ExchangeGuard<'a> {
    table: &'a WaiterTable,
    key: (DataLinkAddress, u8),
}

impl ExchangeGuard<'_> {
    pub(crate) fn invoke_id(&self) -> u8 {
        self.key.1
    }
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        self.table.lock().exchanges.remove(&self.key);
    }
}

#[derive(Debug)]
pub(crate) struct ScanGuard<'a> {
    table: &'a WaiterTable,
    id: u64,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.table.lock();
        if matches!(state.listener, Some((id, _)) if id == self.id) {
            state.listener = None;
        }
    }
}
