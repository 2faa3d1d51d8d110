//! BACnet/IP discovery-and-transaction proxy.
//!
//! A [`Proxy`] owns one bound UDP endpoint for its whole lifetime. A single
//! receive task reads every datagram and routes it: I-Am announcements go to
//! the scan window that is open, replies go to the request waiting on
//! (source, invoke id). On top of that endpoint the proxy offers Who-Is
//! scans of an IPv4 block or instance range, ReadProperty, WriteProperty and
//! a whole-device readout. [`ProxyService`] wraps the same operations behind
//! textual arguments and `{"status": ...}` JSON replies.
//!
//! ```no_run
//! # async fn demo() -> Result<(), bacscan_proxy::ProxyError> {
//! use bacscan_proxy::{Proxy, ScanTarget};
//!
//! let proxy = Proxy::default();
//! let address = proxy.start(None).await?;
//! println!("listening on {address}");
//! let target: ScanTarget = "192.168.1.0/24".parse()?;
//! for device in proxy.scan_range(&target, None).await? {
//!     println!("{} at {}", device.device_id, device.address);
//! }
//! proxy.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discovery;
mod endpoint;
pub mod error;
pub mod point;
pub mod proxy;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod simulator;
pub mod transaction;
pub mod value;
mod waiters;

pub use config::ProxyConfig;
pub use discovery::{DeviceAnnouncement, ScanTarget};
pub use error::{ProxyError, RemoteRejection};
pub use point::{classify_point, Point, PointClassification, PointDirection, PointKind};
pub use proxy::Proxy;
pub use registry::DeviceRegistry;
pub use resolver::{local_interface, local_ip_for, parse_device_address, LocalInterface};
pub use service::{ControlRequest, ProxyService, Reply};
pub use simulator::SimulatedDevice;
pub use transaction::{
    properties_of_interest, DeviceReadout, Priority, PropertyRead, PropertyReference,
};
pub use value::{value_from_json, value_to_json, ValueKind};

pub use bacscan_core::types::{DataValue, ObjectId, ObjectType, PropertyId};
pub use bacscan_datalink::{BacnetIpTransport, DataLink, DataLinkAddress};
