use bacscan_core::types::{AbortReason, ErrorClass, ErrorCode, ParseIdentifierError, RejectReason};
use bacscan_datalink::DataLinkError;
use core::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use thiserror::Error;

/// What a device sent back instead of an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteRejection {
    Error {
        service_choice: u8,
        class: Option<ErrorClass>,
        code: Option<ErrorCode>,
    },
    Reject {
        reason: RejectReason,
    },
    Abort {
        reason: AbortReason,
        server: bool,
    },
}

impl RemoteRejection {
    /// True when reading a list one element at a time may succeed where the
    /// whole-list read failed: the device refused the request outright or
    /// could not fit the reply in one frame.
    pub fn suggests_element_reads(&self) -> bool {
        match self {
            Self::Reject { .. } | Self::Abort { .. } => true,
            Self::Error { code, .. } => matches!(code, Some(ErrorCode::AbortSegmentationNotSupported)),
        }
    }
}

impl fmt::Display for RemoteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error {
                class: Some(class),
                code: Some(code),
                ..
            } => write!(f, "error class {class}, code {code}"),
            Self::Error { service_choice, .. } => {
                write!(f, "error for service choice {service_choice}")
            }
            Self::Reject { reason } => write!(f, "reject: {reason}"),
            Self::Abort { reason, server } => {
                let side = if *server { "server" } else { "client" };
                write!(f, "abort ({side}): {reason}")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("proxy is not running")]
    NotRunning,
    #[error("proxy already running on {address}")]
    AlreadyRunning { address: SocketAddr },
    #[error("cannot bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: DataLinkError,
    },
    #[error("{0} is not an address of this host")]
    NotLocalAddress(Ipv4Addr),
    #[error("address resolution failed: {0}")]
    AddressResolution(String),
    #[error("invalid scan target: {0}")]
    InvalidScanTarget(String),
    #[error("priority {0} is outside 1..=16")]
    InvalidPriority(u8),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("request timed out")]
    Timeout,
    #[error("device rejected the request: {0}")]
    RemoteRejected(RemoteRejection),
    #[error("proxy stopped while the request was pending")]
    Stopped,
    #[error("no free invoke id for this device")]
    ExchangeTableFull,
    #[error("unsupported response")]
    UnsupportedResponse,
    #[error("datalink error: {0}")]
    DataLink(#[from] DataLinkError),
    #[error("encode error: {0}")]
    Encode(#[from] bacscan_core::EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] bacscan_core::DecodeError),
}

impl From<ParseIdentifierError> for ProxyError {
    fn from(err: ParseIdentifierError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<RemoteRejection> for ProxyError {
    fn from(rejection: RemoteRejection) -> Self {
        Self::RemoteRejected(rejection)
    }
}

#[cfg(test)]
mod tests {
    use super::{ProxyError, RemoteRejection};
    use bacscan_core::types::{AbortReason, ErrorClass, ErrorCode, RejectReason};

    #[test]
    fn rejections_render_by_name() {
        let err = ProxyError::RemoteRejected(RemoteRejection::Error {
            service_choice: 12,
            class: Some(ErrorClass::Object),
            code: Some(ErrorCode::UnknownObject),
        });
        assert_eq!(
            err.to_string(),
            "device rejected the request: error class object, code unknown-object"
        );
        assert_eq!(
            RemoteRejection::Abort {
                reason: AbortReason::SegmentationNotSupported,
                server: true
            }
            .to_string(),
            "abort (server): segmentation-not-supported"
        );
        assert_eq!(
            RemoteRejection::Reject {
                reason: RejectReason::UnrecognizedService
            }
            .to_string(),
            "reject: unrecognized-service"
        );
    }

    #[test]
    fn refusals_invite_element_wise_reads() {
        assert!(RemoteRejection::Abort {
            reason: AbortReason::SegmentationNotSupported,
            server: true
        }
        .suggests_element_reads());
        assert!(!RemoteRejection::Error {
            service_choice: 12,
            class: Some(ErrorClass::Property),
            code: Some(ErrorCode::UnknownProperty),
        }
        .suggests_element_reads());
    }
}
