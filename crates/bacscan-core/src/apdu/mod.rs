/// Confirmed request header and the replies correlated with it.
pub mod confirmed;
/// APDU type discriminant.
pub mod pdu;
/// Unconfirmed request header.
pub mod unconfirmed;

pub use confirmed::{
    AbortPdu, ComplexAckHeader, ConfirmedRequestHeader, ErrorPdu, RejectPdu, SegmentInfo,
    SimpleAck,
};
pub use pdu::{reply_invoke_id, ApduType};
pub use unconfirmed::UnconfirmedRequestHeader;
