//! BACnet encoding and decoding for the bacscan proxy.
//!
//! `bacscan-core` covers the slice of the protocol a discovery-and-transaction
//! engine needs: the tag system, NPDU and APDU headers, Who-Is / I-Am,
//! ReadProperty / WriteProperty, and an owned application value codec.
//! Frames are built into a growable [`encoding::writer::Writer`] capped at the
//! BACnet/IP payload limit.

/// APDU headers for confirmed/unconfirmed requests and their replies.
pub mod apdu;
/// Reader/writer, tag headers and primitive value encodings.
pub mod encoding;
/// Error types for encoding and decoding operations.
pub mod error;
/// NPDU (network layer) header.
pub mod npdu;
/// Service request and acknowledgement codecs.
pub mod services;
/// Object identifiers, property identifiers, values and enumerations.
pub mod types;

pub use error::{DecodeError, EncodeError};
