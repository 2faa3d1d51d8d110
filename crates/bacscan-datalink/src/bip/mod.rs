/// BVLC framing.
pub mod bvlc;
/// UDP transport.
pub mod transport;
