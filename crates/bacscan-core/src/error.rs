use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },
    #[error("value out of range")]
    ValueOutOfRange,
    #[error("{0}")]
    Message(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid tag")]
    InvalidTag,
    #[error("invalid length")]
    InvalidLength,
    #[error("invalid value")]
    InvalidValue,
    #[error("unsupported encoding")]
    Unsupported,
}
