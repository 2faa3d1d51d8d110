/// Unsigned/signed/real encodings and the context/application helpers built on them.
pub mod primitives;
/// Borrowing cursor over a received frame.
pub mod reader;
/// Application, context, opening and closing tag headers.
pub mod tag;
/// Growable frame builder with a hard size cap.
pub mod writer;
