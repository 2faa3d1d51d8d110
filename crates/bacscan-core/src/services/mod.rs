/// I-Am announcement.
pub mod i_am;
/// ReadProperty request and complex acknowledgement.
pub mod read_property;
/// Application-tagged value encoding.
pub mod value_codec;
/// Who-Is discovery request.
pub mod who_is;
/// WriteProperty request.
pub mod write_property;

pub use i_am::{IAmRequest, SERVICE_I_AM};
pub use read_property::{ReadPropertyAck, ReadPropertyRequest, SERVICE_READ_PROPERTY};
pub use value_codec::{decode_value, encode_value};
pub use who_is::{WhoIsRequest, SERVICE_WHO_IS};
pub use write_property::{WritePropertyRequest, SERVICE_WRITE_PROPERTY};
