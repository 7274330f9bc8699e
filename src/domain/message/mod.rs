pub mod errors;
pub mod message;
pub mod value_objects;

pub use errors::MessageError;
pub use message::{correlation_of, Message, WireMessage};
pub use value_objects::{Content, ErrorPayload, Format, Metadata, CORRELATION_KEYS};
