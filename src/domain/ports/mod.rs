// Ports: narrow interfaces to everything outside the protocol core
// Adapters in `infrastructure` implement these traits

pub mod capability;
pub mod reasoning;
pub mod transport;

pub use capability::{CapabilityError, WeatherCapability};
pub use reasoning::{Intent, Reasoner, ReasoningError, SubtaskSpec};
pub use transport::{check_reply, Endpoint, Transport, TransportError};
