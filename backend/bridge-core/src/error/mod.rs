pub mod config;
pub mod host;
pub mod messenger;
pub mod protocol;
pub mod transport;

pub use config::ConfigError;
pub use host::HostError;
pub use messenger::MessengerError;
pub use protocol::ProtocolError;
pub use transport::TransportError;

