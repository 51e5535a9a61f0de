pub mod address;
pub mod dispatch;
pub mod engine;
pub mod message;
pub mod state;

pub use address::BrokerAddress;
pub use dispatch::Dispatcher;
pub use engine::BrokerAdapter;
pub use message::InboundMessage;
pub use state::ConnectionState;
