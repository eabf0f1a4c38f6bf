//! tokio-tungstenite adapter for the duplex transport port

mod transport;

pub use transport::WebSocketTransport;
