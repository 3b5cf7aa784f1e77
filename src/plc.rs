mod link;
mod transport;

pub use link::{ConnectionState, PlcLink};
pub use transport::{PlcChannel, PlcTransport, TcpGatewayTransport};
