//! Transport seam for the controller link.
//!
//! The link state machine only needs "open a channel within a deadline" and
//! "write bytes to a data block". The actual wire protocol lives behind these
//! traits: production talks to a raw-TCP field gateway that forwards the
//! payload to the controller, tests use scripted in-memory channels, and a
//! native protocol stack can be slotted in without touching the state
//! machine.

use std::io::{self, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::data::PlcConfig;

/// An open channel to the controller.
pub trait PlcChannel: Send {
    /// Writes `payload` to data block `db` at byte `offset`.
    fn write_area(&mut self, db: u16, offset: u16, payload: &[u8]) -> io::Result<()>;

    fn close(&mut self);
}

/// Connection factory. Shared between the vision loop and the recovery
/// worker, so it must be stateless or internally synchronized.
pub trait PlcTransport: Send + Sync {
    /// One bounded connection attempt.
    fn connect(&self, timeout: Duration) -> io::Result<Box<dyn PlcChannel>>;
}

/// TCP transport towards a field gateway.
///
/// The gateway is configured out-of-band with the controller address
/// (host/rack/slot) and data-block routing; this side only ships the payload
/// bytes.
pub struct TcpGatewayTransport {
    host: String,
    port: u16,
}

impl TcpGatewayTransport {
    pub fn new(config: &PlcConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

impl PlcTransport for TcpGatewayTransport {
    fn connect(&self, timeout: Duration) -> io::Result<Box<dyn PlcChannel>> {
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("cannot resolve {}:{}", self.host, self.port),
                )
            })?;
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_write_timeout(Some(timeout))?;
        let _ = stream.set_nodelay(true);
        Ok(Box::new(TcpGatewayChannel { stream }))
    }
}

struct TcpGatewayChannel {
    stream: TcpStream,
}

impl PlcChannel for TcpGatewayChannel {
    fn write_area(&mut self, _db: u16, _offset: u16, payload: &[u8]) -> io::Result<()> {
        self.stream.write_all(payload)?;
        self.stream.flush()
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
