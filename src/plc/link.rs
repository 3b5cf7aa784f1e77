//! Resilient controller link.
//!
//! The vision loop writes one 16-bit code per frame. The controller side of
//! the link is allowed to be down at any time, so `write` never blocks on an
//! unavailable link and a dedicated worker keeps retrying the connection in
//! the background until `disconnect` shuts the link down for good.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::data::PlcConfig;
use crate::plc::{PlcChannel, PlcTransport};

/// Link state. `Connected` is only ever set by a completed connection
/// attempt; any I/O failure forces `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

struct Slot {
    state: ConnectionState,
    channel: Option<Box<dyn PlcChannel>>,
    shutdown: bool,
}

struct Shared {
    transport: Box<dyn PlcTransport>,
    slot: Mutex<Slot>,
    db: u16,
    offset: u16,
    connect_timeout: Duration,
}

pub struct PlcLink {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    stop_tx: Sender<()>,
}

impl PlcLink {
    /// Builds the link, makes one immediate connection attempt and starts the
    /// recovery worker. A controller that is down at startup is not an error.
    pub fn connect(config: &PlcConfig, transport: Box<dyn PlcTransport>) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            transport,
            slot: Mutex::new(Slot {
                state: ConnectionState::Disconnected,
                channel: None,
                shutdown: false,
            }),
            db: config.db,
            offset: config.offset,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
        });

        if !Self::try_connect(&shared) {
            log::warn!(
                "PLC at {}:{} unavailable, background recovery scheduled",
                config.host,
                config.port
            );
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let retry = Duration::from_secs(config.retry_interval_secs.max(1));
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("plc-recovery".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(retry) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        let disconnected =
                            worker_shared.slot.lock().state == ConnectionState::Disconnected;
                        if disconnected {
                            Self::try_connect(&worker_shared);
                        }
                    }
                }
            })?;

        Ok(Self {
            shared,
            worker: Some(worker),
            stop_tx,
        })
    }

    /// One manual connection attempt. Used at startup and by commissioning
    /// tools; the background worker runs the same path.
    pub fn connect_now(&self) -> bool {
        Self::try_connect(&self.shared)
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.slot.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Writes the code as a big-endian 16-bit word.
    ///
    /// Returns `false` without blocking when the link is not connected; the
    /// recovery worker handles getting it back. A failed write tears the
    /// connection down immediately.
    pub fn write(&self, value: i16) -> bool {
        let mut slot = self.shared.slot.lock();
        if slot.shutdown || slot.state != ConnectionState::Connected {
            log::debug!("PLC not connected, value {value} not sent");
            return false;
        }

        let payload = value.to_be_bytes();
        let result = match slot.channel.as_mut() {
            Some(channel) => channel.write_area(self.shared.db, self.shared.offset, &payload),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "no channel")),
        };

        match result {
            Ok(()) => {
                log::debug!("value {value} written to PLC");
                true
            }
            Err(err) => {
                log::debug!("PLC write failed: {err}");
                if let Some(mut channel) = slot.channel.take() {
                    channel.close();
                }
                slot.state = ConnectionState::Disconnected;
                false
            }
        }
    }

    /// Permanently shuts the link down: stops the recovery worker and closes
    /// any open connection. The link must not be reused afterwards.
    pub fn disconnect(&mut self) {
        {
            let mut slot = self.shared.slot.lock();
            if slot.shutdown {
                return;
            }
            slot.shutdown = true;
        }
        let _ = self.stop_tx.try_send(());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        let mut slot = self.shared.slot.lock();
        if let Some(mut channel) = slot.channel.take() {
            channel.close();
        }
        slot.state = ConnectionState::Disconnected;
        log::info!("PLC link shut down");
    }

    /// One connection attempt. The `Connecting` state is the
    /// single-attempt-in-flight guard; the attempt itself runs outside the
    /// lock so concurrent `write` calls observe `Connecting` instead of
    /// blocking.
    fn try_connect(shared: &Arc<Shared>) -> bool {
        {
            let mut slot = shared.slot.lock();
            if slot.shutdown {
                return false;
            }
            match slot.state {
                ConnectionState::Connected => return true,
                ConnectionState::Connecting => return false,
                ConnectionState::Disconnected => slot.state = ConnectionState::Connecting,
            }
        }

        let result = shared.transport.connect(shared.connect_timeout);

        let mut slot = shared.slot.lock();
        if slot.shutdown {
            // disconnect() raced the attempt; drop whatever it produced
            if let Ok(mut channel) = result {
                channel.close();
            }
            slot.state = ConnectionState::Disconnected;
            return false;
        }
        match result {
            Ok(channel) => {
                slot.channel = Some(channel);
                slot.state = ConnectionState::Connected;
                log::info!("PLC connected");
                true
            }
            Err(err) => {
                slot.state = ConnectionState::Disconnected;
                log::debug!("PLC connection attempt failed: {err}");
                false
            }
        }
    }
}

impl Drop for PlcLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}
