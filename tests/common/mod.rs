//! Scripted PLC transport shared across the integration tests.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use sortcam::plc::{PlcChannel, PlcTransport};

/// Shared switchboard controlling the scripted transport from the test body.
#[derive(Default)]
pub struct Script {
    pub connect_ok: AtomicBool,
    pub write_fail: AtomicBool,
    pub connect_attempts: AtomicUsize,
    pub writes: Mutex<Vec<Vec<u8>>>,
}

impl Script {
    pub fn new(connect_ok: bool) -> Arc<Self> {
        let script = Arc::new(Self::default());
        script.connect_ok.store(connect_ok, Ordering::SeqCst);
        script
    }

    pub fn recorded_writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().clone()
    }
}

pub struct ScriptedTransport {
    script: Arc<Script>,
}

impl ScriptedTransport {
    pub fn new(script: Arc<Script>) -> Self {
        Self { script }
    }
}

impl PlcTransport for ScriptedTransport {
    fn connect(&self, _timeout: Duration) -> io::Result<Box<dyn PlcChannel>> {
        self.script.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if self.script.connect_ok.load(Ordering::SeqCst) {
            Ok(Box::new(ScriptedChannel {
                script: Arc::clone(&self.script),
            }))
        } else {
            Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "controller down",
            ))
        }
    }
}

struct ScriptedChannel {
    script: Arc<Script>,
}

impl PlcChannel for ScriptedChannel {
    fn write_area(&mut self, _db: u16, _offset: u16, payload: &[u8]) -> io::Result<()> {
        if self.script.write_fail.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link dropped"));
        }
        self.script.writes.lock().push(payload.to_vec());
        Ok(())
    }

    fn close(&mut self) {}
}
