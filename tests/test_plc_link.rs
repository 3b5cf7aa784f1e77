mod common;

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use common::{Script, ScriptedTransport};
use sortcam::data::PlcConfig;
use sortcam::plc::{ConnectionState, PlcLink};

fn config() -> PlcConfig {
    PlcConfig {
        retry_interval_secs: 1,
        connect_timeout_ms: 100,
        ..PlcConfig::default()
    }
}

#[test]
fn writes_fail_fast_while_disconnected() {
    let script = Script::new(false);
    let mut link = PlcLink::connect(
        &config(),
        Box::new(ScriptedTransport::new(script.clone())),
    )
    .unwrap();

    assert_eq!(link.state(), ConnectionState::Disconnected);
    for value in 0..5 {
        assert!(!link.write(value));
    }
    assert_eq!(link.state(), ConnectionState::Disconnected);
    assert!(script.recorded_writes().is_empty());

    link.disconnect();
}

#[test]
fn write_succeeds_after_connect_and_uses_big_endian() {
    let script = Script::new(true);
    let mut link = PlcLink::connect(
        &config(),
        Box::new(ScriptedTransport::new(script.clone())),
    )
    .unwrap();

    assert!(link.is_connected());
    assert!(link.write(7));
    assert!(link.write(-2));

    let writes = script.recorded_writes();
    assert_eq!(writes, vec![vec![0x00, 0x07], vec![0xFF, 0xFE]]);

    link.disconnect();
}

#[test]
fn failed_write_forces_disconnected() {
    let script = Script::new(true);
    let mut link = PlcLink::connect(
        &config(),
        Box::new(ScriptedTransport::new(script.clone())),
    )
    .unwrap();
    assert!(link.is_connected());

    script.write_fail.store(true, Ordering::SeqCst);
    assert!(!link.write(3));
    assert_eq!(link.state(), ConnectionState::Disconnected);

    // still failing fast, no blocking, no writes recorded
    assert!(!link.write(4));
    assert!(script.recorded_writes().is_empty());

    link.disconnect();
}

#[test]
fn manual_reconnect_restores_the_link() {
    let script = Script::new(false);
    let mut link = PlcLink::connect(
        &config(),
        Box::new(ScriptedTransport::new(script.clone())),
    )
    .unwrap();
    assert!(!link.is_connected());

    script.connect_ok.store(true, Ordering::SeqCst);
    assert!(link.connect_now());
    assert!(link.is_connected());
    assert!(link.write(1));
    assert_eq!(script.recorded_writes(), vec![vec![0x00, 0x01]]);

    link.disconnect();
}

#[test]
fn background_recovery_reconnects_without_caller_involvement() {
    let script = Script::new(false);
    let mut link = PlcLink::connect(
        &config(),
        Box::new(ScriptedTransport::new(script.clone())),
    )
    .unwrap();
    assert!(!link.is_connected());

    // let the worker burn at least one failed attempt, then heal the line
    script.connect_ok.store(true, Ordering::SeqCst);
    let mut waited = Duration::ZERO;
    while !link.is_connected() && waited < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(100));
        waited += Duration::from_millis(100);
    }

    assert!(link.is_connected(), "recovery worker never reconnected");
    assert!(script.connect_attempts.load(Ordering::SeqCst) >= 2);
    assert!(link.write(2));

    link.disconnect();
}

#[test]
fn disconnect_is_terminal() {
    let script = Script::new(true);
    let mut link = PlcLink::connect(
        &config(),
        Box::new(ScriptedTransport::new(script.clone())),
    )
    .unwrap();
    assert!(link.is_connected());

    link.disconnect();
    assert_eq!(link.state(), ConnectionState::Disconnected);
    assert!(!link.write(9));
    assert!(!link.connect_now());

    // second disconnect is a no-op
    link.disconnect();
}
