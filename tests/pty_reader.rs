//! Real serial path over a pseudo-terminal pair (Unix only).

#![cfg(unix)]

use std::io::Write;
use std::time::{Duration, Instant};

use serialport::{SerialPort, TTYPort};
use signal_kiosk::serial::reader::{self, ReaderOptions};
use signal_kiosk::{event_queue, KioskStateMachine, SignalDispatcher};

#[test]
fn test_frames_sent_while_settling_are_delivered() {
    let (mut master, slave) = TTYPort::pair().expect("pty pair");
    let slave_name = slave.name().expect("pty slave name");

    let (tx, rx) = event_queue();
    let mut dispatcher = SignalDispatcher::new(KioskStateMachine::new(slave_name.clone()), rx);

    let options = ReaderOptions {
        settle: Duration::from_millis(500),
        idle_poll: Duration::from_millis(1),
        ..ReaderOptions::default()
    };
    let handle = reader::spawn(&slave_name, tx, options).unwrap();

    // Board announces its signal right after reset, before the settle ends
    std::thread::sleep(Duration::from_millis(100));
    master.write_all(b"SIGNAL:4\r\n").unwrap();
    master.flush().unwrap();

    std::thread::sleep(Duration::from_millis(800));
    master.write_all(b"Clients:1\nSIGNAL:6\n").unwrap();
    master.flush().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline && dispatcher.state().current_signal != Some(6) {
        dispatcher.tick();
        std::thread::sleep(Duration::from_millis(10));
    }
    handle.join();

    let state = dispatcher.state();
    let history: Vec<u8> = state.history.iter().map(|e| e.signal_id).collect();
    assert_eq!(history, vec![4, 6]);
    assert_eq!(state.client_count, 1);
    drop(slave);
}
