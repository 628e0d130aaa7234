//! Signal Kiosk - serial-driven content pages for ESP32 / Arduino GIGA setups.
//!
//! Architecture:
//! - `serial` module: line framing, background reader thread, port discovery
//! - `dispatch` module: event queue and the poll-driven dispatcher
//! - `state` module: GTK-free state machine (testable)
//! - `simulation` module: synthetic event stream when no board is attached
//! - `content` module: page records rendered by the kiosk
//! - `firmware` module: `arduino-cli` compile/upload wrapper

pub mod config;
pub mod content;
pub mod dispatch;
pub mod firmware;
pub mod serial;
pub mod simulation;
pub mod state;

pub use dispatch::{event_queue, EventReceiver, EventSender, SignalDispatcher};
pub use serial::SerialEvent;
pub use state::{KioskCommand, KioskEvent, KioskStateMachine};
