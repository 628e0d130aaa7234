//! Serial link to the ESP32: line framing, the background reader and port discovery.

pub mod frame;
pub mod ports;
pub mod reader;

use thiserror::Error;

pub use frame::{classify, Frame, LineFramer, SerialEvent};
pub use ports::{port_choices, scan_ports, PortInfo};
pub use reader::{LineSource, ReaderHandle, ReaderOptions};

#[derive(Error, Debug)]
pub enum SerialError {
    #[error("Failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("Failed to enumerate ports: {0}")]
    Enumerate(#[source] serialport::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
