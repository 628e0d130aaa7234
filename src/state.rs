//! GTK-free state machine for the signal kiosk.
//!
//! This module holds everything the UI shows (current signal, client count,
//! connection state, history) and the pure transition function that turns
//! events into commands. The GTK layer and the console monitor execute the
//! commands and observe the state; neither mutates it directly.

use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::config;
use crate::serial::SerialEvent;

/// Serial link status shown by the status indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected(String),
    SimulationMode,
}

impl ConnectionState {
    pub fn label(&self) -> String {
        match self {
            ConnectionState::Disconnected => "Disconnected".to_string(),
            ConnectionState::Connected(port) => format!("Connected ({})", port),
            ConnectionState::SimulationMode => "Simulation mode".to_string(),
        }
    }
}

/// Classification of the client count reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    /// Nobody is connected to the device
    NoConnection,
    /// Exactly one client, the expected setup
    Optimal,
    /// More than one client
    MultipleClients,
}

impl ClientStatus {
    pub fn from_count(count: u64) -> Self {
        match count {
            0 => ClientStatus::NoConnection,
            1 => ClientStatus::Optimal,
            _ => ClientStatus::MultipleClients,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClientStatus::NoConnection => "No connection",
            ClientStatus::Optimal => "Optimal",
            ClientStatus::MultipleClients => "Multiple clients",
        }
    }
}

/// One accepted signal
#[derive(Debug, Clone)]
pub struct SignalHistoryEntry {
    pub signal_id: u8,
    pub display_name: String,
    pub timestamp: DateTime<Local>,
}

impl SignalHistoryEntry {
    /// `HH:MM:SS - Signal N: Name`
    pub fn summary(&self) -> String {
        format!(
            "{} - Signal {}: {}",
            self.timestamp.format("%H:%M:%S"),
            self.signal_id,
            self.display_name
        )
    }
}

/// Bounded FIFO of accepted signals; the oldest entry is evicted first
#[derive(Debug, Clone)]
pub struct SignalHistory {
    entries: VecDeque<SignalHistoryEntry>,
    capacity: usize,
}

impl SignalHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: SignalHistoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in arrival order (oldest first)
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SignalHistoryEntry> {
        self.entries.iter()
    }

    /// Newest `limit` entries, newest first
    pub fn recent(&self, limit: usize) -> Vec<&SignalHistoryEntry> {
        self.entries.iter().rev().take(limit).collect()
    }
}

impl Default for SignalHistory {
    fn default() -> Self {
        Self::with_capacity(config::HISTORY_CAPACITY)
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum KioskEvent {
    /// Frame from the reader or the simulator
    Serial(SerialEvent),

    // Connection lifecycle (reported by the host after executing OpenSerial)
    Connected { port: String },
    ConnectionFailed { port: String, error: String },

    // User / startup actions
    /// Initial connection attempt at startup
    Connect,
    /// Explicit reconnect; failures are reported to the user
    Reconnect,
    Disconnect,
    SetPort { port: String },
    StartDemo,
    StopDemo,
}

impl From<SerialEvent> for KioskEvent {
    fn from(event: SerialEvent) -> Self {
        KioskEvent::Serial(event)
    }
}

/// Commands emitted by the state machine for the host to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskCommand {
    /// Load and render the content record for this page
    ShowPage { signal_id: u8 },
    /// Open the port and start a reader thread
    OpenSerial { port: String },
    /// Stop the reader thread, if any
    CloseSerial,
    /// (Re)start the simulation timer, cancelling any pending one
    StartSimulation,
    /// Cancel the simulation timer
    StopSimulation,
    /// Tell the user something failed
    ShowError { message: String },
    /// Refresh status widgets
    UpdateUI,
}

/// The kiosk state machine
#[derive(Debug)]
pub struct KioskStateMachine {
    pub connection: ConnectionState,
    pub current_signal: Option<u8>,
    pub client_count: u64,
    pub client_status: ClientStatus,
    pub history: SignalHistory,
    /// Port used by Connect / Reconnect
    pub port: String,
    /// Whether the simulation timer is running
    pub simulating: bool,
    /// Accepted signals since startup
    pub signals_received: u64,
    reconnecting: bool,
    signal_names: Vec<String>,
}

impl Default for KioskStateMachine {
    fn default() -> Self {
        Self::new(config::DEFAULT_ESP32_PORT)
    }
}

impl KioskStateMachine {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            current_signal: None,
            client_count: 0,
            client_status: ClientStatus::NoConnection,
            history: SignalHistory::default(),
            port: port.into(),
            simulating: false,
            signals_received: 0,
            reconnecting: false,
            signal_names: (config::SIGNAL_MIN..=config::SIGNAL_MAX)
                .map(config::default_signal_name)
                .collect(),
        }
    }

    /// Replace the page titles used for history entries
    pub fn with_signal_names(mut self, names: Vec<String>) -> Self {
        self.signal_names = names;
        self
    }

    /// Display name for a valid signal id
    pub fn signal_name(&self, signal_id: u8) -> String {
        self.signal_names
            .get(usize::from(signal_id).wrapping_sub(1))
            .cloned()
            .unwrap_or_else(|| config::default_signal_name(signal_id))
    }

    /// Whether a device link is open (Disconnect is only meaningful then)
    pub fn is_connected(&self) -> bool {
        matches!(self.connection, ConnectionState::Connected(_))
    }

    /// Newest history entries for the history view
    pub fn recent_history(&self, limit: usize) -> Vec<&SignalHistoryEntry> {
        self.history.recent(limit)
    }

    /// Process an event and return commands to execute
    pub fn process(&mut self, event: KioskEvent) -> Vec<KioskCommand> {
        let mut commands = Vec::new();

        match event {
            KioskEvent::Serial(SerialEvent::SignalChanged { id }) => {
                if !config::is_valid_signal(id) {
                    log::warn!("Ignoring unknown signal: {}", id);
                    return commands;
                }
                let signal_id = id as u8;
                let display_name = self.signal_name(signal_id);

                self.current_signal = Some(signal_id);
                self.signals_received += 1;
                log::info!(
                    "Signal {}: {} (#{})",
                    signal_id,
                    display_name,
                    self.signals_received
                );
                self.history.push(SignalHistoryEntry {
                    signal_id,
                    display_name,
                    timestamp: Local::now(),
                });

                commands.push(KioskCommand::ShowPage { signal_id });
                commands.push(KioskCommand::UpdateUI);
            }

            KioskEvent::Serial(SerialEvent::ClientCountChanged { count }) => {
                self.client_count = count;
                self.client_status = ClientStatus::from_count(count);
                commands.push(KioskCommand::UpdateUI);
            }

            KioskEvent::Connect => {
                self.reconnecting = false;
                commands.push(KioskCommand::OpenSerial {
                    port: self.port.clone(),
                });
            }

            KioskEvent::Reconnect => {
                self.reconnecting = true;
                commands.push(KioskCommand::CloseSerial);
                commands.push(KioskCommand::OpenSerial {
                    port: self.port.clone(),
                });
            }

            KioskEvent::Connected { port } => {
                log::info!("Connected to {}", port);
                self.connection = ConnectionState::Connected(port);
                self.reconnecting = false;
                if self.simulating {
                    self.simulating = false;
                    commands.push(KioskCommand::StopSimulation);
                }
                commands.push(KioskCommand::UpdateUI);
            }

            KioskEvent::ConnectionFailed { port, error } => {
                log::warn!("Cannot connect to {}: {}", port, error);
                self.connection = ConnectionState::SimulationMode;
                if self.reconnecting {
                    self.reconnecting = false;
                    commands.push(KioskCommand::ShowError {
                        message: format!("Cannot connect to {}:\n{}", port, error),
                    });
                }
                if !self.simulating {
                    self.simulating = true;
                    commands.push(KioskCommand::StartSimulation);
                }
                commands.push(KioskCommand::UpdateUI);
            }

            KioskEvent::Disconnect => {
                if self.is_connected() {
                    log::info!("Disconnecting from {}", self.port);
                    self.connection = ConnectionState::Disconnected;
                    commands.push(KioskCommand::CloseSerial);
                    commands.push(KioskCommand::UpdateUI);
                }
            }

            KioskEvent::SetPort { port } => {
                if port != self.port {
                    log::info!("Device port set to {}", port);
                    self.port = port;
                    commands.push(KioskCommand::UpdateUI);
                }
            }

            KioskEvent::StartDemo => {
                if self.is_connected() {
                    log::warn!("Demo not started: a device is connected");
                    return commands;
                }
                self.connection = ConnectionState::SimulationMode;
                self.simulating = true;
                commands.push(KioskCommand::StartSimulation);
                commands.push(KioskCommand::UpdateUI);
            }

            KioskEvent::StopDemo => {
                if self.simulating {
                    self.simulating = false;
                    commands.push(KioskCommand::StopSimulation);
                    commands.push(KioskCommand::UpdateUI);
                }
            }
        }

        commands
    }
}
