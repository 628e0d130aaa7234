//! Simulation fallback: synthesizes the device's event stream when no board
//! is attached.
//!
//! The simulator is a second producer into the dispatch queue. It does not own
//! a timer; the host schedules [`Simulator::tick`] every
//! [`config::SIMULATION_INTERVAL_MS`] with the ticket returned by
//! [`Simulator::start`]. Restarting or stopping invalidates older tickets, so
//! a timer chain that was not cancelled in time becomes a no-op.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::config;
use crate::dispatch::EventSender;
use crate::serial::SerialEvent;

/// Identifies one timer chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationTicket(u64);

/// Cyclic signal generator with a pseudo-random client count
#[derive(Debug)]
pub struct Simulator {
    start_signal: u8,
    next_signal: u8,
    max_clients: u64,
    generation: u64,
    running: bool,
    rng: XorShift64,
}

impl Simulator {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E37_79B9_7F4A_7C15);
        Self::with_seed(seed)
    }

    /// Deterministic client counts, for tests and reproducible demos
    pub fn with_seed(seed: u64) -> Self {
        Self {
            start_signal: config::SIGNAL_MIN,
            next_signal: config::SIGNAL_MIN,
            max_clients: config::SIMULATION_MAX_CLIENTS,
            generation: 0,
            running: false,
            rng: XorShift64::new(seed),
        }
    }

    /// Begin the cycle at `signal` instead of 1
    pub fn starting_at(mut self, signal: u8) -> Self {
        self.start_signal = signal.clamp(config::SIGNAL_MIN, config::SIGNAL_MAX);
        self.next_signal = self.start_signal;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start a new timer chain. Any previous ticket stops producing events.
    pub fn start(&mut self) -> SimulationTicket {
        self.generation += 1;
        self.running = true;
        self.next_signal = self.start_signal;
        log::info!("Simulation started at signal {}", self.start_signal);
        SimulationTicket(self.generation)
    }

    /// Cancel the current timer chain
    pub fn stop(&mut self) {
        if self.running {
            log::info!("Simulation stopped");
        }
        self.generation += 1;
        self.running = false;
    }

    /// Whether a timer holding `ticket` should keep firing
    pub fn is_current(&self, ticket: SimulationTicket) -> bool {
        self.running && ticket.0 == self.generation
    }

    /// Produce the events for one timer expiry, or `None` for a stale ticket
    pub fn tick(&mut self, ticket: SimulationTicket) -> Option<[SerialEvent; 2]> {
        if !self.is_current(ticket) {
            return None;
        }

        let id = self.next_signal;
        self.next_signal = if id >= config::SIGNAL_MAX {
            config::SIGNAL_MIN
        } else {
            id + 1
        };
        let count = self.rng.next_u64() % (self.max_clients + 1);

        log::debug!("Simulated signal {} with {} clients", id, count);
        Some([
            SerialEvent::SignalChanged { id: i64::from(id) },
            SerialEvent::ClientCountChanged { count },
        ])
    }

    /// Tick and enqueue. Returns `false` once the ticket is stale so the
    /// caller can drop its timer.
    pub fn tick_into(&mut self, ticket: SimulationTicket, tx: &EventSender) -> bool {
        match self.tick(ticket) {
            Some(events) => {
                for event in events {
                    let _ = tx.send(event);
                }
                true
            }
            None => false,
        }
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct XorShift64(u64);

impl XorShift64 {
    fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift
        Self(if seed == 0 { 0x2545_F491_4F6C_DD1D } else { seed })
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}
