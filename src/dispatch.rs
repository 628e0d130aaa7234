//! Event queue and the poll-driven signal dispatcher.
//!
//! Producers (the reader thread, the simulator) push `SerialEvent`s into an
//! unbounded channel. The host calls [`SignalDispatcher::tick`] from its own
//! timer; each tick drains everything queued so far and runs it through the
//! state machine in arrival order.

use tokio::sync::mpsc;

use crate::serial::SerialEvent;
use crate::state::{KioskCommand, KioskEvent, KioskStateMachine};

/// Producer side of the dispatch queue
pub type EventSender = mpsc::UnboundedSender<SerialEvent>;

/// Consumer side of the dispatch queue
pub type EventReceiver = mpsc::UnboundedReceiver<SerialEvent>;

/// Create the hand-off queue between producers and the dispatcher
pub fn event_queue() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Owns the kiosk state and the consumer end of the queue
pub struct SignalDispatcher {
    state: KioskStateMachine,
    rx: EventReceiver,
}

impl SignalDispatcher {
    pub fn new(state: KioskStateMachine, rx: EventReceiver) -> Self {
        Self { state, rx }
    }

    /// Read-only view for rendering
    pub fn state(&self) -> &KioskStateMachine {
        &self.state
    }

    /// Drain the queue and return the commands produced, in order.
    ///
    /// Every accepted signal yields its own `ShowPage`, even when the same id
    /// arrives several times within one tick.
    pub fn tick(&mut self) -> Vec<KioskCommand> {
        let mut commands = Vec::new();
        let mut drained = 0usize;

        while let Ok(event) = self.rx.try_recv() {
            drained += 1;
            commands.extend(self.state.process(KioskEvent::Serial(event)));
        }

        if drained > 1 {
            log::debug!("Dispatched {} queued events", drained);
        }

        commands
    }

    /// Apply a lifecycle or user event directly (UI thread only)
    pub fn process(&mut self, event: KioskEvent) -> Vec<KioskCommand> {
        self.state.process(event)
    }
}
