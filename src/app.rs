//! Application context - bridges the GTK-free dispatcher with GTK and the
//! serial reader thread.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use signal_kiosk::config;
use signal_kiosk::content::ContentStore;
use signal_kiosk::serial::{reader, ReaderHandle, ReaderOptions};
use signal_kiosk::simulation::Simulator;
use signal_kiosk::{
    event_queue, EventSender, KioskCommand, KioskEvent, KioskStateMachine, SignalDispatcher,
};

/// Application context - holds state and executes state machine commands
pub struct AppContext {
    /// Dispatcher owning the kiosk state and the event queue consumer
    pub dispatcher: RefCell<SignalDispatcher>,
    /// Page records rendered on `ShowPage`
    pub content: ContentStore,
    /// Producer handle shared by the reader thread and the simulator
    event_tx: EventSender,
    /// Running reader thread, if connected
    reader: RefCell<Option<ReaderHandle>>,
    simulator: RefCell<Simulator>,
    demo_timer: RefCell<Option<glib::SourceId>>,
}

impl AppContext {
    pub fn new(port: String, content: ContentStore) -> Rc<Self> {
        let (event_tx, rx) = event_queue();
        let state = KioskStateMachine::new(port).with_signal_names(content.display_names());

        Rc::new(Self {
            dispatcher: RefCell::new(SignalDispatcher::new(state, rx)),
            content,
            event_tx,
            reader: RefCell::new(None),
            simulator: RefCell::new(Simulator::new()),
            demo_timer: RefCell::new(None),
        })
    }

    /// One dispatch tick: drain the queue and execute resulting commands.
    /// Returns every command produced so the window can render.
    pub fn tick(self: &Rc<Self>) -> Vec<KioskCommand> {
        let commands = self.dispatcher.borrow_mut().tick();
        self.execute(commands)
    }

    /// Process a lifecycle or user event (GTK main loop only)
    pub fn process_event(self: &Rc<Self>, event: KioskEvent) -> Vec<KioskCommand> {
        let commands = self.dispatcher.borrow_mut().process(event);
        self.execute(commands)
    }

    fn execute(self: &Rc<Self>, commands: Vec<KioskCommand>) -> Vec<KioskCommand> {
        let mut all = Vec::with_capacity(commands.len());
        for cmd in commands {
            let follow_up = self.execute_command(&cmd);
            all.push(cmd);
            all.extend(follow_up);
        }
        all
    }

    /// Execute a command from the state machine. Rendering commands are left
    /// to the window.
    fn execute_command(self: &Rc<Self>, cmd: &KioskCommand) -> Vec<KioskCommand> {
        match cmd {
            KioskCommand::OpenSerial { port } => {
                match reader::spawn(port, self.event_tx.clone(), ReaderOptions::default()) {
                    Ok(handle) => {
                        *self.reader.borrow_mut() = Some(handle);
                        self.process_event(KioskEvent::Connected { port: port.clone() })
                    }
                    Err(e) => {
                        log::error!("Serial connection failed: {}", e);
                        self.process_event(KioskEvent::ConnectionFailed {
                            port: port.clone(),
                            error: e.to_string(),
                        })
                    }
                }
            }

            KioskCommand::CloseSerial => {
                // Release the port before a reconnect reopens it
                let handle = self.reader.borrow_mut().take();
                if let Some(handle) = handle {
                    handle.join();
                }
                Vec::new()
            }

            KioskCommand::StartSimulation => {
                self.cancel_demo_timer();
                let ticket = self.simulator.borrow_mut().start();

                let weak = Rc::downgrade(self);
                let source = glib::timeout_add_local(
                    Duration::from_millis(config::SIMULATION_INTERVAL_MS),
                    move || {
                        let Some(ctx) = weak.upgrade() else {
                            return glib::ControlFlow::Break;
                        };
                        if ctx.simulator.borrow_mut().tick_into(ticket, &ctx.event_tx) {
                            glib::ControlFlow::Continue
                        } else {
                            glib::ControlFlow::Break
                        }
                    },
                );
                *self.demo_timer.borrow_mut() = Some(source);
                Vec::new()
            }

            KioskCommand::StopSimulation => {
                self.cancel_demo_timer();
                self.simulator.borrow_mut().stop();
                Vec::new()
            }

            KioskCommand::ShowPage { .. }
            | KioskCommand::ShowError { .. }
            | KioskCommand::UpdateUI => {
                // Handled by the window after processing events
                Vec::new()
            }
        }
    }

    fn cancel_demo_timer(&self) {
        if let Some(source) = self.demo_timer.borrow_mut().take() {
            source.remove();
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        if let Some(handle) = self.reader.get_mut().take() {
            handle.stop();
        }
    }
}
