//! Main application window: status bar, controls and the page area.

use gtk4 as gtk;
use gtk4::prelude::*;
use libadwaita as adw;
use libadwaita::prelude::*;
use std::rc::Rc;

use signal_kiosk::config;
use signal_kiosk::serial;
use signal_kiosk::state::{ClientStatus, ConnectionState};
use signal_kiosk::{KioskCommand, KioskEvent};

use crate::app::AppContext;
use crate::ui::history;
use crate::ui::page::PageView;

const CONNECTION_CLASSES: [&str; 3] = [
    "connection-connected",
    "connection-simulation",
    "connection-disconnected",
];

const CLIENT_CLASSES: [&str; 3] = ["clients-none", "clients-optimal", "clients-multiple"];

/// Main window observing the kiosk state
pub struct MainWindow {
    pub window: adw::ApplicationWindow,
    ctx: Rc<AppContext>,
    connection_label: gtk::Label,
    clients_label: gtk::Label,
    signal_label: gtk::Label,
    port_dropdown: gtk::DropDown,
    scan_button: gtk::Button,
    reconnect_button: gtk::Button,
    disconnect_button: gtk::Button,
    start_demo_button: gtk::Button,
    stop_demo_button: gtk::Button,
    history_button: gtk::Button,
    page: PageView,
}

impl MainWindow {
    pub fn new(app: &adw::Application, ctx: Rc<AppContext>, fullscreen: bool) -> Rc<Self> {
        let window = adw::ApplicationWindow::builder()
            .application(app)
            .title("Signal Kiosk")
            .default_width(1920)
            .default_height(1080)
            .build();

        if fullscreen {
            // Fullscreen once the window is mapped
            window.connect_map(|window| {
                let window = window.clone();
                glib::timeout_add_local_once(std::time::Duration::from_millis(100), move || {
                    window.fullscreen();
                });
            });
        }

        // === Status bar ===
        let status_bar = gtk::Box::new(gtk::Orientation::Horizontal, 16);
        status_bar.add_css_class("status-bar");
        status_bar.set_margin_start(24);
        status_bar.set_margin_end(24);
        status_bar.set_margin_top(12);
        status_bar.set_margin_bottom(12);

        let connection_label = gtk::Label::new(None);
        connection_label.add_css_class("connection-status");
        let clients_label = gtk::Label::new(None);
        clients_label.add_css_class("client-count");
        let signal_label = gtk::Label::new(None);
        signal_label.add_css_class("current-signal");

        let spacer = gtk::Box::new(gtk::Orientation::Horizontal, 0);
        spacer.set_hexpand(true);

        let port_dropdown = gtk::DropDown::from_strings(&[]);
        let scan_button = gtk::Button::with_label("Scan");
        let reconnect_button = gtk::Button::with_label("Reconnect");
        let disconnect_button = gtk::Button::with_label("Disconnect");
        let start_demo_button = gtk::Button::with_label("Start demo");
        let stop_demo_button = gtk::Button::with_label("Stop demo");
        let history_button = gtk::Button::with_label("History");

        status_bar.append(&connection_label);
        status_bar.append(&clients_label);
        status_bar.append(&signal_label);
        status_bar.append(&spacer);
        status_bar.append(&port_dropdown);
        status_bar.append(&scan_button);
        status_bar.append(&reconnect_button);
        status_bar.append(&disconnect_button);
        status_bar.append(&start_demo_button);
        status_bar.append(&stop_demo_button);
        status_bar.append(&history_button);

        // === Page area ===
        let page = PageView::new();

        let root = gtk::Box::new(gtk::Orientation::Vertical, 0);
        root.append(&status_bar);
        root.append(&page.container);
        window.set_content(Some(&root));

        let main_window = Rc::new(Self {
            window,
            ctx,
            connection_label,
            clients_label,
            signal_label,
            port_dropdown,
            scan_button,
            reconnect_button,
            disconnect_button,
            start_demo_button,
            stop_demo_button,
            history_button,
            page,
        });

        main_window.connect_handlers();
        main_window.refresh_ports();
        main_window.load_css();
        main_window.update_status();

        main_window
    }

    pub fn ctx(&self) -> &Rc<AppContext> {
        &self.ctx
    }

    fn load_css(&self) {
        let provider = gtk::CssProvider::new();
        provider.load_from_string(include_str!("../../resources/style.css"));

        match gtk::gdk::Display::default() {
            Some(display) => gtk::style_context_add_provider_for_display(
                &display,
                &provider,
                gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
            ),
            None => log::warn!("No display, skipping stylesheet"),
        }
    }

    /// Fill the port picker from a fresh scan, configured port selected
    fn refresh_ports(&self) {
        let configured = self.ctx.dispatcher.borrow().state().port.clone();
        let scanned = serial::scan_ports().unwrap_or_else(|e| {
            log::warn!("Port scan failed: {}", e);
            Vec::new()
        });

        let choices = serial::port_choices(&configured, &scanned);
        let names: Vec<&str> = choices.iter().map(String::as_str).collect();
        self.port_dropdown.set_model(Some(&gtk::StringList::new(&names)));
        self.port_dropdown.set_selected(0);
    }

    fn selected_port(&self) -> Option<String> {
        self.port_dropdown
            .selected_item()
            .and_downcast::<gtk::StringObject>()
            .map(|item| item.string().to_string())
    }

    /// Connect UI controls to state machine events
    fn connect_handlers(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.scan_button.connect_clicked(move |_| {
            if let Some(win) = weak.upgrade() {
                win.refresh_ports();
            }
        });

        let weak = Rc::downgrade(self);
        self.reconnect_button.connect_clicked(move |_| {
            if let Some(win) = weak.upgrade() {
                if let Some(port) = win.selected_port() {
                    win.dispatch(KioskEvent::SetPort { port });
                }
                win.dispatch(KioskEvent::Reconnect);
            }
        });

        let weak = Rc::downgrade(self);
        self.disconnect_button.connect_clicked(move |_| {
            if let Some(win) = weak.upgrade() {
                win.dispatch(KioskEvent::Disconnect);
            }
        });

        let weak = Rc::downgrade(self);
        self.start_demo_button.connect_clicked(move |_| {
            if let Some(win) = weak.upgrade() {
                win.dispatch(KioskEvent::StartDemo);
            }
        });

        let weak = Rc::downgrade(self);
        self.stop_demo_button.connect_clicked(move |_| {
            if let Some(win) = weak.upgrade() {
                win.dispatch(KioskEvent::StopDemo);
            }
        });

        let weak = Rc::downgrade(self);
        self.history_button.connect_clicked(move |_| {
            if let Some(win) = weak.upgrade() {
                let lines: Vec<String> = win
                    .ctx
                    .dispatcher
                    .borrow()
                    .state()
                    .recent_history(config::HISTORY_VIEW_LIMIT)
                    .iter()
                    .map(|entry| entry.summary())
                    .collect();
                history::show_history(&win.window, &lines);
            }
        });
    }

    fn dispatch(&self, event: KioskEvent) {
        let commands = self.ctx.process_event(event);
        self.handle_commands(&commands);
    }

    /// Render the effects of processed commands
    pub fn handle_commands(&self, commands: &[KioskCommand]) {
        let mut needs_update = false;

        for cmd in commands {
            match cmd {
                KioskCommand::ShowPage { signal_id } => {
                    let content = self.ctx.content.page(*signal_id);
                    self.page.render(*signal_id, &content);
                }
                KioskCommand::ShowError { message } => self.show_error(message),
                KioskCommand::UpdateUI => needs_update = true,
                _ => {}
            }
        }

        if needs_update {
            self.update_status();
        }
    }

    fn show_error(&self, message: &str) {
        let dialog = adw::AlertDialog::new(Some("Connection failed"), Some(message));
        dialog.add_response("ok", "OK");
        dialog.set_default_response(Some("ok"));
        dialog.set_close_response("ok");
        dialog.present(Some(&self.window));
    }

    /// Update the status bar to reflect current state
    fn update_status(&self) {
        let dispatcher = self.ctx.dispatcher.borrow();
        let state = dispatcher.state();

        self.connection_label.set_text(&state.connection.label());
        let connection_class = match state.connection {
            ConnectionState::Connected(_) => "connection-connected",
            ConnectionState::SimulationMode => "connection-simulation",
            ConnectionState::Disconnected => "connection-disconnected",
        };
        set_exclusive_class(&self.connection_label, &CONNECTION_CLASSES, connection_class);

        self.clients_label.set_text(&format!(
            "Clients: {} ({})",
            state.client_count,
            state.client_status.label()
        ));
        let client_class = match state.client_status {
            ClientStatus::NoConnection => "clients-none",
            ClientStatus::Optimal => "clients-optimal",
            ClientStatus::MultipleClients => "clients-multiple",
        };
        set_exclusive_class(&self.clients_label, &CLIENT_CLASSES, client_class);

        match state.current_signal {
            Some(id) => self
                .signal_label
                .set_text(&format!("Signal {}: {}", id, state.signal_name(id))),
            None => self.signal_label.set_text("Signal: --"),
        }

        let connected = state.is_connected();
        self.disconnect_button.set_sensitive(connected);
        self.start_demo_button.set_sensitive(!connected && !state.simulating);
        self.stop_demo_button.set_sensitive(state.simulating);
    }
}

fn set_exclusive_class(widget: &impl IsA<gtk::Widget>, classes: &[&str], active: &str) {
    for class in classes {
        if *class == active {
            widget.add_css_class(class);
        } else {
            widget.remove_css_class(class);
        }
    }
}
