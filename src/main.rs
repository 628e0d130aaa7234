//! Signal Kiosk - GTK4 front-end.
//!
//! Architecture:
//! - `signal_kiosk` library: serial reader, dispatcher and GTK-free state machine
//! - `app` module: bridges the dispatcher to GTK timers and the reader thread
//! - `ui` module: GTK4 widgets observing the state

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use gtk4::prelude::*;
use libadwaita as adw;

mod app;
mod ui;

use app::AppContext;
use signal_kiosk::config;
use signal_kiosk::content::ContentStore;
use signal_kiosk::KioskEvent;
use ui::MainWindow;

#[derive(Debug, Clone, Parser)]
#[command(name = "signal-kiosk", version, about = "Serial-driven signal page kiosk")]
struct Args {
    /// ESP32 serial port
    #[arg(long, default_value = config::DEFAULT_ESP32_PORT)]
    esp32_port: String,

    /// Page content file
    #[arg(long, default_value = config::CONTENT_FILE)]
    content: PathBuf,

    /// Run in a normal window instead of fullscreen
    #[arg(long)]
    windowed: bool,
}

fn main() -> glib::ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Starting Signal Kiosk on {}", args.esp32_port);

    let app = adw::Application::builder()
        .application_id("com.signalkiosk.kiosk")
        .build();

    app.connect_activate(move |app| {
        let content = ContentStore::load_or_default(&args.content);
        let ctx = AppContext::new(args.esp32_port.clone(), content);

        // Create main window (GTK layer)
        let main_window = MainWindow::new(app, ctx.clone(), !args.windowed);

        // Initial connection attempt; falls back to simulation on failure
        let commands = ctx.process_event(KioskEvent::Connect);
        main_window.handle_commands(&commands);

        // Drain the serial queue from the GTK main loop
        let window = main_window.clone();
        glib::timeout_add_local(Duration::from_millis(config::DISPATCH_INTERVAL_MS), move || {
            let commands = window.ctx().tick();
            if !commands.is_empty() {
                window.handle_commands(&commands);
            }
            glib::ControlFlow::Continue
        });

        main_window.window.present();
    });

    // Arguments were consumed by clap; keep GTK from parsing them again
    let exit = app.run_with_args(&Vec::<String>::new());

    log::info!("Signal Kiosk shutting down");
    exit
}
