//! Headless companion tool: console signal monitor, port scan and firmware flashing.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use signal_kiosk::config;
use signal_kiosk::content::ContentStore;
use signal_kiosk::firmware::{self, ArduinoCli, Board, FlashError};
use signal_kiosk::serial::{self, reader, ReaderOptions, SerialError};
use signal_kiosk::simulation::Simulator;
use signal_kiosk::{event_queue, KioskCommand, KioskEvent, KioskStateMachine, SignalDispatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Print signals received from the ESP32
    Monitor,
    /// Compile and upload the ESP32 receiver sketch
    FlashEsp32,
    /// Compile and upload the GIGA sender sketch
    FlashGiga,
    /// Flash the GIGA, then the ESP32
    FlashBoth,
    /// List candidate serial ports
    Scan,
    /// Run the simulated signal stream without hardware
    Demo,
}

#[derive(Debug, Parser)]
#[command(name = "signal-cli", version, about = "Signal kiosk monitor and flash tool")]
struct Args {
    /// ESP32 serial port
    #[arg(long, default_value = config::DEFAULT_ESP32_PORT)]
    esp32_port: String,

    /// Arduino GIGA serial port
    #[arg(long, default_value = config::DEFAULT_GIGA_PORT)]
    giga_port: String,

    /// What to do
    #[arg(long, value_enum, default_value_t = Action::Monitor)]
    action: Action,

    /// Directory containing the Arduino/ sketch folders
    #[arg(long, default_value = ".")]
    sketch_root: PathBuf,

    /// Page content file (used for signal names)
    #[arg(long, default_value = config::CONTENT_FILE)]
    content: PathBuf,

    /// Print `scan` results as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Signal kiosk CLI ({:?})", args.action);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Failed to create tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let ok = runtime.block_on(async {
        match args.action {
            Action::Scan => report(scan(args.json)),
            Action::Monitor => report(monitor(&args).await),
            Action::Demo => {
                demo(&args).await;
                true
            }
            Action::FlashEsp32 => report(flash_one(&args, Board::Esp32, &args.esp32_port).await),
            Action::FlashGiga => report(flash_one(&args, Board::Giga, &args.giga_port).await),
            Action::FlashBoth => report(flash_both(&args).await),
        }
    });

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn report<E: std::fmt::Display>(result: Result<(), E>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::error!("{}", e);
            false
        }
    }
}

fn new_dispatcher(args: &Args) -> (signal_kiosk::EventSender, SignalDispatcher) {
    let store = ContentStore::load_or_default(&args.content);
    let (tx, rx) = event_queue();
    let state = KioskStateMachine::new(args.esp32_port.clone())
        .with_signal_names(store.display_names());
    (tx, SignalDispatcher::new(state, rx))
}

/// Drain one tick and report client count changes
fn console_tick(dispatcher: &mut SignalDispatcher) {
    let before = dispatcher.state().client_count;
    let commands = dispatcher.tick();
    let state = dispatcher.state();
    if commands.contains(&KioskCommand::UpdateUI) && state.client_count != before {
        log::info!(
            "Clients: {} ({})",
            state.client_count,
            state.client_status.label()
        );
    }
}

#[derive(Debug, thiserror::Error)]
enum ScanError {
    #[error(transparent)]
    Serial(#[from] SerialError),
    #[error("Failed to encode port list: {0}")]
    Json(#[from] serde_json::Error),
}

fn scan(json: bool) -> Result<(), ScanError> {
    let ports = serial::scan_ports()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
    } else {
        for port in ports {
            let product = port.product.as_deref().unwrap_or("-");
            println!("{}\t{}\t{}", port.port_name, port.port_type, product);
        }
    }
    Ok(())
}

async fn monitor(args: &Args) -> Result<(), SerialError> {
    let (tx, mut dispatcher) = new_dispatcher(args);

    let handle = reader::spawn(&args.esp32_port, tx, ReaderOptions::console())?;
    dispatcher.process(KioskEvent::Connected {
        port: args.esp32_port.clone(),
    });
    log::info!("Monitoring {} - press Ctrl+C to stop", args.esp32_port);

    let mut interval = tokio::time::interval(Duration::from_millis(config::MONITOR_INTERVAL_MS));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = interval.tick() => console_tick(&mut dispatcher),
        }
    }

    // Pick up anything that arrived while shutting down
    console_tick(&mut dispatcher);
    dispatcher.process(KioskEvent::Disconnect);
    log::info!(
        "Monitoring stopped after {} signals",
        dispatcher.state().signals_received
    );

    if tokio::task::spawn_blocking(move || handle.join()).await.is_err() {
        log::warn!("Serial reader did not shut down cleanly");
    }
    Ok(())
}

async fn demo(args: &Args) {
    let (tx, mut dispatcher) = new_dispatcher(args);
    let mut simulator = Simulator::new();
    let mut ticket = None;

    for cmd in dispatcher.process(KioskEvent::StartDemo) {
        if cmd == KioskCommand::StartSimulation {
            ticket = Some(simulator.start());
        }
    }
    let Some(ticket) = ticket else {
        return;
    };
    log::info!("Demo running - press Ctrl+C to stop");

    let mut timer = tokio::time::interval(Duration::from_millis(config::SIMULATION_INTERVAL_MS));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = timer.tick() => {
                if !simulator.tick_into(ticket, &tx) {
                    break;
                }
                console_tick(&mut dispatcher);
            }
        }
    }

    dispatcher.process(KioskEvent::StopDemo);
    simulator.stop();
}

async fn prepare_toolchain(args: &Args) -> Result<ArduinoCli, FlashError> {
    let cli = ArduinoCli::new().with_sketch_root(&args.sketch_root);
    cli.check().await?;
    Ok(cli)
}

async fn flash_one(args: &Args, board: Board, port: &str) -> Result<(), FlashError> {
    if !firmware::sketch_exists(&args.sketch_root, board) {
        log::warn!(
            "Sketch directory {} not found",
            args.sketch_root.join(board.sketch_dir()).display()
        );
    }
    let cli = prepare_toolchain(args).await?;
    cli.flash(board, port).await
}

async fn flash_both(args: &Args) -> Result<(), FlashError> {
    let cli = prepare_toolchain(args).await?;
    cli.flash_both(&args.giga_port, &args.esp32_port).await
}
