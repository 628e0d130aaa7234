//! Configuration constants for the signal kiosk.

/// Default serial port of the ESP32 receiver
pub const DEFAULT_ESP32_PORT: &str = "/dev/ttyUSB0";

/// Default serial port of the Arduino GIGA sender
pub const DEFAULT_GIGA_PORT: &str = "/dev/ttyACM0";

/// Serial baud rate used by both boards
pub const BAUD_RATE: u32 = 115_200;

/// Serial read timeout in milliseconds
pub const READ_TIMEOUT_MS: u64 = 1000;

/// Pause after a failed read before retrying
pub const READ_ERROR_PAUSE_MS: u64 = 100;

/// Sleep between availability checks when the port is idle
pub const IDLE_POLL_MS: u64 = 10;

/// Time the ESP32 needs to boot after the port is opened (DTR reset)
pub const CONNECT_SETTLE_MS: u64 = 2000;

/// Dispatch tick interval for the kiosk UI
pub const DISPATCH_INTERVAL_MS: u64 = 50;

/// Dispatch tick interval for the console monitor
pub const MONITOR_INTERVAL_MS: u64 = 100;

/// Simulation timer interval in milliseconds
pub const SIMULATION_INTERVAL_MS: u64 = 5000;

/// Upper bound (inclusive) of the simulated client count
pub const SIMULATION_MAX_CLIENTS: u64 = 3;

/// Maximum number of retained signal history entries
pub const HISTORY_CAPACITY: usize = 100;

/// Number of entries shown by the history view
pub const HISTORY_VIEW_LIMIT: usize = 20;

/// Lowest valid signal id
pub const SIGNAL_MIN: u8 = 1;

/// Highest valid signal id
pub const SIGNAL_MAX: u8 = 10;

/// Number of content pages (one per signal)
pub const PAGE_COUNT: usize = SIGNAL_MAX as usize;

/// Frame prefix carrying a signal id
pub const SIGNAL_PREFIX: &str = "SIGNAL:";

/// Frame prefix carrying the connected client count
pub const CLIENTS_PREFIX: &str = "Clients:";

/// Default content store file
pub const CONTENT_FILE: &str = "content.json";

/// Content type used for the signal pages
pub const SIGNAL_CONTENT_TYPE: &str = "signal";

/// External firmware toolchain binary
pub const ARDUINO_CLI: &str = "arduino-cli";

/// Compile step timeout in seconds
pub const COMPILE_TIMEOUT_SECS: u64 = 120;

/// Upload step timeout in seconds
pub const UPLOAD_TIMEOUT_SECS: u64 = 60;

/// Pause between flashing the GIGA and the ESP32
pub const FLASH_SETTLE_MS: u64 = 2000;

/// Default sketch directory for the ESP32 receiver
pub const ESP32_SKETCH_DIR: &str = "Arduino/ESP32_UDP_Receiver/";

/// Default sketch directory for the GIGA sender
pub const GIGA_SKETCH_DIR: &str = "Arduino/GIGA_UDP_Sender/";

/// Built-in page titles, indexed by `signal_id - 1`
pub const DEFAULT_SIGNAL_NAMES: [&str; PAGE_COUNT] = [
    "System Start",
    "Acceleration",
    "Stabilization",
    "Inspection",
    "Halftime",
    "Engine Check",
    "Sensor Activation",
    "Braking",
    "Final Phase",
    "System Reset",
];

/// Check whether a raw signal value names one of the content pages
pub fn is_valid_signal(id: i64) -> bool {
    (i64::from(SIGNAL_MIN)..=i64::from(SIGNAL_MAX)).contains(&id)
}

/// Built-in display name for a signal id
pub fn default_signal_name(id: u8) -> String {
    match DEFAULT_SIGNAL_NAMES.get(usize::from(id).wrapping_sub(1)) {
        Some(name) => (*name).to_string(),
        None => format!("Signal {}", id),
    }
}
