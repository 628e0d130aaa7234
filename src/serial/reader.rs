//! Background serial reader.
//!
//! One dedicated thread per connection owns the port, polls for available
//! bytes, frames them into lines and pushes typed events onto the dispatch
//! queue. The thread only exits when its stop flag is set.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serialport::SerialPort;
use tokio::sync::mpsc;

use super::frame::{classify, Frame, LineFramer, SerialEvent};
use super::SerialError;
use crate::config;

/// Something the reader can pull complete lines from
pub trait LineSource: Send {
    /// Return the next complete line, or `None` when nothing is available yet.
    /// Must not block longer than the port's read timeout.
    fn poll_line(&mut self) -> io::Result<Option<String>>;
}

/// Reader behaviour knobs
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Log unrecognized lines verbatim (console monitor) instead of at debug level
    pub echo_unrecognized: bool,
    /// Sleep when the port has no data
    pub idle_poll: Duration,
    /// Pause after a read error
    pub error_pause: Duration,
    /// Wait after opening the port before reading (board reset on DTR)
    pub settle: Duration,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            echo_unrecognized: false,
            idle_poll: Duration::from_millis(config::IDLE_POLL_MS),
            error_pause: Duration::from_millis(config::READ_ERROR_PAUSE_MS),
            settle: Duration::from_millis(config::CONNECT_SETTLE_MS),
        }
    }
}

impl ReaderOptions {
    /// Options for the console monitor
    pub fn console() -> Self {
        Self {
            echo_unrecognized: true,
            ..Self::default()
        }
    }
}

/// Line source backed by a real serial port
pub struct SerialLineSource {
    port: Box<dyn SerialPort>,
    framer: LineFramer,
    pending: VecDeque<String>,
    buf: [u8; 256],
}

impl SerialLineSource {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            framer: LineFramer::new(),
            pending: VecDeque::new(),
            buf: [0u8; 256],
        }
    }
}

impl LineSource for SerialLineSource {
    fn poll_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.pending.pop_front() {
            return Ok(Some(line));
        }

        let available = self.port.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(None);
        }

        let want = available.min(self.buf.len());
        let n = match self.port.read(&mut self.buf[..want]) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
            Err(e) => return Err(e),
        };

        self.pending.extend(self.framer.push(&self.buf[..n]));
        Ok(self.pending.pop_front())
    }
}

/// Handle to a running reader thread
pub struct ReaderHandle {
    port_name: String,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Port (or source label) this reader is attached to
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Ask the reader to stop; it exits after its current iteration
    pub fn stop(&self) {
        log::info!("Stopping serial reader on {}", self.port_name);
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Whether the reader thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the reader and wait for the thread to exit
    pub fn join(mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Serial reader thread for {} panicked", self.port_name);
            }
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

/// Open a port with the link settings the firmware expects
pub fn open_port(port_name: &str) -> Result<Box<dyn SerialPort>, SerialError> {
    log::info!("Opening {} at {} baud", port_name, config::BAUD_RATE);
    let port = serialport::new(port_name, config::BAUD_RATE)
        .timeout(Duration::from_millis(config::READ_TIMEOUT_MS))
        .open()
        .map_err(|source| SerialError::Open {
            port: port_name.to_string(),
            source,
        })?;
    Ok(port)
}

/// Open `port_name` and start reading it on a dedicated thread
pub fn spawn(
    port_name: &str,
    tx: mpsc::UnboundedSender<SerialEvent>,
    options: ReaderOptions,
) -> Result<ReaderHandle, SerialError> {
    let port = open_port(port_name)?;
    spawn_source(port_name, SerialLineSource::new(port), tx, options)
}

/// Start a reader over an arbitrary line source
pub fn spawn_source<S>(
    label: &str,
    source: S,
    tx: mpsc::UnboundedSender<SerialEvent>,
    options: ReaderOptions,
) -> Result<ReaderHandle, SerialError>
where
    S: LineSource + 'static,
{
    let stop_flag = Arc::new(AtomicBool::new(false));
    let thread_flag = stop_flag.clone();
    let thread_label = label.to_string();

    let thread = std::thread::Builder::new()
        .name(format!("serial-reader-{}", label))
        .spawn(move || {
            if settle(&thread_flag, &options) {
                run_reader(source, &tx, &thread_flag, &options, &thread_label);
            }
        })
        .map_err(SerialError::Io)?;

    Ok(ReaderHandle {
        port_name: label.to_string(),
        stop_flag,
        thread: Some(thread),
    })
}

/// Wait out the board reset that opening the port triggers. Bytes sent
/// meanwhile stay buffered and are read afterwards. Returns `false` if the
/// reader was stopped while waiting.
fn settle(stop_flag: &AtomicBool, options: &ReaderOptions) -> bool {
    let deadline = Instant::now() + options.settle;
    let step = options.idle_poll.max(Duration::from_millis(1));

    while Instant::now() < deadline {
        if stop_flag.load(Ordering::SeqCst) {
            return false;
        }
        std::thread::sleep(step);
    }
    !stop_flag.load(Ordering::SeqCst)
}

/// Read loop. Runs until `stop_flag` is set; errors never end it.
pub fn run_reader<S: LineSource>(
    mut source: S,
    tx: &mpsc::UnboundedSender<SerialEvent>,
    stop_flag: &AtomicBool,
    options: &ReaderOptions,
    label: &str,
) {
    log::info!("Serial reader started on {}", label);

    while !stop_flag.load(Ordering::SeqCst) {
        match source.poll_line() {
            Ok(Some(line)) => handle_line(&line, tx, options),
            Ok(None) => std::thread::sleep(options.idle_poll),
            Err(e) => {
                log::warn!("Serial read error on {}: {}", label, e);
                std::thread::sleep(options.error_pause);
            }
        }
    }

    log::info!("Serial reader on {} stopped", label);
}

fn handle_line(line: &str, tx: &mpsc::UnboundedSender<SerialEvent>, options: &ReaderOptions) {
    match classify(line) {
        Frame::Event(event) => {
            log::debug!("Received {:?}", event);
            if tx.send(event).is_err() {
                log::debug!("Dispatch queue closed, dropping {:?}", event);
            }
        }
        Frame::Malformed => {
            log::debug!("Dropping malformed frame: {:?}", line);
        }
        Frame::Other => {
            let line = line.trim();
            if line.is_empty() {
                return;
            }
            if options.echo_unrecognized {
                log::info!("Device: {}", line);
            } else {
                log::debug!("Ignoring line: {}", line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted source: yields each step once, then reports idle forever
    struct ScriptedSource {
        steps: VecDeque<io::Result<Option<String>>>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<io::Result<Option<String>>>) -> Self {
            Self {
                steps: steps.into_iter().collect(),
            }
        }
    }

    impl LineSource for ScriptedSource {
        fn poll_line(&mut self) -> io::Result<Option<String>> {
            match self.steps.pop_front() {
                Some(step) => step,
                None => Ok(None),
            }
        }
    }

    fn fast_options() -> ReaderOptions {
        ReaderOptions {
            echo_unrecognized: false,
            idle_poll: Duration::from_millis(1),
            error_pause: Duration::from_millis(1),
            settle: Duration::ZERO,
        }
    }

    fn line(s: &str) -> io::Result<Option<String>> {
        Ok(Some(s.to_string()))
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SerialEvent>) -> Vec<SerialEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn wait_for(rx: &mut mpsc::UnboundedReceiver<SerialEvent>, n: usize) -> Vec<SerialEvent> {
        let mut events = Vec::new();
        for _ in 0..500 {
            events.extend(drain(rx));
            if events.len() >= n {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        events
    }

    #[test]
    fn test_reader_enqueues_recognized_frames() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = ScriptedSource::new(vec![
            line("boot: ESP32 ready"),
            line("SIGNAL:3"),
            line("Clients:2"),
            line("SIGNAL:11"),
        ]);

        let handle = spawn_source("test", source, tx, fast_options()).unwrap();
        let events = wait_for(&mut rx, 3);
        handle.join();

        assert_eq!(
            events,
            vec![
                SerialEvent::SignalChanged { id: 3 },
                SerialEvent::ClientCountChanged { count: 2 },
                SerialEvent::SignalChanged { id: 11 },
            ]
        );
    }

    #[test]
    fn test_reader_survives_errors_and_malformed_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = ScriptedSource::new(vec![
            line("SIGNAL:abc"),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged")),
            line("Clients:"),
            Err(io::Error::new(io::ErrorKind::InvalidData, "garbage")),
            line("SIGNAL:5"),
        ]);

        let handle = spawn_source("test", source, tx, fast_options()).unwrap();
        let events = wait_for(&mut rx, 1);
        handle.join();

        assert_eq!(events, vec![SerialEvent::SignalChanged { id: 5 }]);
    }

    #[test]
    fn test_reader_stops_on_flag() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let source = ScriptedSource::new(Vec::new());

        let handle = spawn_source("idle", source, tx, fast_options()).unwrap();
        assert_eq!(handle.port_name(), "idle");
        handle.stop();

        for _ in 0..500 {
            if !handle.is_running() {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(!handle.is_running());
    }

    #[test]
    fn test_run_reader_returns_immediately_when_stopped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let stop = AtomicBool::new(true);
        let source = ScriptedSource::new(vec![line("SIGNAL:1")]);

        run_reader(source, &tx, &stop, &fast_options(), "stopped");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_settle_delays_but_keeps_buffered_frames() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = ScriptedSource::new(vec![line("SIGNAL:4"), line("Clients:1")]);
        let options = ReaderOptions {
            settle: Duration::from_millis(150),
            ..fast_options()
        };

        let started = Instant::now();
        let handle = spawn_source("settling", source, tx, options).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(drain(&mut rx).is_empty());

        let events = wait_for(&mut rx, 2);
        handle.join();

        assert!(started.elapsed() >= Duration::from_millis(150));
        assert_eq!(
            events,
            vec![
                SerialEvent::SignalChanged { id: 4 },
                SerialEvent::ClientCountChanged { count: 1 },
            ]
        );
    }

    #[test]
    fn test_stop_during_settle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = ScriptedSource::new(vec![line("SIGNAL:4")]);
        let options = ReaderOptions {
            settle: Duration::from_secs(30),
            ..fast_options()
        };

        let started = Instant::now();
        let handle = spawn_source("settling", source, tx, options).unwrap();
        handle.join();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_reader_keeps_running_without_consumer() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let source = ScriptedSource::new(vec![line("SIGNAL:1"), line("SIGNAL:2")]);

        let handle = spawn_source("orphan", source, tx, fast_options()).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(handle.is_running());
        handle.join();
    }
}
