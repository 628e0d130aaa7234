//! Firmware compile/upload through `arduino-cli`.
//!
//! The kiosk only needs pass/fail from the toolchain, so this is a thin
//! process wrapper: every step is a child process with a timeout, and a
//! non-zero exit becomes a [`FlashError`] carrying the tool's stderr.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

use crate::config;

#[derive(Error, Debug)]
pub enum FlashError {
    #[error("{0} not found in PATH")]
    ToolNotFound(String),
    #[error("{board} compile failed: {stderr}")]
    Compile { board: Board, stderr: String },
    #[error("{board} upload failed: {stderr}")]
    Upload { board: Board, stderr: String },
    #[error("{step} timed out after {secs}s")]
    Timeout { step: String, secs: u64 },
    #[error("Failed to run toolchain: {0}")]
    Io(#[from] io::Error),
}

/// Supported boards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    /// ESP32 receiver attached to the kiosk
    Esp32,
    /// Arduino GIGA sender
    Giga,
}

impl Board {
    pub fn fqbn(&self) -> &'static str {
        match self {
            Board::Esp32 => "esp32:esp32:esp32",
            Board::Giga => "arduino:mbed_giga:giga",
        }
    }

    pub fn sketch_dir(&self) -> &'static str {
        match self {
            Board::Esp32 => config::ESP32_SKETCH_DIR,
            Board::Giga => config::GIGA_SKETCH_DIR,
        }
    }

    pub fn default_port(&self) -> &'static str {
        match self {
            Board::Esp32 => config::DEFAULT_ESP32_PORT,
            Board::Giga => config::DEFAULT_GIGA_PORT,
        }
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Board::Esp32 => write!(f, "ESP32"),
            Board::Giga => write!(f, "Arduino GIGA"),
        }
    }
}

/// `arduino-cli` invocation settings
#[derive(Debug, Clone)]
pub struct ArduinoCli {
    program: String,
    sketch_root: PathBuf,
    compile_timeout: Duration,
    upload_timeout: Duration,
}

impl ArduinoCli {
    pub fn new() -> Self {
        Self {
            program: config::ARDUINO_CLI.to_string(),
            sketch_root: PathBuf::from("."),
            compile_timeout: Duration::from_secs(config::COMPILE_TIMEOUT_SECS),
            upload_timeout: Duration::from_secs(config::UPLOAD_TIMEOUT_SECS),
        }
    }

    /// Use a different toolchain binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Directory the board sketch directories are relative to
    pub fn with_sketch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sketch_root = root.into();
        self
    }

    pub fn sketch_path(&self, board: Board) -> PathBuf {
        self.sketch_root.join(board.sketch_dir())
    }

    pub fn compile_args(&self, board: Board) -> Vec<String> {
        vec![
            "compile".to_string(),
            "--fqbn".to_string(),
            board.fqbn().to_string(),
            self.sketch_path(board).display().to_string(),
        ]
    }

    pub fn upload_args(&self, board: Board, port: &str) -> Vec<String> {
        vec![
            "upload".to_string(),
            "-p".to_string(),
            port.to_string(),
            "--fqbn".to_string(),
            board.fqbn().to_string(),
            self.sketch_path(board).display().to_string(),
        ]
    }

    /// Check that the toolchain runs; returns its version line
    pub async fn check(&self) -> Result<String, FlashError> {
        let output = self
            .run(&["version".to_string()], Duration::from_secs(10), "version check")
            .await?;
        if !output.status.success() {
            return Err(FlashError::ToolNotFound(self.program.clone()));
        }
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        log::info!("Found {}", version);
        Ok(version)
    }

    pub async fn compile(&self, board: Board) -> Result<(), FlashError> {
        log::info!("Compiling {} sketch {}", board, self.sketch_path(board).display());
        let output = self
            .run(&self.compile_args(board), self.compile_timeout, "compile")
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::error!("{} compile failed: {}", board, stderr);
            return Err(FlashError::Compile { board, stderr });
        }
        Ok(())
    }

    pub async fn upload(&self, board: Board, port: &str) -> Result<(), FlashError> {
        log::info!("Uploading to {} on {}", board, port);
        if board == Board::Esp32 {
            log::warn!("Hold the ESP32 BOOT button when 'Connecting...' appears");
        }
        let output = self
            .run(&self.upload_args(board, port), self.upload_timeout, "upload")
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::error!("{} upload failed: {}", board, stderr);
            return Err(FlashError::Upload { board, stderr });
        }
        Ok(())
    }

    /// Compile then upload one board
    pub async fn flash(&self, board: Board, port: &str) -> Result<(), FlashError> {
        self.compile(board).await?;
        self.upload(board, port).await?;
        log::info!("{} flashed successfully", board);
        Ok(())
    }

    /// Flash the GIGA, then the ESP32. Stops at the first failure.
    pub async fn flash_both(&self, giga_port: &str, esp32_port: &str) -> Result<(), FlashError> {
        log::info!("Flashing both boards sequentially");
        self.flash(Board::Giga, giga_port).await?;
        tokio::time::sleep(Duration::from_millis(config::FLASH_SETTLE_MS)).await;
        self.flash(Board::Esp32, esp32_port).await
    }

    async fn run(
        &self,
        args: &[String],
        limit: Duration,
        step: &str,
    ) -> Result<Output, FlashError> {
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => FlashError::ToolNotFound(self.program.clone()),
                _ => FlashError::Io(e),
            })?;

        match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(FlashError::Timeout {
                step: step.to_string(),
                secs: limit.as_secs(),
            }),
        }
    }
}

impl Default for ArduinoCli {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the sketch for `board` exists under `root`
pub fn sketch_exists(root: &Path, board: Board) -> bool {
    root.join(board.sketch_dir()).is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_settings() {
        assert_eq!(Board::Esp32.fqbn(), "esp32:esp32:esp32");
        assert_eq!(Board::Giga.fqbn(), "arduino:mbed_giga:giga");
        assert_eq!(Board::Esp32.default_port(), "/dev/ttyUSB0");
        assert_eq!(Board::Giga.default_port(), "/dev/ttyACM0");
        assert_eq!(Board::Giga.to_string(), "Arduino GIGA");
    }

    #[test]
    fn test_compile_args() {
        let cli = ArduinoCli::new().with_sketch_root("/opt/firmware");
        assert_eq!(
            cli.compile_args(Board::Esp32),
            vec![
                "compile",
                "--fqbn",
                "esp32:esp32:esp32",
                "/opt/firmware/Arduino/ESP32_UDP_Receiver/",
            ]
        );
    }

    #[test]
    fn test_upload_args() {
        let cli = ArduinoCli::new().with_sketch_root("/opt/firmware");
        assert_eq!(
            cli.upload_args(Board::Giga, "/dev/ttyACM1"),
            vec![
                "upload",
                "-p",
                "/dev/ttyACM1",
                "--fqbn",
                "arduino:mbed_giga:giga",
                "/opt/firmware/Arduino/GIGA_UDP_Sender/",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let cli = ArduinoCli::new().with_program("arduino-cli-definitely-not-installed");
        assert!(matches!(cli.check().await, Err(FlashError::ToolNotFound(_))));
        assert!(matches!(
            cli.flash(Board::Esp32, "/dev/ttyUSB0").await,
            Err(FlashError::ToolNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_tool_reports_compile_error() {
        let cli = ArduinoCli::new().with_program("false");
        match cli.flash(Board::Giga, "/dev/ttyACM0").await {
            Err(FlashError::Compile { board, .. }) => assert_eq!(board, Board::Giga),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_succeeding_tool() {
        let cli = ArduinoCli::new().with_program("true");
        assert!(cli.flash(Board::Esp32, "/dev/ttyUSB0").await.is_ok());
    }

    #[test]
    fn test_sketch_exists() {
        assert!(!sketch_exists(Path::new("/nonexistent-root"), Board::Esp32));
    }
}
