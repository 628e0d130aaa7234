//! UI components for the kiosk.

pub mod history;
pub mod page;
pub mod window;

pub use window::MainWindow;
