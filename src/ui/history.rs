//! Signal history dialog.

use libadwaita as adw;
use libadwaita::prelude::*;

/// Show the newest history lines (newest first)
pub fn show_history(window: &adw::ApplicationWindow, lines: &[String]) {
    let body = if lines.is_empty() {
        "No signals received yet.".to_string()
    } else {
        lines.join("\n")
    };

    let dialog = adw::AlertDialog::new(Some("Signal History"), Some(&body));
    dialog.add_response("close", "Close");
    dialog.set_default_response(Some("close"));
    dialog.set_close_response("close");
    dialog.present(Some(window));
}
