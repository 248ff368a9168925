//! Device lists and failure messages.

use cst_core::{DiscoveredDevice, Error};

/// Print a numbered device list for `--select`.
pub fn print_device_list(devices: &[DiscoveredDevice]) {
    for (i, device) in devices.iter().enumerate() {
        println!("  \x1b[1m{}.\x1b[0m {}  \x1b[2m{}\x1b[0m", i + 1, device.display_name, device.address);
    }
}

/// Print a short operator-facing message for a failed operation.
pub fn print_failure(error: &Error) {
    eprintln!("\x1b[1;31m✗\x1b[0m {}", failure_message(error));
}

fn failure_message(error: &Error) -> String {
    match error {
        Error::NoResponse { timeout } => {
            format!("No response from device within {:?}. Is the child app running?", timeout)
        }
        Error::MalformedResponse(_) => "Unexpected response format".to_string(),
        Error::DecryptionFailed(_) => {
            "Could not decrypt the response. Check the device ID.".to_string()
        }
        Error::DiscoveryFailed(detail) => format!("Discovery failed: {}", detail),
        other => format!("Error: {}", other),
    }
}
