//! CLI command implementations.

mod control;
mod info;
mod scan;
mod selection;
mod simulate;

pub use control::run_command;
pub use info::show_info;
pub use scan::run_scan;
pub use selection::{forget_device, select_device, show_status};
pub use simulate::run_simulator;

use tokio_util::sync::CancellationToken;

/// Cancel `token` on Ctrl+C.
fn cancel_on_ctrl_c(token: &CancellationToken) -> anyhow::Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || token.cancel())?;
    Ok(())
}
