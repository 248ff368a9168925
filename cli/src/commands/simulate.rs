//! Simulated child device for trying the parent side without a phone.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use cst_core::{ChildResponder, CommandHandler, Config, SecureChannel};
use tokio_util::sync::CancellationToken;

use crate::ui::print_banner;

/// In-memory screen-time state answering the standard commands
struct ScreenTimeModel {
    total_minutes: i64,
    state: Mutex<ModelState>,
}

struct ModelState {
    remaining_minutes: i64,
    locked: bool,
}

impl ScreenTimeModel {
    fn new(total_minutes: i64) -> Self {
        Self {
            total_minutes,
            state: Mutex::new(ModelState {
                remaining_minutes: total_minutes,
                locked: false,
            }),
        }
    }
}

impl CommandHandler for ScreenTimeModel {
    fn handle(&self, command: &str) -> String {
        let Ok(mut state) = self.state.lock() else {
            return "ERROR|state unavailable".to_string();
        };

        match command {
            "GET_TIME_LEFT" => {
                let status = if state.locked { "LOCKED" } else { "ACTIVE" };
                format!("TIME_LEFT|{}|{}|{}", state.remaining_minutes, status, self.total_minutes)
            }
            "LOCK_DEVICE" => {
                state.locked = true;
                "DEVICE_LOCKED|Device locked successfully".to_string()
            }
            other => match other.strip_prefix("EXTEND_TIME:").map(str::parse::<i64>) {
                Some(Ok(minutes)) if minutes > 0 => {
                    state.remaining_minutes += minutes;
                    state.locked = false;
                    format!("TIME_EXTENDED|Extended by {} minutes", minutes)
                }
                Some(_) => "ERROR|Invalid minutes".to_string(),
                None => format!("ERROR|Unknown command: {}", other),
            },
        }
    }
}

/// Run a simulated child until Ctrl+C.
pub async fn run_simulator(config: Config, device_id: &str, total_minutes: i64) -> anyhow::Result<()> {
    print_banner();

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let responder = ChildResponder::bind(
        addr,
        SecureChannel::from_identifier(device_id.trim()),
        Arc::new(ScreenTimeModel::new(total_minutes)),
    )
    .await?;

    println!("\x1b[1;32m✓\x1b[0m Simulated child listening on {}", responder.local_addr()?);
    println!("\x1b[2mPress Ctrl+C to stop.\x1b[0m\n");

    let cancel = CancellationToken::new();
    super::cancel_on_ctrl_c(&cancel)?;
    responder.run(cancel).await?;

    println!("\n\x1b[1;33mShutting down...\x1b[0m");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_commands() {
        let model = ScreenTimeModel::new(60);

        assert_eq!(model.handle("GET_TIME_LEFT"), "TIME_LEFT|60|ACTIVE|60");
        assert_eq!(model.handle("EXTEND_TIME:15"), "TIME_EXTENDED|Extended by 15 minutes");
        assert_eq!(model.handle("LOCK_DEVICE"), "DEVICE_LOCKED|Device locked successfully");
        assert_eq!(model.handle("GET_TIME_LEFT"), "TIME_LEFT|75|LOCKED|60");
        assert_eq!(model.handle("EXTEND_TIME:x"), "ERROR|Invalid minutes");
        assert_eq!(model.handle("PING"), "ERROR|Unknown command: PING");
    }
}
