//! Device control commands: time, lock, extend and free-form send.

use cst_core::{
    protocol::constants::DEVICE_NAME_PREFIX, Command, Config, Error, ParentService,
    SelectedDevice, ServiceEvent,
};

use crate::ui::print_failure;
use crate::TargetArgs;

/// Send one command to the target device and print the formatted reply.
pub async fn run_command(config: Config, command: Command, target: TargetArgs) -> anyhow::Result<()> {
    let (service, mut events) = ParentService::new(config)?;
    let device = resolve_target(&service, target)?;

    let cancel = service.send_command(&command, &device);
    super::cancel_on_ctrl_c(&cancel)?;

    loop {
        match events.recv().await {
            Some(ServiceEvent::CommandSent { command, target }) => {
                println!("Sending command: \x1b[1m{}\x1b[0m to {}", command, target);
            }
            Some(ServiceEvent::CommandCompleted { formatted, .. }) => {
                println!("\x1b[1;34mResponse:\x1b[0m {}", formatted);
                return Ok(());
            }
            Some(ServiceEvent::CommandFailed { error: Error::Cancelled, .. }) => {
                println!("\n\x1b[1;33mCommand cancelled.\x1b[0m");
                return Ok(());
            }
            Some(ServiceEvent::CommandFailed { error, .. }) => {
                print_failure(&error);
                return Ok(());
            }
            Some(_) => {}
            None => anyhow::bail!("service stopped unexpectedly"),
        }
    }
}

/// Use the explicit target when given, else the saved selection.
fn resolve_target(service: &ParentService, target: TargetArgs) -> anyhow::Result<SelectedDevice> {
    if let (Some(address), Some(device_id)) = (target.address, target.device_id.as_deref()) {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(Error::MissingDeviceId.into());
        }
        return Ok(SelectedDevice {
            display_name: format!("{}{}", DEVICE_NAME_PREFIX, address),
            address,
            device_id: device_id.to_string(),
        });
    }

    let mut device = service
        .selected()?
        .ok_or_else(|| anyhow::anyhow!("no device selected; run `cst-parent scan` or `cst-parent select` first"))?;

    tracing::debug!("using saved selection {}", device.display_name);

    // --device-id alone overrides the saved identifier
    if let Some(device_id) = target.device_id {
        device.device_id = device_id;
    }
    if device.device_id.trim().is_empty() {
        return Err(Error::MissingDeviceId.into());
    }
    Ok(device)
}
