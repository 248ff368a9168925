//! Saved device selection commands.

use std::net::IpAddr;

use cst_core::{
    protocol::constants::DEVICE_NAME_PREFIX, Config, DiscoveredDevice, ParentService,
};

/// Remember a device by address without scanning.
pub fn select_device(
    config: Config,
    address: IpAddr,
    device_id: &str,
    name: Option<String>,
) -> anyhow::Result<()> {
    let (service, _events) = ParentService::new(config)?;
    let device = DiscoveredDevice {
        display_name: name.unwrap_or_else(|| format!("{}{}", DEVICE_NAME_PREFIX, address)),
        address: service.config().command_target(address),
    };

    let selected = service.select(&device, device_id)?;
    println!("\x1b[1;32m✓\x1b[0m Selected: {}", selected.display_name);
    Ok(())
}

/// Print the saved selection and effective settings.
pub fn show_status(config: Config) -> anyhow::Result<()> {
    let (service, _events) = ParentService::new(config)?;
    let config = service.config();

    println!("\n\x1b[1mCST Parent Status\x1b[0m");
    println!("═══════════════════════════════════════");
    match service.selected()? {
        Some(device) => {
            println!("\x1b[1mDevice:\x1b[0m      {}", device.display_name);
            println!("\x1b[1mAddress:\x1b[0m     {}", config.command_target(device.address));
            println!("\x1b[1mDevice ID:\x1b[0m   set");
        }
        None => println!("\x1b[1mDevice:\x1b[0m      none selected"),
    }
    println!("\x1b[1mPort:\x1b[0m        {}", config.port);
    println!("\x1b[1mBroadcast:\x1b[0m   {}", config.broadcast_addr);
    println!("\x1b[1mScan window:\x1b[0m {:?}", config.discovery_window);
    println!("\x1b[1mTimeout:\x1b[0m     {:?}", config.command_timeout);
    println!("\x1b[1mData dir:\x1b[0m    {}", config.data_dir.display());
    println!();
    Ok(())
}

/// Forget the saved selection.
pub fn forget_device(config: Config) -> anyhow::Result<()> {
    let (service, _events) = ParentService::new(config)?;
    service.forget_selection()?;
    println!("Saved device forgotten.");
    Ok(())
}
