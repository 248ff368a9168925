//! Scan command implementation.

use cst_core::{Config, Error, ParentService, ServiceEvent};

use crate::ui::{print_banner, print_device_list, print_failure};

/// Scan for child devices and optionally remember one of them.
pub async fn run_scan(
    config: Config,
    select: Option<usize>,
    device_id: Option<String>,
) -> anyhow::Result<()> {
    print_banner();

    let (service, mut events) = ParentService::new(config)?;
    let cancel = service.scan()?;
    super::cancel_on_ctrl_c(&cancel)?;

    println!(
        "\x1b[1mScanning for child devices\x1b[0m ({:?})...",
        service.config().discovery_window
    );

    let report = loop {
        match events.recv().await {
            Some(ServiceEvent::DeviceFound(device)) => {
                println!("\x1b[1;32m⬤\x1b[0m Found: \x1b[1m{}\x1b[0m", device.display_name);
            }
            Some(ServiceEvent::ScanCompleted(report)) => break report,
            Some(ServiceEvent::ScanFailed(Error::Cancelled)) => {
                println!("\n\x1b[1;33mScan cancelled.\x1b[0m");
                return Ok(());
            }
            Some(ServiceEvent::ScanFailed(e)) => {
                print_failure(&e);
                return Ok(());
            }
            Some(_) => {}
            None => anyhow::bail!("service stopped unexpectedly"),
        }
    };

    println!();
    if report.devices.is_empty() {
        println!("No child devices found. Check WiFi and child app.");
        return Ok(());
    }

    println!(
        "Found {} device(s) from {} replies.",
        report.devices.len(),
        report.valid_replies
    );
    print_device_list(&report.devices);

    match (select, device_id) {
        (Some(index), Some(device_id)) => {
            let device = index
                .checked_sub(1)
                .and_then(|i| report.devices.get(i))
                .ok_or_else(|| anyhow::anyhow!("no device number {} in this scan", index))?;
            let selected = service.select(device, &device_id)?;
            println!("\x1b[1;32m✓\x1b[0m Selected: {}", selected.display_name);
        }
        _ => {
            println!("\n\x1b[2mSelect one with: cst-parent scan --select <n> --device-id <id>\x1b[0m");
        }
    }

    Ok(())
}
