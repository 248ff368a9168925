//! Info command implementation.

use cst_core::{discovery::get_local_ips, Config};

/// Display local network information.
pub fn show_info(config: Config) {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    println!("\n\x1b[1mCST Parent Info\x1b[0m");
    println!("═══════════════════════════════════════");
    println!("\x1b[1mHost:\x1b[0m      {}", host);
    println!("\x1b[1mPort:\x1b[0m      {}", config.port);
    println!("\x1b[1mBroadcast:\x1b[0m {}", config.broadcast_addr);

    println!("\n\x1b[1mLocal IPs:\x1b[0m");
    for ip in get_local_ips() {
        println!("  • {}", ip);
    }
    println!();
}
