//! Banner and header printing.

/// Print the application banner.
pub fn print_banner() {
    println!("\n\x1b[1;36m╔══════════════════════════════════════╗\x1b[0m");
    println!("\x1b[1;36m║\x1b[0m          \x1b[1mCST Parent\x1b[0m                  \x1b[1;36m║\x1b[0m");
    println!("\x1b[1;36m║\x1b[0m    Child screen-time remote control  \x1b[1;36m║\x1b[0m");
    println!("\x1b[1;36m╚══════════════════════════════════════╝\x1b[0m\n");
}
