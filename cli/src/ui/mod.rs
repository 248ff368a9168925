//! UI utilities for terminal output.

mod banner;
mod output;

pub use banner::print_banner;
pub use output::{print_device_list, print_failure};
