//! CLI command implementations

mod config;
mod firewall;
mod log;
mod servers;
mod start;
mod status;
mod stop;

pub use config::{config_init, config_path, config_show};
pub use firewall::firewall_down;
pub use log::log_command;
pub use servers::servers_command;
pub use start::start_command;
pub use status::status_command;
pub use stop::stop_command;
