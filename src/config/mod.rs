mod cli;
mod file;

pub use cli::{Cli, Command};

use std::path::PathBuf;

use crate::calibration::ScaleRange;

pub const DEFAULT_SOCKET: &str = "/tmp/nw-touch.sock";

/// Merged configuration from CLI args and TOML file.
#[derive(Debug, Clone)]
pub struct Config {
    pub scale: Option<ScaleRange>,
    pub product_id: Option<u16>,
    pub max_contacts: Option<usize>,
    /// Control socket path; `None` disables the socket.
    pub socket: Option<PathBuf>,
}

impl Config {
    /// Load configuration by merging TOML file with CLI overrides.
    pub fn load(cli: &Cli) -> Self {
        let file_config = cli
            .config
            .as_ref()
            .and_then(|p| file::load_from_path(p))
            .or_else(file::load_from_default_paths)
            .unwrap_or_default();

        let no_socket = cli.no_socket || file_config.no_socket;
        Self {
            scale: cli
                .scale
                .or_else(|| parse_file_scale(file_config.scale.as_deref())),
            product_id: cli.product_id.or(file_config.product_id),
            max_contacts: cli.max_contacts.or(file_config.max_contacts),
            socket: if no_socket {
                None
            } else {
                Some(
                    cli.socket
                        .clone()
                        .or(file_config.socket)
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET)),
                )
            },
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        match self.max_contacts {
            Some(0) => Err("--max-contacts must be at least 1"),
            // contact ids are a single byte on the wire
            Some(n) if n > 255 => Err("--max-contacts cannot exceed 255"),
            _ => Ok(()),
        }
    }
}

fn parse_file_scale(value: Option<&str>) -> Option<ScaleRange> {
    let value = value?;
    match value.parse() {
        Ok(scale) => Some(scale),
        Err(e) => {
            log::warn!("Ignoring scale from config file: {}", e);
            None
        }
    }
}
