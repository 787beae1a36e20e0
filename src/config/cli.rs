use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::calibration::ScaleRange;

#[derive(Parser)]
#[command(name = "nw-touch")]
#[command(about = "Userspace multitouch driver for NextWindow Riemann panels")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output coordinate range as "XMINxYMIN, XMAXxYMAX"
    #[arg(long, env = "NW_TOUCH_SCALE", value_parser = clap::value_parser!(ScaleRange))]
    pub scale: Option<ScaleRange>,

    /// Only attach to this USB product id (hex)
    #[arg(long, value_parser = parse_product_id)]
    pub product_id: Option<u16>,

    /// Override the panel's contact slot count
    #[arg(long)]
    pub max_contacts: Option<usize>,

    /// Control socket path
    #[arg(long, env = "NW_TOUCH_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Run without a control socket
    #[arg(long)]
    pub no_socket: bool,

    /// Path to config file
    #[arg(long, env = "NW_TOUCH_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print decoded touch frames instead of injecting them
    Dump,
}

fn parse_product_id(s: &str) -> Result<u16, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|_| format!("'{}' is not a hex product id", s))
}
