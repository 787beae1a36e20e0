mod calibration;
mod config;
mod control;
mod device;
mod dump;
mod input;
mod sink;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use hidapi::HidApi;

use calibration::Calibration;
use config::{Cli, Command, Config};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let dump_mode = matches!(cli.command, Some(Command::Dump));

    // dump is a debugging aid, so frame rejections should be visible
    let default_level = if dump_mode { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = Config::load(&cli);
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        std::process::exit(2);
    }

    let calibration = Arc::new(Calibration::new());
    if let Some(scale) = config.scale {
        calibration.set_scale(scale);
    }

    if dump_mode {
        return dump::run(&config, &calibration);
    }

    log::info!(
        "nw-touch starting (scale={}, socket={})",
        match config.scale {
            Some(scale) => scale.to_string(),
            None => "native".into(),
        },
        match &config.socket {
            Some(path) => path.display().to_string(),
            None => "off".into(),
        }
    );

    if let Some(path) = &config.socket {
        if let Err(e) = control::spawn(path.clone(), Arc::clone(&calibration)) {
            log::warn!("Control socket unavailable: {}", e);
        }
    }

    loop {
        if let Err(e) = run_panel_session(&config, &calibration) {
            log::error!("{}", e);
        }
        log::warn!("Panel session ended, retrying in 2s…");
        thread::sleep(Duration::from_secs(2));
    }
}

fn run_panel_session(
    config: &Config,
    calibration: &Calibration,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let api = HidApi::new()?;
    let panel = device::find_panel(&api, config.product_id)?;
    panel.profile.apply_native_ranges(calibration);

    if let Err(e) = device::enable_multitouch(&panel) {
        log::warn!(
            "Multitouch mode enable failed, panel may stay single-touch: {}",
            e
        );
    } else {
        log::info!("Multitouch mode enabled");
    }

    let max_contacts = config.max_contacts.unwrap_or(panel.profile.max_contacts);
    let mut sink = sink::UinputSink::create(
        panel.profile,
        panel.product_id,
        calibration.get_scale(),
        max_contacts,
    )?;
    input::run_session(&panel, calibration, &mut sink, max_contacts)
}
