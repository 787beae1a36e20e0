//! Dump decoded touch frames for debugging.
//! Run: nw-touch dump to stream and print finalized events.

use hidapi::HidApi;

use crate::calibration::Calibration;
use crate::config::Config;
use crate::device;
use crate::input::{self, TouchEvent};
use crate::sink::EventSink;

struct PrintSink {
    n: u64,
}

impl EventSink for PrintSink {
    fn emit(
        &mut self,
        events: &[TouchEvent],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for event in events {
            self.n += 1;
            println!("{:6}  {}", self.n, describe(event));
        }
        Ok(())
    }
}

fn describe(event: &TouchEvent) -> String {
    match *event {
        TouchEvent::Contact {
            id,
            x,
            y,
            major,
            minor,
        } => format!(
            "contact id={} x={} y={} major={} minor={}",
            id, x, y, major, minor
        ),
        TouchEvent::MtSync => "mt-sync".into(),
        TouchEvent::Pointer { touching, x, y } => {
            format!("pointer touching={} x={} y={}", touching, x, y)
        }
        TouchEvent::Sync => "sync".into(),
    }
}

pub fn run(
    config: &Config,
    calibration: &Calibration,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let api = HidApi::new()?;
    let panel = device::find_panel(&api, config.product_id)?;
    panel.profile.apply_native_ranges(calibration);
    if let Err(e) = device::enable_multitouch(&panel) {
        log::warn!("Multitouch mode enable failed: {}", e);
    }

    let max_contacts = config.max_contacts.unwrap_or(panel.profile.max_contacts);
    eprintln!(
        "Dumping touch frames from {} (Ctrl+C to stop):\n",
        panel.profile.name
    );
    let mut sink = PrintSink { n: 0 };
    input::run_session(&panel, calibration, &mut sink, max_contacts)
}
