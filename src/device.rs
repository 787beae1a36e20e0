//! Panel identification and HID transport setup.

use hidapi::{HidApi, HidDevice, HidError};

use crate::calibration::{Axis, Calibration};

pub const VENDOR_ID: u16 = 0x1926;

// Value the mode feature report takes for multi-input firmware mode.
const MODE_MULTI_INPUT: u8 = 0x02;

/// Per-generation panel parameters.
#[derive(Debug, Clone, Copy)]
pub struct PanelProfile {
    pub name: &'static str,
    pub product_id: u16,

    // Native report ranges
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,

    /// Contact blocks per report.
    pub max_contacts: usize,
    /// Feature report that switches the firmware input mode.
    pub mode_report_id: u8,
}

impl PanelProfile {
    /// Seed the calibration store with this panel's report ranges.
    pub fn apply_native_ranges(&self, calibration: &Calibration) {
        calibration.record_native_range(Axis::X, self.x_min, self.x_max);
        calibration.record_native_range(Axis::Y, self.y_min, self.y_max);
    }
}

// Every Riemann generation so far reports 16-bit coordinates over the
// full span and carries five contact blocks per report.
static PROFILES: [PanelProfile; 4] = [
    PanelProfile {
        name: "Riemann",
        product_id: 0x0008,
        x_min: 0,
        x_max: 32767,
        y_min: 0,
        y_max: 32767,
        max_contacts: 5,
        mode_report_id: 0x02,
    },
    PanelProfile {
        name: "Riemann DVT",
        product_id: 0x00ff,
        x_min: 0,
        x_max: 32767,
        y_min: 0,
        y_max: 32767,
        max_contacts: 5,
        mode_report_id: 0x02,
    },
    PanelProfile {
        name: "Riemann 1950",
        product_id: 0x025e,
        x_min: 0,
        x_max: 32767,
        y_min: 0,
        y_max: 32767,
        max_contacts: 5,
        mode_report_id: 0x02,
    },
    PanelProfile {
        name: "Riemann 2150",
        product_id: 0x0262,
        x_min: 0,
        x_max: 32767,
        y_min: 0,
        y_max: 32767,
        max_contacts: 5,
        mode_report_id: 0x02,
    },
];

static FALLBACK_PROFILE: PanelProfile = PanelProfile {
    name: "Riemann (unrecognized)",
    product_id: 0,
    x_min: 0,
    x_max: 32767,
    y_min: 0,
    y_max: 32767,
    max_contacts: 5,
    mode_report_id: 0x02,
};

/// Profile lookup; unknown NextWindow products run with default ranges.
pub fn profile_for(product_id: u16) -> &'static PanelProfile {
    match PROFILES.iter().find(|p| p.product_id == product_id) {
        Some(profile) => profile,
        None => {
            log::warn!(
                "Unknown product id {:04x}, assuming default ranges",
                product_id
            );
            &FALLBACK_PROFILE
        }
    }
}

/// An opened panel.
pub struct Panel {
    pub device: HidDevice,
    pub profile: &'static PanelProfile,
    pub product_id: u16,
}

/// Open the first NextWindow panel on the bus, narrowed to one product
/// id when requested.
pub fn find_panel(
    api: &HidApi,
    product: Option<u16>,
) -> Result<Panel, Box<dyn std::error::Error + Send + Sync>> {
    for info in api.device_list() {
        if info.vendor_id() != VENDOR_ID {
            continue;
        }
        if let Some(wanted) = product {
            if info.product_id() != wanted {
                continue;
            }
        }

        let profile = profile_for(info.product_id());
        let device = info.open_device(api)?;
        log::info!(
            "Found {} ({:04x}:{:04x})",
            profile.name,
            VENDOR_ID,
            info.product_id()
        );
        return Ok(Panel {
            device,
            profile,
            product_id: info.product_id(),
        });
    }
    Err("no NextWindow panel found".into())
}

/// Ask the firmware for multi-input reports. Some revisions come up in
/// single-touch mode until this arrives.
pub fn enable_multitouch(panel: &Panel) -> Result<(), HidError> {
    panel
        .device
        .send_feature_report(&[panel.profile.mode_report_id, MODE_MULTI_INPUT])
}
