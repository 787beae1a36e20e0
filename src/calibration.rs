//! Calibration state shared between the decode path and the control socket.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

const DEFAULT_REPORT_MAX: i32 = 32767;

/// Errors from textual configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The scale quad did not parse as `"XMINxYMIN, XMAXxYMAX"`.
    #[error("invalid scale range '{0}', expected \"XMINxYMIN, XMAXxYMAX\"")]
    ParseFailed(String),
}

/// Axis selector for the calibration store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// The output coordinate space, as two corner points.
///
/// An inverted range (min above max) is legal and mirrors that axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleRange {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl fmt::Display for ScaleRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}, {}x{}",
            self.x_min, self.y_min, self.x_max, self.y_max
        )
    }
}

impl FromStr for ScaleRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_failed = || ConfigError::ParseFailed(s.to_string());
        let (min, max) = s.split_once(',').ok_or_else(parse_failed)?;
        let (x_min, y_min) = parse_point(min).ok_or_else(parse_failed)?;
        let (x_max, y_max) = parse_point(max).ok_or_else(parse_failed)?;
        Ok(Self {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }
}

fn parse_point(s: &str) -> Option<(i32, i32)> {
    let (x, y) = s.trim().split_once('x')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// One axis of a remap snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AxisMap {
    pub report_min: i32,
    pub report_max: i32,
    pub scale_min: i32,
    pub scale_max: i32,
}

impl AxisMap {
    /// Rescale a raw panel coordinate into the output range.
    ///
    /// Integer math, truncating toward zero. A collapsed report range
    /// divides by one instead of zero, and the product is widened so no
    /// field value can overflow it.
    pub fn remap(&self, raw: i32) -> i32 {
        let report_span = (i64::from(self.report_max) - i64::from(self.report_min)).max(1);
        let scale_span = i64::from(self.scale_max) - i64::from(self.scale_min);
        let offset = i64::from(raw) - i64::from(self.report_min);
        let out = i128::from(offset) * i128::from(scale_span) / i128::from(report_span)
            + i128::from(self.scale_min);
        out.clamp(i128::from(i32::MIN), i128::from(i32::MAX)) as i32
    }

    /// Rescale a contact dimension. Spans scale by the axis ratio alone,
    /// with no offset applied.
    pub fn remap_span(&self, raw: i32) -> i32 {
        let report_span = (i64::from(self.report_max) - i64::from(self.report_min)).max(1);
        let scale_span = (i64::from(self.scale_max) - i64::from(self.scale_min)).abs();
        let out = i128::from(raw) * i128::from(scale_span) / i128::from(report_span);
        out.clamp(0, i128::from(i32::MAX)) as i32
    }

    /// Whether a raw value lies inside the native report range.
    pub fn in_report_range(&self, raw: i32) -> bool {
        let lo = self.report_min.min(self.report_max);
        let hi = self.report_min.max(self.report_max);
        raw >= lo && raw <= hi
    }
}

/// Consistent snapshot of both axes, taken once per frame.
#[derive(Debug, Clone, Copy)]
pub struct Mapping {
    pub x: AxisMap,
    pub y: AxisMap,
}

#[derive(Debug, Clone, Copy)]
struct AxisRange {
    min: i32,
    max: i32,
}

struct CalState {
    x: AxisRange,
    y: AxisRange,
    scale: ScaleRange,
    scale_configured: bool,
}

/// Native report ranges plus the output scale quad, shared between the
/// decode thread and the control socket. The quad is read through one
/// snapshot per frame, so a concurrent rescale can never tear a frame.
///
/// Until a scale is configured, the quad shadows the native ranges and
/// remapping is a pass-through.
pub struct Calibration {
    state: Mutex<CalState>,
}

impl Calibration {
    pub fn new() -> Self {
        let native = AxisRange {
            min: 0,
            max: DEFAULT_REPORT_MAX,
        };
        Self {
            state: Mutex::new(CalState {
                x: native,
                y: native,
                scale: ScaleRange {
                    x_min: native.min,
                    y_min: native.min,
                    x_max: native.max,
                    y_max: native.max,
                },
                scale_configured: false,
            }),
        }
    }

    /// Record the native report range for one axis, as declared by the
    /// panel profile. Runs during attach, before frames flow. While no
    /// scale has been configured, the quad follows the native range.
    pub fn record_native_range(&self, axis: Axis, min: i32, max: i32) {
        let mut state = self.lock();
        let range = AxisRange { min, max };
        match axis {
            Axis::X => {
                state.x = range;
                if !state.scale_configured {
                    state.scale.x_min = min;
                    state.scale.x_max = max;
                }
            }
            Axis::Y => {
                state.y = range;
                if !state.scale_configured {
                    state.scale.y_min = min;
                    state.scale.y_max = max;
                }
            }
        }
    }

    /// Replace the scale quad.
    pub fn set_scale(&self, scale: ScaleRange) {
        let mut state = self.lock();
        state.scale = scale;
        state.scale_configured = true;
    }

    pub fn get_scale(&self) -> ScaleRange {
        self.lock().scale
    }

    /// Parse and apply a textual quad. A parse failure leaves the stored
    /// quad untouched.
    pub fn set_scale_str(&self, s: &str) -> Result<(), ConfigError> {
        let scale: ScaleRange = s.parse()?;
        self.set_scale(scale);
        Ok(())
    }

    /// Snapshot both axes for one frame's remaps.
    pub fn mapping(&self) -> Mapping {
        let state = self.lock();
        Mapping {
            x: AxisMap {
                report_min: state.x.min,
                report_max: state.x.max,
                scale_min: state.scale.x_min,
                scale_max: state.scale.x_max,
            },
            y: AxisMap {
                report_min: state.y.min,
                report_max: state.y.max,
                scale_min: state.scale.y_min,
                scale_max: state.scale.y_max,
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, CalState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
