//! Event delivery. The decoder speaks `TouchEvent`; sinks turn that into
//! uinput traffic (or captured vectors under test).

use evdevil::event::{Abs, AbsEvent, EventType, InputEvent, Key, KeyEvent, KeyState};
use evdevil::uinput::{AbsSetup, UinputDevice};
use evdevil::{AbsInfo, Bus, InputId, InputProp};

use crate::calibration::ScaleRange;
use crate::device::{PanelProfile, VENDOR_ID};
use crate::input::TouchEvent;

const EV_SYN: u16 = 0x00;
const SYN_REPORT: u16 = 0;
const SYN_MT_REPORT: u16 = 2;

/// Boundary between the decoder and whatever consumes its frames.
pub trait EventSink {
    fn emit(&mut self, events: &[TouchEvent]) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Translate decoded events into raw type-A multitouch events: tracking
/// id, position and ellipse per contact, a sync after each contact slot,
/// the legacy pointer, then the frame sync.
fn translate(events: &[TouchEvent], batch: &mut Vec<InputEvent>) {
    for ev in events {
        match *ev {
            TouchEvent::Contact {
                id,
                x,
                y,
                major,
                minor,
            } => {
                batch.push(AbsEvent::new(Abs::MT_TRACKING_ID, id).into());
                batch.push(AbsEvent::new(Abs::MT_POSITION_X, x).into());
                batch.push(AbsEvent::new(Abs::MT_POSITION_Y, y).into());
                batch.push(AbsEvent::new(Abs::MT_TOUCH_MAJOR, major).into());
                batch.push(AbsEvent::new(Abs::MT_TOUCH_MINOR, minor).into());
            }
            TouchEvent::MtSync => {
                batch.push(InputEvent::new(EventType::from_raw(EV_SYN), SYN_MT_REPORT, 0));
            }
            TouchEvent::Pointer { touching, x, y } => {
                let state = if touching {
                    KeyState::PRESSED
                } else {
                    KeyState::RELEASED
                };
                batch.push(KeyEvent::new(Key::BTN_TOUCH, state).into());
                batch.push(AbsEvent::new(Abs::X, x).into());
                batch.push(AbsEvent::new(Abs::Y, y).into());
            }
            TouchEvent::Sync => {
                batch.push(InputEvent::new(EventType::from_raw(EV_SYN), SYN_REPORT, 0));
            }
        }
    }
}

/// The production sink: a virtual touchscreen node.
pub struct UinputSink {
    device: UinputDevice,
    batch: Vec<InputEvent>,
}

impl UinputSink {
    pub fn create(
        profile: &PanelProfile,
        product_id: u16,
        scale: ScaleRange,
        max_contacts: usize,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let (x_lo, x_hi) = ordered(scale.x_min, scale.x_max);
        let (y_lo, y_hi) = ordered(scale.y_min, scale.y_max);
        let size_max = axis_span(x_lo, x_hi).max(axis_span(y_lo, y_hi));

        let axes = [
            AbsSetup::new(Abs::X, AbsInfo::new(x_lo, x_hi)),
            AbsSetup::new(Abs::Y, AbsInfo::new(y_lo, y_hi)),
            AbsSetup::new(Abs::MT_POSITION_X, AbsInfo::new(x_lo, x_hi)),
            AbsSetup::new(Abs::MT_POSITION_Y, AbsInfo::new(y_lo, y_hi)),
            AbsSetup::new(
                Abs::MT_TRACKING_ID,
                AbsInfo::new(0, max_contacts.saturating_sub(1) as i32),
            ),
            AbsSetup::new(Abs::MT_TOUCH_MAJOR, AbsInfo::new(0, size_max)),
            AbsSetup::new(Abs::MT_TOUCH_MINOR, AbsInfo::new(0, size_max)),
        ];

        let name = format!("NextWindow {}", profile.name);
        let device = UinputDevice::builder()?
            .with_input_id(InputId::new(Bus::from_raw(0x03), VENDOR_ID, product_id, 0))?
            .with_props([InputProp::DIRECT])?
            .with_abs_axes(axes)?
            .with_keys([Key::BTN_TOUCH])?
            .build(&name)?;

        if let Ok(sysname) = device.sysname() {
            log::info!(
                "Touch device ready: /sys/devices/virtual/input/{}",
                sysname.to_string_lossy()
            );
        }

        Ok(Self {
            device,
            batch: Vec::with_capacity(64),
        })
    }
}

impl EventSink for UinputSink {
    fn emit(&mut self, events: &[TouchEvent]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.batch.clear();
        translate(events, &mut self.batch);
        self.device.write(&self.batch)?;
        Ok(())
    }
}

fn ordered(a: i32, b: i32) -> (i32, i32) {
    (a.min(b), a.max(b))
}

fn axis_span(lo: i32, hi: i32) -> i32 {
    (i64::from(hi) - i64::from(lo)).min(i64::from(i32::MAX)) as i32
}

/// Capture sink for exercising the decoder without a uinput device.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    pub frames: Vec<Vec<TouchEvent>>,
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn emit(&mut self, events: &[TouchEvent]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.frames.push(events.to_vec());
        Ok(())
    }
}
