//! Report decoding pipeline: unpack the raw bytes, accumulate slots,
//! finalize frames, hand event batches to the sink.

mod finalize;
mod report;
mod state;

pub use finalize::TouchEvent;

use finalize::{finalize, FrameRejection};
use state::TouchState;

use crate::calibration::Calibration;
use crate::device::Panel;
use crate::sink::EventSink;

const READ_TIMEOUT_MS: i32 = 200;

/// Streaming decoder. Raw reports go in; finalized frames come out
/// through the sink. Bad frames are absorbed here and never stop the
/// stream.
pub struct Decoder {
    state: TouchState,
    frames: u64,
    idle: u64,
    dropped: u64,
}

impl Decoder {
    pub fn new(max_contacts: usize) -> Self {
        Self {
            state: TouchState::new(max_contacts),
            frames: 0,
            idle: 0,
            dropped: 0,
        }
    }

    /// Feed one raw HID report.
    pub fn feed(
        &mut self,
        data: &[u8],
        calibration: &Calibration,
        sink: &mut impl EventSink,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(fields) = report::unpack_report(data) else {
            if let Some(id) = data.first() {
                log::debug!("Ignoring report id {:#04x}", id);
            }
            return Ok(());
        };

        for (usage, value) in fields {
            if let Some(frame) = self.state.push(usage, value) {
                let mapping = calibration.mapping();
                match finalize(&frame, &mapping) {
                    Ok(events) => {
                        sink.emit(&events)?;
                        self.count_emitted(frame.declared_contacts);
                    }
                    Err(FrameRejection::Empty) => {
                        self.idle += 1;
                        if self.idle.is_multiple_of(500) {
                            log::debug!("Idle frames: {}", self.idle);
                        }
                    }
                    Err(rejection) => {
                        self.dropped += 1;
                        log::debug!("Frame dropped ({} so far): {}", self.dropped, rejection);
                    }
                }
            }
        }
        Ok(())
    }

    fn count_emitted(&mut self, contacts: i32) {
        if self.frames == 0 {
            log::info!("Touch frames flowing");
        }
        self.frames += 1;
        if self.frames.is_multiple_of(500) {
            log::debug!("Touch frames: {}, contacts: {}", self.frames, contacts);
        }
    }
}

/// Decode reports from an attached panel until the transport fails.
pub fn run_session(
    panel: &Panel,
    calibration: &Calibration,
    sink: &mut impl EventSink,
    max_contacts: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut decoder = Decoder::new(max_contacts);
    let mut buf = vec![0u8; report::report_len(max_contacts).max(64)];

    loop {
        let n = panel.device.read_timeout(&mut buf, READ_TIMEOUT_MS)?;
        if n == 0 {
            continue;
        }
        decoder.feed(&buf[..n], calibration, sink)?;
    }
}
