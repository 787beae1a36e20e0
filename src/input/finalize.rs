//! Frame validation and event layout. A frame either becomes a full
//! event batch or is rejected whole; nothing partial ever reaches the
//! sink.

use thiserror::Error;

use crate::calibration::Mapping;

use super::state::{Frame, TouchSlot};

/// Sink-facing events for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchEvent {
    /// One active contact.
    Contact {
        id: i32,
        x: i32,
        y: i32,
        major: i32,
        minor: i32,
    },
    /// Per-contact terminator.
    MtSync,
    /// Legacy single-touch pointer, derived from the first slot.
    Pointer { touching: bool, x: i32, y: i32 },
    /// Frame terminator.
    Sync,
}

/// Why a frame produced no events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameRejection {
    /// Idle panels report zero contacts continuously.
    #[error("no contacts reported")]
    Empty,
    #[error("more contact blocks than slots")]
    Overflow,
    /// An incomplete cycle; a whole report carries one block per slot.
    #[error("{written} of {expected} contact blocks arrived")]
    Truncated { written: usize, expected: usize },
    /// A declared count the slot layout cannot carry.
    #[error("impossible contact count {0}")]
    BadContactCount(i32),
    /// A coordinate outside the native report range, or an impossible
    /// contact id.
    #[error("junk data in contact {slot}")]
    Junk { slot: usize },
}

/// Validate a closed frame and lay out its event batch.
pub fn finalize(frame: &Frame, mapping: &Mapping) -> Result<Vec<TouchEvent>, FrameRejection> {
    if frame.declared_contacts == 0 {
        return Err(FrameRejection::Empty);
    }
    if frame.overflowed {
        return Err(FrameRejection::Overflow);
    }
    if frame.slots_written < frame.slots.len() {
        return Err(FrameRejection::Truncated {
            written: frame.slots_written,
            expected: frame.slots.len(),
        });
    }
    if frame.declared_contacts < 0 || frame.declared_contacts as usize > frame.slots.len() {
        return Err(FrameRejection::BadContactCount(frame.declared_contacts));
    }
    let declared = frame.declared_contacts as usize;

    let max_id = frame.slots.len() as i32;
    for (k, slot) in frame.slots[..declared].iter().enumerate() {
        let junk = !mapping.x.in_report_range(slot.x)
            || !mapping.y.in_report_range(slot.y)
            || slot.contact_id < 0
            || slot.contact_id >= max_id;
        if junk {
            return Err(FrameRejection::Junk { slot: k });
        }
    }

    let mut events = Vec::with_capacity(declared * 2 + 2);
    for slot in &frame.slots[..declared] {
        if slot.active() {
            let (major, minor) = contact_size(slot, mapping);
            events.push(TouchEvent::Contact {
                id: slot.contact_id,
                x: mapping.x.remap(slot.x),
                y: mapping.y.remap(slot.y),
                major,
                minor,
            });
        }
        events.push(TouchEvent::MtSync);
    }

    // mouse emulation follows the first contact point, released or not
    let first = &frame.slots[0];
    events.push(TouchEvent::Pointer {
        touching: first.active(),
        x: mapping.x.remap(first.x),
        y: mapping.y.remap(first.y),
    });
    events.push(TouchEvent::Sync);

    Ok(events)
}

/// Contact ellipse size. Old firmware reports w/h as zero, which is read
/// as one unit; dimensions are halved to match the visual scale of a
/// touch, rescaled along the axis they lie on, and floored at one so an
/// active contact never has an empty ellipse.
fn contact_size(slot: &TouchSlot, mapping: &Mapping) -> (i32, i32) {
    let w = if slot.w == 0 { 1 } else { slot.w };
    let h = if slot.h == 0 { 1 } else { slot.h };
    let (major_map, minor_map, major, minor) = if w >= h {
        (&mapping.x, &mapping.y, w, h)
    } else {
        (&mapping.y, &mapping.x, h, w)
    };
    (
        major_map.remap_span(major >> 1).max(1),
        minor_map.remap_span(minor >> 1).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::AxisMap;

    fn identity_mapping() -> Mapping {
        let axis = AxisMap {
            report_min: 0,
            report_max: 32767,
            scale_min: 0,
            scale_max: 32767,
        };
        Mapping { x: axis, y: axis }
    }

    fn touching_slot(id: i32, x: i32, y: i32, w: i32, h: i32) -> TouchSlot {
        TouchSlot {
            tip_switch: true,
            in_range: true,
            confidence: true,
            contact_id: id,
            x,
            y,
            w,
            h,
        }
    }

    /// A whole report cycle: every slot's block arrived, the leading ones
    /// carrying the given contacts and the rest idle.
    fn frame_of(slots: Vec<TouchSlot>, declared: i32) -> Frame {
        let mut frame = Frame::empty(5);
        frame.slots[..slots.len()].copy_from_slice(&slots);
        frame.declared_contacts = declared;
        frame.slots_written = frame.slots.len();
        frame
    }

    #[test]
    fn test_single_contact_frame() {
        let frame = frame_of(vec![touching_slot(0, 100, 200, 10, 10)], 1);
        let events = finalize(&frame, &identity_mapping()).unwrap();
        assert_eq!(
            events,
            vec![
                TouchEvent::Contact {
                    id: 0,
                    x: 100,
                    y: 200,
                    major: 5,
                    minor: 5
                },
                TouchEvent::MtSync,
                TouchEvent::Pointer {
                    touching: true,
                    x: 100,
                    y: 200
                },
                TouchEvent::Sync,
            ]
        );
    }

    #[test]
    fn test_declared_count_covers_idle_slots() {
        // one finger down, count 5: four trailing bare syncs
        let frame = frame_of(vec![touching_slot(0, 100, 200, 10, 10)], 5);
        let events = finalize(&frame, &identity_mapping()).unwrap();
        assert_eq!(
            events,
            vec![
                TouchEvent::Contact {
                    id: 0,
                    x: 100,
                    y: 200,
                    major: 5,
                    minor: 5
                },
                TouchEvent::MtSync,
                TouchEvent::MtSync,
                TouchEvent::MtSync,
                TouchEvent::MtSync,
                TouchEvent::MtSync,
                TouchEvent::Pointer {
                    touching: true,
                    x: 100,
                    y: 200
                },
                TouchEvent::Sync,
            ]
        );
    }

    #[test]
    fn test_full_frame_uses_every_slot() {
        let slots: Vec<TouchSlot> = (0..5)
            .map(|k| touching_slot(k, 100 * k, 200 * k, 8, 4))
            .collect();
        let events = finalize(&frame_of(slots, 5), &identity_mapping()).unwrap();
        // five contact/sync pairs, then pointer and sync
        assert_eq!(events.len(), 12);
        assert_eq!(
            events[0],
            TouchEvent::Contact {
                id: 0,
                x: 0,
                y: 0,
                major: 4,
                minor: 2
            }
        );
        assert_eq!(events[9], TouchEvent::MtSync);
        assert!(matches!(events[10], TouchEvent::Pointer { touching: true, .. }));
        assert_eq!(events[11], TouchEvent::Sync);
    }

    #[test]
    fn test_empty_frame_rejected() {
        let frame = Frame::empty(5);
        assert_eq!(
            finalize(&frame, &identity_mapping()),
            Err(FrameRejection::Empty)
        );
    }

    #[test]
    fn test_overflowed_frame_rejected() {
        let mut frame = frame_of(vec![touching_slot(0, 1, 1, 1, 1)], 1);
        frame.overflowed = true;
        assert_eq!(
            finalize(&frame, &identity_mapping()),
            Err(FrameRejection::Overflow)
        );
    }

    #[test]
    fn test_incomplete_cycle_rejected() {
        let mut frame = frame_of(vec![touching_slot(0, 1, 1, 1, 1)], 1);
        frame.slots_written = 3;
        assert_eq!(
            finalize(&frame, &identity_mapping()),
            Err(FrameRejection::Truncated {
                written: 3,
                expected: 5
            })
        );
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let mut frame = frame_of(vec![touching_slot(0, 1, 1, 1, 1)], 3);
        frame.slots_written = 1;
        assert_eq!(
            finalize(&frame, &identity_mapping()),
            Err(FrameRejection::Truncated {
                written: 1,
                expected: 5
            })
        );
    }

    #[test]
    fn test_impossible_count_rejected() {
        let slots: Vec<TouchSlot> = (0..5).map(|k| touching_slot(k, 1, 1, 1, 1)).collect();
        assert_eq!(
            finalize(&frame_of(slots.clone(), 200), &identity_mapping()),
            Err(FrameRejection::BadContactCount(200))
        );
        assert_eq!(
            finalize(&frame_of(slots, -1), &identity_mapping()),
            Err(FrameRejection::BadContactCount(-1))
        );
    }

    #[test]
    fn test_junk_slot_rejects_whole_frame() {
        let good = touching_slot(0, 100, 100, 4, 4);
        let out_of_range = touching_slot(1, 40000, 100, 4, 4);
        let frame = frame_of(vec![good, out_of_range], 2);
        assert_eq!(
            finalize(&frame, &identity_mapping()),
            Err(FrameRejection::Junk { slot: 1 })
        );

        let bad_id = touching_slot(17, 100, 100, 4, 4);
        let frame = frame_of(vec![bad_id], 1);
        assert_eq!(
            finalize(&frame, &identity_mapping()),
            Err(FrameRejection::Junk { slot: 0 })
        );
    }

    #[test]
    fn test_junk_scan_covers_inactive_slots() {
        let good = touching_slot(0, 100, 100, 4, 4);
        let idle = TouchSlot {
            x: -5,
            ..TouchSlot::default()
        };
        let frame = frame_of(vec![good, idle], 2);
        assert_eq!(
            finalize(&frame, &identity_mapping()),
            Err(FrameRejection::Junk { slot: 1 })
        );
    }

    #[test]
    fn test_inactive_slot_emits_bare_sync() {
        let touching = touching_slot(0, 100, 200, 4, 4);
        let lifted = TouchSlot {
            contact_id: 1,
            x: 300,
            y: 400,
            ..TouchSlot::default()
        };
        let events = finalize(&frame_of(vec![touching, lifted], 2), &identity_mapping()).unwrap();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], TouchEvent::Contact { id: 0, .. }));
        assert_eq!(events[1], TouchEvent::MtSync);
        assert_eq!(events[2], TouchEvent::MtSync);
        assert!(matches!(events[3], TouchEvent::Pointer { touching: true, .. }));
    }

    #[test]
    fn test_pointer_follows_released_first_slot() {
        let lifted = TouchSlot {
            contact_id: 0,
            x: 150,
            y: 250,
            ..TouchSlot::default()
        };
        let events = finalize(&frame_of(vec![lifted], 1), &identity_mapping()).unwrap();
        assert_eq!(
            events,
            vec![
                TouchEvent::MtSync,
                TouchEvent::Pointer {
                    touching: false,
                    x: 150,
                    y: 250
                },
                TouchEvent::Sync,
            ]
        );
    }

    #[test]
    fn test_zero_size_contact_floors_to_one() {
        let frame = frame_of(vec![touching_slot(0, 100, 100, 0, 0)], 1);
        let events = finalize(&frame, &identity_mapping()).unwrap();
        assert_eq!(
            events[0],
            TouchEvent::Contact {
                id: 0,
                x: 100,
                y: 100,
                major: 1,
                minor: 1
            }
        );
    }

    #[test]
    fn test_contact_size_tracks_larger_dimension() {
        let frame = frame_of(vec![touching_slot(0, 100, 100, 6, 20)], 1);
        let events = finalize(&frame, &identity_mapping()).unwrap();
        assert_eq!(
            events[0],
            TouchEvent::Contact {
                id: 0,
                x: 100,
                y: 100,
                major: 10,
                minor: 3
            }
        );
    }

    #[test]
    fn test_remap_applies_to_coordinates() {
        let axis = AxisMap {
            report_min: 0,
            report_max: 32767,
            scale_min: 0,
            scale_max: 1023,
        };
        let mapping = Mapping { x: axis, y: axis };
        let frame = frame_of(vec![touching_slot(0, 32767, 16383, 10, 10)], 1);
        let events = finalize(&frame, &mapping).unwrap();
        assert!(matches!(
            events[0],
            TouchEvent::Contact {
                x: 1023,
                y: 511,
                ..
            }
        ));
    }
}
