//! Slot accumulation state machine. Fields arrive one at a time; the
//! height field closes a slot and the contact count closes the frame.

use super::report::Usage;

/// One contact's accumulated fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchSlot {
    pub tip_switch: bool,
    pub in_range: bool,
    pub confidence: bool,
    pub contact_id: i32,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl TouchSlot {
    /// A slot counts as touching when any status flag is set.
    pub fn active(&self) -> bool {
        self.tip_switch || self.in_range || self.confidence
    }
}

/// A closed frame, ready for the finalizer.
#[derive(Debug, Clone)]
pub struct Frame {
    pub slots: Vec<TouchSlot>,
    pub declared_contacts: i32,
    /// Slots whose terminator arrived.
    pub slots_written: usize,
    /// A field landed past the last slot.
    pub overflowed: bool,
}

impl Frame {
    pub fn empty(max_slots: usize) -> Self {
        Self {
            slots: vec![TouchSlot::default(); max_slots],
            declared_contacts: 0,
            slots_written: 0,
            overflowed: false,
        }
    }
}

/// Demultiplexes the flat field stream into frames. The cursor ranges
/// over `0..=max_slots`; at `max_slots` further slot fields are dropped
/// and the frame is marked overflowed instead of writing out of bounds.
pub struct TouchState {
    max_slots: usize,
    frame: Frame,
    cursor: usize,
    overflow_logged: bool,
}

impl TouchState {
    pub fn new(max_slots: usize) -> Self {
        Self {
            max_slots,
            frame: Frame::empty(max_slots),
            cursor: 0,
            overflow_logged: false,
        }
    }

    /// Feed one decoded field. Returns the finished frame when the field
    /// was the closing contact count.
    pub fn push(&mut self, usage: Usage, value: i32) -> Option<Frame> {
        match usage {
            Usage::TipSwitch => self.with_slot(|s| s.tip_switch = value != 0),
            Usage::InRange => self.with_slot(|s| s.in_range = value != 0),
            Usage::Confidence => self.with_slot(|s| s.confidence = value != 0),
            Usage::ContactId => self.with_slot(|s| s.contact_id = value),
            Usage::X => self.with_slot(|s| s.x = value),
            Usage::Y => self.with_slot(|s| s.y = value),
            Usage::W => self.with_slot(|s| s.w = value),
            Usage::H => {
                self.with_slot(|s| s.h = value);
                self.advance_slot();
            }
            Usage::ContactCount => return Some(self.finish_frame(value)),
        }
        None
    }

    fn with_slot(&mut self, write: impl FnOnce(&mut TouchSlot)) {
        match self.frame.slots.get_mut(self.cursor) {
            Some(slot) => write(slot),
            None => self.mark_overflow(),
        }
    }

    /// Slot terminator: the height field was the block's last, so the
    /// cursor moves on.
    fn advance_slot(&mut self) {
        if self.cursor < self.max_slots {
            self.cursor += 1;
            self.frame.slots_written = self.cursor;
        } else {
            self.mark_overflow();
        }
    }

    /// Frame terminator: record the declared count, hand the frame out
    /// and start the next one from zeroed slots.
    fn finish_frame(&mut self, declared: i32) -> Frame {
        let mut done = std::mem::replace(&mut self.frame, Frame::empty(self.max_slots));
        done.declared_contacts = declared;
        self.cursor = 0;
        self.overflow_logged = false;
        done
    }

    fn mark_overflow(&mut self) {
        self.frame.overflowed = true;
        if !self.overflow_logged {
            log::error!(
                "slot overflow: more than {} contact blocks in one frame",
                self.max_slots
            );
            self.overflow_logged = true;
        }
    }
}
