//! Unpacking of Riemann touch reports into the flat field stream the
//! slot state machine consumes.
//! Layout per report: id byte, then per contact a status byte, a contact
//! id byte and x/y/w/h as u16le, then one trailing contact-count byte.

pub const TOUCH_REPORT_ID: u8 = 0x01;

/// Bytes per contact block.
pub const SLOT_BLOCK_LEN: usize = 10;

const TIPSWITCH_BIT: u8 = 1 << 0;
const IN_RANGE_BIT: u8 = 1 << 1;
const CONFIDENCE_BIT: u8 = 1 << 2;

/// Fields of the touch report, in block order. `H` doubles as the slot
/// terminator and `ContactCount` closes the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    TipSwitch,
    InRange,
    Confidence,
    ContactId,
    X,
    Y,
    W,
    H,
    ContactCount,
}

/// Whole-report length for a given slot count.
pub fn report_len(slots: usize) -> usize {
    1 + slots * SLOT_BLOCK_LEN + 1
}

/// Decode one input report into `(usage, value)` pairs.
///
/// Returns `None` for reports that are not touch reports. Trailing bytes
/// that do not form a whole block are dropped; the state machine's frame
/// accounting absorbs the resulting short stream.
pub fn unpack_report(data: &[u8]) -> Option<Vec<(Usage, i32)>> {
    let (&report_id, body) = data.split_first()?;
    if report_id != TOUCH_REPORT_ID {
        return None;
    }

    let mut fields = Vec::with_capacity(body.len() / SLOT_BLOCK_LEN * 8 + 1);
    let mut blocks = body.chunks_exact(SLOT_BLOCK_LEN);
    for block in blocks.by_ref() {
        let status = block[0];
        fields.push((Usage::TipSwitch, i32::from((status & TIPSWITCH_BIT) != 0)));
        fields.push((Usage::InRange, i32::from((status & IN_RANGE_BIT) != 0)));
        fields.push((Usage::Confidence, i32::from((status & CONFIDENCE_BIT) != 0)));
        fields.push((Usage::ContactId, i32::from(block[1])));
        fields.push((Usage::X, read_u16(block, 2)));
        fields.push((Usage::Y, read_u16(block, 4)));
        fields.push((Usage::W, read_u16(block, 6)));
        fields.push((Usage::H, read_u16(block, 8)));
    }
    if let [count] = blocks.remainder() {
        fields.push((Usage::ContactCount, i32::from(*count)));
    }

    Some(fields)
}

fn read_u16(block: &[u8], at: usize) -> i32 {
    i32::from(u16::from_le_bytes([block[at], block[at + 1]]))
}
