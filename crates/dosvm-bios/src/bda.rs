//! BIOS data area layout (segment 0040h).

use dosvm_memory::GuestMemory;

pub const BDA_BASE: u32 = 0x400;

pub const EQUIPMENT_LIST: u32 = 0x410;
pub const MEMORY_SIZE_KB: u32 = 0x413;
pub const KBD_SHIFT_FLAGS: u32 = 0x417;
pub const KBD_SHIFT_FLAGS2: u32 = 0x418;
/// Offset (relative to [`BDA_BASE`]) of the next keystroke to consume.
pub const KBD_READ_PTR: u32 = 0x41A;
/// Offset (relative to [`BDA_BASE`]) of the next free slot.
pub const KBD_WRITE_PTR: u32 = 0x41C;
pub const KBD_BUFFER: u32 = 0x41E;
pub const KBD_BUFFER_START: u32 = 0x480;
pub const KBD_BUFFER_END: u32 = 0x482;

pub const VIDEO_MODE: u32 = 0x449;
pub const VIDEO_COLUMNS: u32 = 0x44A;
pub const VIDEO_PAGE_SIZE: u32 = 0x44C;
pub const VIDEO_CURSOR_POS: u32 = 0x450;
pub const VIDEO_CURSOR_SHAPE: u32 = 0x460;
pub const VIDEO_PAGE: u32 = 0x462;
pub const VIDEO_CRTC_BASE: u32 = 0x463;
/// Rows on screen minus one.
pub const VIDEO_ROWS: u32 = 0x484;

pub const TIMER_TICKS: u32 = 0x46C;
pub const TIMER_ROLLOVER: u32 = 0x470;
/// Timer ticks in 24 hours at 18.2 Hz.
pub const TICKS_PER_DAY: u32 = 0x0018_00B0;

// 80x25 colour video and a math coprocessor.
const EQUIPMENT_DEFAULT: u16 = 0x0022;
const CONVENTIONAL_MEMORY_KB: u16 = 640;

pub fn init_bda(memory: &GuestMemory) {
    memory.write_u16(EQUIPMENT_LIST, EQUIPMENT_DEFAULT);
    memory.write_u16(MEMORY_SIZE_KB, CONVENTIONAL_MEMORY_KB);

    let buffer_start = (KBD_BUFFER - BDA_BASE) as u16;
    let buffer_end = buffer_start + 0x20;
    memory.write_u16(KBD_BUFFER_START, buffer_start);
    memory.write_u16(KBD_BUFFER_END, buffer_end);
    memory.write_u16(KBD_READ_PTR, buffer_start);
    memory.write_u16(KBD_WRITE_PTR, buffer_start);

    memory.write_u8(VIDEO_MODE, 0x03);
    memory.write_u16(VIDEO_COLUMNS, 80);
    memory.write_u16(VIDEO_PAGE_SIZE, 80 * 25 * 2);
    memory.write_u8(VIDEO_PAGE, 0);
    memory.write_u16(VIDEO_CRTC_BASE, 0x3D4);
    memory.write_u8(VIDEO_ROWS, 24);
}

/// Advances the daily tick counter by one, handling the midnight rollover.
pub fn advance_timer_ticks(memory: &GuestMemory) -> u32 {
    let mut ticks = memory.read_u32(TIMER_TICKS).wrapping_add(1);
    if ticks >= TICKS_PER_DAY {
        ticks = 0;
        memory.write_u8(TIMER_ROLLOVER, 1);
    }
    memory.write_u32(TIMER_TICKS, ticks);
    ticks
}

/// Records the active video mode geometry for BIOS readers.
pub fn set_video_mode(memory: &GuestMemory, mode: u8, columns: u16, rows: u16) {
    memory.write_u8(VIDEO_MODE, mode);
    memory.write_u16(VIDEO_COLUMNS, columns);
    memory.write_u8(VIDEO_ROWS, rows.saturating_sub(1) as u8);
    memory.write_u16(VIDEO_PAGE_SIZE, columns.saturating_mul(rows).saturating_mul(2));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_roll_over_at_midnight() {
        let memory = GuestMemory::new(0x1000);
        memory.write_u32(TIMER_TICKS, TICKS_PER_DAY - 2);
        assert_eq!(advance_timer_ticks(&memory), TICKS_PER_DAY - 1);
        assert_eq!(memory.read_u8(TIMER_ROLLOVER), 0);
        assert_eq!(advance_timer_ticks(&memory), 0);
        assert_eq!(memory.read_u8(TIMER_ROLLOVER), 1);
    }
}
