use bitflags::bitflags;

bitflags! {
    /// Keyboard status byte at 0040:0017.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ShiftFlags: u8 {
        const RIGHT_SHIFT = 0x01;
        const LEFT_SHIFT = 0x02;
        const CTRL = 0x04;
        const ALT = 0x08;
        const SCROLL_LOCK = 0x10;
        const NUM_LOCK = 0x20;
        const CAPS_LOCK = 0x40;
        const INSERT = 0x80;
    }
}

/// Keys that change the shift state instead of producing a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKey {
    Held(ShiftFlags),
    Toggle(ShiftFlags),
}

impl ShiftKey {
    /// Classifies a make code (bit 7 clear).
    pub fn from_scan(scan: u8) -> Option<Self> {
        Some(match scan & 0x7F {
            0x2A => Self::Held(ShiftFlags::LEFT_SHIFT),
            0x36 => Self::Held(ShiftFlags::RIGHT_SHIFT),
            0x1D => Self::Held(ShiftFlags::CTRL),
            0x38 => Self::Held(ShiftFlags::ALT),
            0x3A => Self::Toggle(ShiftFlags::CAPS_LOCK),
            0x45 => Self::Toggle(ShiftFlags::NUM_LOCK),
            0x46 => Self::Toggle(ShiftFlags::SCROLL_LOCK),
            _ => return None,
        })
    }
}

impl ShiftFlags {
    /// Applies a make or break code. Returns true when the scan code was a shift key.
    pub fn track(&mut self, scan: u8) -> bool {
        let released = scan & 0x80 != 0;
        match ShiftKey::from_scan(scan) {
            Some(ShiftKey::Held(flag)) => {
                self.set(flag, !released);
                true
            }
            Some(ShiftKey::Toggle(flag)) => {
                if !released {
                    self.toggle(flag);
                }
                true
            }
            None => false,
        }
    }
}
