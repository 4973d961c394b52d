#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Text,
    Graphics,
}

/// One entry of the BIOS/VESA mode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VgaModeInfo {
    pub id: u16,
    pub kind: ModeKind,
    pub text_cols: u16,
    pub text_rows: u16,
    pub char_width: u8,
    pub char_height: u8,
    /// Pixels for graphics modes; for VESA text modes these hold the text grid.
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub colors: u32,
    pub pages: u8,
    pub supported: bool,
}

impl VgaModeInfo {
    /// Text grid of a text mode.
    pub fn text_size(&self) -> (u16, u16) {
        if self.text_cols != 0 {
            (self.text_cols, self.text_rows)
        } else {
            (self.width as u16, self.height as u16)
        }
    }
}

macro_rules! modes {
    ($(($id:expr, $kind:ident, $cols:expr, $rows:expr, $cw:expr, $ch:expr, $w:expr, $h:expr, $depth:expr, $colors:expr, $pages:expr, $supported:expr)),* $(,)?) => {
        &[$(VgaModeInfo {
            id: $id,
            kind: ModeKind::$kind,
            text_cols: $cols,
            text_rows: $rows,
            char_width: $cw,
            char_height: $ch,
            width: $w,
            height: $h,
            depth: $depth,
            colors: $colors,
            pages: $pages,
            supported: $supported,
        }),*]
    };
}

#[rustfmt::skip]
pub static MODE_TABLE: &[VgaModeInfo] = modes![
    (0x0000, Text,     40, 25, 9, 16,  360,  400,  0,  16, 8, true),
    (0x0001, Text,     40, 25, 9, 16,  360,  400,  0,  16, 8, true),
    (0x0002, Text,     80, 25, 9, 16,  360,  400,  0,  16, 8, true),
    (0x0003, Text,     80, 25, 9, 16,  360,  400,  0,  16, 8, true),
    (0x0004, Graphics, 40, 25, 8,  8,  320,  200,  2,   4, 1, true),
    (0x0005, Graphics, 40, 25, 8,  8,  320,  200,  2,   4, 1, true),
    (0x0006, Graphics, 80, 25, 8,  8,  640,  200,  1,   2, 1, true),
    (0x0007, Text,     80, 25, 9, 16,  720,  400,  0,   0, 8, false),
    (0x000D, Graphics, 40, 25, 8,  8,  320,  200,  4,  16, 8, false),
    (0x000E, Graphics, 80, 25, 8,  8,  640,  200,  4,  16, 4, false),
    (0x000F, Graphics, 80, 25, 8, 14,  640,  350,  0,   0, 2, false),
    (0x0010, Graphics, 80, 25, 8, 14,  640,  350,  4,  16, 2, false),
    (0x0011, Graphics, 80, 30, 8, 16,  640,  480,  1,   2, 1, false),
    (0x0012, Graphics, 80, 30, 8, 16,  640,  480,  4,  16, 1, false),
    (0x0013, Graphics, 40, 25, 8,  8,  320,  200,  8, 256, 1, true),
    (0x006A, Graphics,  0,  0, 0,  0,  800,  600,  4,  16, 1, true),
    (0x0100, Graphics,  0,  0, 0,  0,  640,  400,  8, 256, 1, true),
    (0x0101, Graphics,  0,  0, 0,  0,  640,  480,  8, 256, 1, true),
    (0x0102, Graphics,  0,  0, 0,  0,  800,  600,  4,  16, 1, true),
    (0x0103, Graphics,  0,  0, 0,  0,  800,  600,  8, 256, 1, true),
    (0x0104, Graphics,  0,  0, 0,  0, 1024,  768,  4,  16, 1, true),
    (0x0105, Graphics,  0,  0, 0,  0, 1024,  768,  8, 256, 1, true),
    (0x0106, Graphics,  0,  0, 0,  0, 1280, 1024,  4,  16, 1, true),
    (0x0107, Graphics,  0,  0, 0,  0, 1280, 1024,  8, 256, 1, true),
    (0x0108, Text,      0,  0, 0,  0,   80,   60,  0,   0, 1, true),
    (0x0109, Text,      0,  0, 0,  0,  132,   25,  0,   0, 1, true),
    (0x010A, Text,      0,  0, 0,  0,  132,   43,  0,   0, 1, true),
    (0x010B, Text,      0,  0, 0,  0,  132,   50,  0,   0, 1, true),
    (0x010C, Text,      0,  0, 0,  0,  132,   60,  0,   0, 1, true),
    (0x010D, Graphics,  0,  0, 0,  0,  320,  200, 15,   0, 1, true),
    (0x010E, Graphics,  0,  0, 0,  0,  320,  200, 16,   0, 1, true),
    (0x010F, Graphics,  0,  0, 0,  0,  320,  200, 24,   0, 1, true),
    (0x0110, Graphics,  0,  0, 0,  0,  640,  480, 15,   0, 1, true),
    (0x0111, Graphics,  0,  0, 0,  0,  640,  480, 16,   0, 1, true),
    (0x0112, Graphics,  0,  0, 0,  0,  640,  480, 24,   0, 1, true),
    (0x0113, Graphics,  0,  0, 0,  0,  800,  600, 15,   0, 1, true),
    (0x0114, Graphics,  0,  0, 0,  0,  800,  600, 16,   0, 1, true),
    (0x0115, Graphics,  0,  0, 0,  0,  800,  600, 24,   0, 1, true),
    (0x0116, Graphics,  0,  0, 0,  0, 1024,  768, 15,   0, 1, true),
    (0x0117, Graphics,  0,  0, 0,  0, 1024,  768, 16,   0, 1, true),
    (0x0118, Graphics,  0,  0, 0,  0, 1024,  768, 24,   0, 1, true),
    (0x0119, Graphics,  0,  0, 0,  0, 1280, 1024, 15,   0, 1, true),
    (0x011A, Graphics,  0,  0, 0,  0, 1280, 1024, 16,   0, 1, true),
    (0x011B, Graphics,  0,  0, 0,  0, 1280, 1024, 24,   0, 1, true),
];

/// Looks up a mode number. Flag bits (VESA linear framebuffer, don't-clear) are ignored.
pub fn mode_info(mode: u16) -> Option<&'static VgaModeInfo> {
    let mode = mode & 0x17F;
    MODE_TABLE.iter().find(|info| info.id == mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_masks_flag_bits() {
        assert_eq!(mode_info(0x13).map(|m| m.depth), Some(8));
        assert_eq!(mode_info(0x4101).map(|m| m.id), Some(0x101));
        assert_eq!(mode_info(0x0083).map(|m| m.kind), Some(ModeKind::Text));
        assert!(mode_info(0x14).is_none());
    }

    #[test]
    fn vesa_text_modes_report_their_grid() {
        let info = mode_info(0x109).unwrap();
        assert_eq!(info.text_size(), (132, 25));
        assert_eq!(mode_info(3).unwrap().text_size(), (80, 25));
    }
}
