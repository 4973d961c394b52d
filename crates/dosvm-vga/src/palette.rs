use crate::host::PaletteEntry;

/// DAC contents after a mode 13h set: the 16 IRGB colours, a grey ramp, then hue wheels at three
/// intensities and saturations. Entries 0xF8..=0xFF are black.
const DEFAULT_DAC: [[u8; 3]; 0xF8] = [
    [0x00, 0x00, 0x00], [0x00, 0x00, 0xAA], [0x00, 0xAA, 0x00], [0x00, 0xAA, 0xAA],
    [0xAA, 0x00, 0x00], [0xAA, 0x00, 0xAA], [0xAA, 0x55, 0x00], [0xAA, 0xAA, 0xAA],
    [0x55, 0x55, 0x55], [0x55, 0x55, 0xFF], [0x55, 0xFF, 0x55], [0x55, 0xFF, 0xFF],
    [0xFF, 0x55, 0x55], [0xFF, 0x55, 0xFF], [0xFF, 0xFF, 0x55], [0xFF, 0xFF, 0xFF],
    [0x00, 0x00, 0x00], [0x10, 0x10, 0x10], [0x20, 0x20, 0x20], [0x35, 0x35, 0x35],
    [0x45, 0x45, 0x45], [0x55, 0x55, 0x55], [0x65, 0x65, 0x65], [0x75, 0x75, 0x75],
    [0x8A, 0x8A, 0x8A], [0x9A, 0x9A, 0x9A], [0xAA, 0xAA, 0xAA], [0xBA, 0xBA, 0xBA],
    [0xCA, 0xCA, 0xCA], [0xDF, 0xDF, 0xDF], [0xEF, 0xEF, 0xEF], [0xFF, 0xFF, 0xFF],
    [0x00, 0x00, 0xFF], [0x41, 0x00, 0xFF], [0x82, 0x00, 0xFF], [0xBE, 0x00, 0xFF],
    [0xFF, 0x00, 0xFF], [0xFF, 0x00, 0xBE], [0xFF, 0x00, 0x82], [0xFF, 0x00, 0x41],
    [0xFF, 0x00, 0x00], [0xFF, 0x41, 0x00], [0xFF, 0x82, 0x00], [0xFF, 0xBE, 0x00],
    [0xFF, 0xFF, 0x00], [0xBE, 0xFF, 0x00], [0x82, 0xFF, 0x00], [0x41, 0xFF, 0x00],
    [0x00, 0xFF, 0x00], [0x00, 0xFF, 0x41], [0x00, 0xFF, 0x82], [0x00, 0xFF, 0xBE],
    [0x00, 0xFF, 0xFF], [0x00, 0xBE, 0xFF], [0x00, 0x82, 0xFF], [0x00, 0x41, 0xFF],
    [0x82, 0x82, 0xFF], [0x9E, 0x82, 0xFF], [0xBE, 0x82, 0xFF], [0xDF, 0x82, 0xFF],
    [0xFF, 0x82, 0xFF], [0xFF, 0x82, 0xDF], [0xFF, 0x82, 0xBE], [0xFF, 0x82, 0x9E],
    [0xFF, 0x82, 0x82], [0xFF, 0x9E, 0x82], [0xFF, 0xBE, 0x82], [0xFF, 0xDF, 0x82],
    [0xFF, 0xFF, 0x82], [0xDF, 0xFF, 0x82], [0xBE, 0xFF, 0x82], [0x9E, 0xFF, 0x82],
    [0x82, 0xFF, 0x82], [0x82, 0xFF, 0x9E], [0x82, 0xFF, 0xBE], [0x82, 0xFF, 0xDF],
    [0x82, 0xFF, 0xFF], [0x82, 0xDF, 0xFF], [0x82, 0xBE, 0xFF], [0x82, 0x9E, 0xFF],
    [0xBA, 0xBA, 0xFF], [0xCA, 0xBA, 0xFF], [0xDF, 0xBA, 0xFF], [0xEF, 0xBA, 0xFF],
    [0xFF, 0xBA, 0xFF], [0xFF, 0xBA, 0xEF], [0xFF, 0xBA, 0xDF], [0xFF, 0xBA, 0xCA],
    [0xFF, 0xBA, 0xBA], [0xFF, 0xCA, 0xBA], [0xFF, 0xDF, 0xBA], [0xFF, 0xEF, 0xBA],
    [0xFF, 0xFF, 0xBA], [0xEF, 0xFF, 0xBA], [0xDF, 0xFF, 0xBA], [0xCA, 0xFF, 0xBA],
    [0xBA, 0xFF, 0xBA], [0xBA, 0xFF, 0xCA], [0xBA, 0xFF, 0xDF], [0xBA, 0xFF, 0xEF],
    [0xBA, 0xFF, 0xFF], [0xBA, 0xEF, 0xFF], [0xBA, 0xDF, 0xFF], [0xBA, 0xCA, 0xFF],
    [0x00, 0x00, 0x71], [0x1C, 0x00, 0x71], [0x39, 0x00, 0x71], [0x55, 0x00, 0x71],
    [0x71, 0x00, 0x71], [0x71, 0x00, 0x55], [0x71, 0x00, 0x39], [0x71, 0x00, 0x1C],
    [0x71, 0x00, 0x00], [0x71, 0x1C, 0x00], [0x71, 0x39, 0x00], [0x71, 0x55, 0x00],
    [0x71, 0x71, 0x00], [0x55, 0x71, 0x00], [0x39, 0x71, 0x00], [0x1C, 0x71, 0x00],
    [0x00, 0x71, 0x00], [0x00, 0x71, 0x1C], [0x00, 0x71, 0x39], [0x00, 0x71, 0x55],
    [0x00, 0x71, 0x71], [0x00, 0x55, 0x71], [0x00, 0x39, 0x71], [0x00, 0x1C, 0x71],
    [0x39, 0x39, 0x71], [0x45, 0x39, 0x71], [0x55, 0x39, 0x71], [0x61, 0x39, 0x71],
    [0x71, 0x39, 0x71], [0x71, 0x39, 0x61], [0x71, 0x39, 0x55], [0x71, 0x39, 0x45],
    [0x71, 0x39, 0x39], [0x71, 0x45, 0x39], [0x71, 0x55, 0x39], [0x71, 0x61, 0x39],
    [0x71, 0x71, 0x39], [0x61, 0x71, 0x39], [0x55, 0x71, 0x39], [0x45, 0x71, 0x39],
    [0x39, 0x71, 0x39], [0x39, 0x71, 0x45], [0x39, 0x71, 0x55], [0x39, 0x71, 0x61],
    [0x39, 0x71, 0x71], [0x39, 0x61, 0x71], [0x39, 0x55, 0x71], [0x39, 0x45, 0x71],
    [0x51, 0x51, 0x71], [0x59, 0x51, 0x71], [0x61, 0x51, 0x71], [0x69, 0x51, 0x71],
    [0x71, 0x51, 0x71], [0x71, 0x51, 0x69], [0x71, 0x51, 0x61], [0x71, 0x51, 0x59],
    [0x71, 0x51, 0x51], [0x71, 0x59, 0x51], [0x71, 0x61, 0x51], [0x71, 0x69, 0x51],
    [0x71, 0x71, 0x51], [0x69, 0x71, 0x51], [0x61, 0x71, 0x51], [0x59, 0x71, 0x51],
    [0x51, 0x71, 0x51], [0x51, 0x71, 0x59], [0x51, 0x71, 0x61], [0x51, 0x71, 0x69],
    [0x51, 0x71, 0x71], [0x51, 0x69, 0x71], [0x51, 0x61, 0x71], [0x51, 0x59, 0x71],
    [0x00, 0x00, 0x41], [0x10, 0x00, 0x41], [0x20, 0x00, 0x41], [0x31, 0x00, 0x41],
    [0x41, 0x00, 0x41], [0x41, 0x00, 0x31], [0x41, 0x00, 0x20], [0x41, 0x00, 0x10],
    [0x41, 0x00, 0x00], [0x41, 0x10, 0x00], [0x41, 0x20, 0x00], [0x41, 0x31, 0x00],
    [0x41, 0x41, 0x00], [0x31, 0x41, 0x00], [0x20, 0x41, 0x00], [0x10, 0x41, 0x00],
    [0x00, 0x41, 0x00], [0x00, 0x41, 0x10], [0x00, 0x41, 0x20], [0x00, 0x41, 0x31],
    [0x00, 0x41, 0x41], [0x00, 0x31, 0x41], [0x00, 0x20, 0x41], [0x00, 0x10, 0x41],
    [0x20, 0x20, 0x41], [0x28, 0x20, 0x41], [0x31, 0x20, 0x41], [0x39, 0x20, 0x41],
    [0x41, 0x20, 0x41], [0x41, 0x20, 0x39], [0x41, 0x20, 0x31], [0x41, 0x20, 0x28],
    [0x41, 0x20, 0x20], [0x41, 0x28, 0x20], [0x41, 0x31, 0x20], [0x41, 0x39, 0x20],
    [0x41, 0x41, 0x20], [0x39, 0x41, 0x20], [0x31, 0x41, 0x20], [0x28, 0x41, 0x20],
    [0x20, 0x41, 0x20], [0x20, 0x41, 0x28], [0x20, 0x41, 0x31], [0x20, 0x41, 0x39],
    [0x20, 0x41, 0x41], [0x20, 0x39, 0x41], [0x20, 0x31, 0x41], [0x20, 0x28, 0x41],
    [0x2D, 0x2D, 0x41], [0x31, 0x2D, 0x41], [0x35, 0x2D, 0x41], [0x3D, 0x2D, 0x41],
    [0x41, 0x2D, 0x41], [0x41, 0x2D, 0x3D], [0x41, 0x2D, 0x35], [0x41, 0x2D, 0x31],
    [0x41, 0x2D, 0x2D], [0x41, 0x31, 0x2D], [0x41, 0x35, 0x2D], [0x41, 0x3D, 0x2D],
    [0x41, 0x41, 0x2D], [0x3D, 0x41, 0x2D], [0x35, 0x41, 0x2D], [0x31, 0x41, 0x2D],
    [0x2D, 0x41, 0x2D], [0x2D, 0x41, 0x31], [0x2D, 0x41, 0x35], [0x2D, 0x41, 0x3D],
    [0x2D, 0x41, 0x41], [0x2D, 0x3D, 0x41], [0x2D, 0x35, 0x41], [0x2D, 0x31, 0x41],
];

pub fn default_palette() -> [PaletteEntry; 256] {
    let mut palette = [PaletteEntry::default(); 256];
    for (entry, &[r, g, b]) in palette.iter_mut().zip(DEFAULT_DAC.iter()) {
        *entry = PaletteEntry::new(r, g, b);
    }
    palette
}

/// Colour of a 6-bit EGA `rgbRGB` value (upper-case bits are the 2/3 intensity component).
pub const fn ega_color(value: u8) -> PaletteEntry {
    const fn channel(value: u8, high: u8, low: u8) -> u8 {
        ((value >> high) & 1) * 0xAA + ((value >> low) & 1) * 0x55
    }
    PaletteEntry::new(
        channel(value, 2, 5),
        channel(value, 1, 4),
        channel(value, 0, 3),
    )
}

/// Power-on attribute controller palette registers (16 colours plus overscan).
pub const DEFAULT_ATTRIBUTE_PALETTE: [u8; 17] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x14, 0x07, 0x38, 0x39, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F,
    0x00,
];

pub const CGA_PALETTE_1: [PaletteEntry; 4] = [
    PaletteEntry::new(0x00, 0x00, 0x00),
    PaletteEntry::new(0x00, 0xAA, 0xAA),
    PaletteEntry::new(0xAA, 0x00, 0xAA),
    PaletteEntry::new(0xAA, 0xAA, 0xAA),
];

pub const CGA_PALETTE_1_BRIGHT: [PaletteEntry; 4] = [
    PaletteEntry::new(0x00, 0x00, 0x00),
    PaletteEntry::new(0x55, 0xFF, 0xFF),
    PaletteEntry::new(0xFF, 0x55, 0xFF),
    PaletteEntry::new(0xFF, 0xFF, 0xFF),
];

pub const CGA_PALETTE_2: [PaletteEntry; 4] = [
    PaletteEntry::new(0x00, 0x00, 0x00),
    PaletteEntry::new(0x00, 0xAA, 0x00),
    PaletteEntry::new(0xAA, 0x00, 0x00),
    PaletteEntry::new(0xAA, 0x55, 0x00),
];

pub const CGA_PALETTE_2_BRIGHT: [PaletteEntry; 4] = [
    PaletteEntry::new(0x00, 0x00, 0x00),
    PaletteEntry::new(0x55, 0xFF, 0x55),
    PaletteEntry::new(0xFF, 0x55, 0x55),
    PaletteEntry::new(0xFF, 0xFF, 0x55),
];

/// Four-colour palette selected through the CGA colour control register.
///
/// Palette index 1 is cyan/magenta/white, index 0 is green/red/brown.
pub fn cga_palette(index: u8, bright: bool) -> &'static [PaletteEntry; 4] {
    match (index, bright) {
        (0, false) => &CGA_PALETTE_2,
        (0, true) => &CGA_PALETTE_2_BRIGHT,
        (_, false) => &CGA_PALETTE_1,
        (_, true) => &CGA_PALETTE_1_BRIGHT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ega_colors_cover_the_irgb_set() {
        assert_eq!(ega_color(0x14), PaletteEntry::new(0xAA, 0x55, 0x00));
        assert_eq!(ega_color(0x38), PaletteEntry::new(0x55, 0x55, 0x55));
        assert_eq!(ega_color(0x3F), PaletteEntry::new(0xFF, 0xFF, 0xFF));

        let palette = default_palette();
        for (reg, &ega) in DEFAULT_ATTRIBUTE_PALETTE[..16].iter().enumerate() {
            assert_eq!(palette[reg], ega_color(ega), "register {reg}");
        }
        assert_eq!(palette[0xFF], PaletteEntry::default());
    }
}
