use crate::host::PaletteEntry;

/// Address/data latches of the palette DAC (ports 3C7h–3C9h).
///
/// Guests write 6-bit components; the palette keeps them scaled to 8 bits by `<< 2`.
#[derive(Debug, Clone, Default)]
pub(crate) struct DacLatch {
    write_index: u8,
    read_index: u8,
    write_component: usize,
    read_component: usize,
    latch: [u8; 3],
    pel_mask: u8,
}

impl DacLatch {
    pub(crate) fn new() -> Self {
        Self {
            pel_mask: 0xFF,
            ..Self::default()
        }
    }

    pub(crate) fn select_write(&mut self, index: u8) {
        self.write_index = index;
        self.write_component = 0;
    }

    pub(crate) fn select_read(&mut self, index: u8) {
        self.read_index = index;
        self.read_component = 0;
    }

    pub(crate) fn write_index(&self) -> u8 {
        self.write_index
    }

    pub(crate) fn pel_mask(&self) -> u8 {
        self.pel_mask
    }

    pub(crate) fn set_pel_mask(&mut self, mask: u8) {
        self.pel_mask = mask;
    }

    /// Latches one component. Returns the completed entry after the third write.
    pub(crate) fn write_data(&mut self, value: u8) -> Option<(u8, PaletteEntry)> {
        self.latch[self.write_component] = value << 2;
        self.write_component += 1;
        if self.write_component < 3 {
            return None;
        }

        let index = self.write_index;
        let [red, green, blue] = self.latch;
        self.write_index = self.write_index.wrapping_add(1);
        self.write_component = 0;
        Some((index, PaletteEntry::new(red, green, blue)))
    }

    pub(crate) fn read_data(&mut self, palette: &[PaletteEntry; 256]) -> u8 {
        let entry = palette[usize::from(self.read_index)];
        let value = [entry.red, entry.green, entry.blue][self.read_component] >> 2;
        self.read_component += 1;
        if self.read_component == 3 {
            self.read_component = 0;
            self.read_index = self.read_index.wrapping_add(1);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triplet_commits_and_advances() {
        let mut dac = DacLatch::new();
        dac.select_write(5);
        assert_eq!(dac.write_data(0x3F), None);
        assert_eq!(dac.write_data(0x00), None);
        assert_eq!(
            dac.write_data(0x00),
            Some((5, PaletteEntry::new(0xFC, 0x00, 0x00)))
        );
        assert_eq!(dac.write_index(), 6);
    }

    #[test]
    fn reads_return_six_bit_components() {
        let mut palette = [PaletteEntry::default(); 256];
        palette[2] = PaletteEntry::new(0xFC, 0x80, 0x04);
        palette[3] = PaletteEntry::new(0x04, 0x00, 0x00);
        let mut dac = DacLatch::new();
        dac.select_read(2);
        let got: Vec<u8> = (0..4).map(|_| dac.read_data(&palette)).collect();
        assert_eq!(got, vec![0x3F, 0x20, 0x01, 0x01]);
    }
}
