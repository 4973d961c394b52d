//! Port I/O routing for `IN`/`OUT` traps.

use std::collections::HashMap;

pub trait PortIoDevice: Send {
    fn read(&mut self, port: u16, size: u8) -> u32;
    fn write(&mut self, port: u16, size: u8, value: u32);
}

struct RangeDevice {
    start: u16,
    len: u16,
    dev: Box<dyn PortIoDevice>,
}

impl RangeDevice {
    fn contains(&self, port: u16) -> bool {
        let p = u32::from(port);
        p >= u32::from(self.start) && p < u32::from(self.start) + u32::from(self.len)
    }
}

/// Dispatches port accesses to exact-port devices first, then to range devices.
#[derive(Default)]
pub struct IoPortBus {
    devices: HashMap<u16, Box<dyn PortIoDevice>>,
    ranges: Vec<RangeDevice>,
}

impl IoPortBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, port: u16, device: Box<dyn PortIoDevice>) {
        self.devices.insert(port, device);
    }

    /// Registers one device over `start..start+len`. Ranges are kept sorted by start port.
    pub fn register_range(&mut self, start: u16, len: u16, dev: Box<dyn PortIoDevice>) {
        let idx = self.ranges.partition_point(|r| r.start < start);
        self.ranges.insert(idx, RangeDevice { start, len, dev });
    }

    fn find_range(&mut self, port: u16) -> Option<&mut RangeDevice> {
        let idx = self.ranges.partition_point(|r| r.start <= port);
        let cand = self.ranges.get_mut(idx.checked_sub(1)?)?;
        cand.contains(port).then_some(cand)
    }

    pub fn read(&mut self, port: u16, size: u8) -> u32 {
        if let Some(dev) = self.devices.get_mut(&port) {
            return dev.read(port, size);
        }
        if let Some(range) = self.find_range(port) {
            return range.dev.read(port, size);
        }

        tracing::debug!(port = format_args!("{port:#x}"), size, "read from unmapped port");
        match size {
            1 => 0xFF,
            2 => 0xFFFF,
            _ => 0xFFFF_FFFF,
        }
    }

    pub fn write(&mut self, port: u16, size: u8, value: u32) {
        if let Some(dev) = self.devices.get_mut(&port) {
            dev.write(port, size, value);
            return;
        }
        if let Some(range) = self.find_range(port) {
            range.dev.write(port, size, value);
            return;
        }

        tracing::debug!(
            port = format_args!("{port:#x}"),
            size,
            value = format_args!("{value:#x}"),
            "write to unmapped port"
        );
    }

    pub fn read_u8(&mut self, port: u16) -> u8 {
        self.read(port, 1) as u8
    }

    pub fn write_u8(&mut self, port: u16, value: u8) {
        self.write(port, 1, u32::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Latch(Arc<AtomicU32>);

    impl PortIoDevice for Latch {
        fn read(&mut self, port: u16, _size: u8) -> u32 {
            self.0.load(Ordering::SeqCst) + u32::from(port)
        }

        fn write(&mut self, _port: u16, _size: u8, value: u32) {
            self.0.store(value, Ordering::SeqCst);
        }
    }

    #[test]
    fn exact_ports_win_over_ranges() {
        let exact = Arc::new(AtomicU32::new(0));
        let ranged = Arc::new(AtomicU32::new(0));
        let mut bus = IoPortBus::new();
        bus.register_range(0x3C0, 0x20, Box::new(Latch(ranged.clone())));
        bus.register(0x3C8, Box::new(Latch(exact.clone())));

        bus.write_u8(0x3C8, 5);
        bus.write_u8(0x3C9, 7);
        assert_eq!(exact.load(Ordering::SeqCst), 5);
        assert_eq!(ranged.load(Ordering::SeqCst), 7);
        assert_eq!(bus.read(0x3DA, 1), 7 + 0x3DA);
    }

    #[test]
    fn unmapped_ports_float_high() {
        let mut bus = IoPortBus::new();
        assert_eq!(bus.read_u8(0x61), 0xFF);
        assert_eq!(bus.read(0x61, 2), 0xFFFF);
        bus.write_u8(0x61, 0);
    }
}
