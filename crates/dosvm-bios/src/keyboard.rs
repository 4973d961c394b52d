use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use dosvm_cpu::{CpuContext, PortIoDevice};
use dosvm_interrupts::{EventScheduler, SchedulerError, PRIORITY_KEYBOARD};
use dosvm_memory::GuestMemory;
use parking_lot::Mutex;

use crate::bda::{BDA_BASE, KBD_BUFFER, KBD_BUFFER_END, KBD_BUFFER_START, KBD_READ_PTR, KBD_WRITE_PTR};

/// Keystroke ring in the BIOS data area.
///
/// Both pointers are offsets from segment 0040h. `write == read` means empty, so one of the 16
/// slots always stays unused.
#[derive(Debug, Clone)]
pub struct KeyboardBuffer {
    memory: GuestMemory,
}

impl KeyboardBuffer {
    pub fn new(memory: GuestMemory) -> Self {
        Self { memory }
    }

    fn bounds(&self) -> (u16, u16) {
        let start = self.memory.read_u16(KBD_BUFFER_START);
        let end = self.memory.read_u16(KBD_BUFFER_END);
        if start < end && (end - start) % 2 == 0 {
            (start, end)
        } else {
            let start = (KBD_BUFFER - BDA_BASE) as u16;
            (start, start + 0x20)
        }
    }

    /// Reads a ring pointer; one outside `[start, end)` or misaligned with `start` reads as `start`.
    fn pointer(&self, addr: u32) -> u16 {
        let (start, end) = self.bounds();
        let ptr = self.memory.read_u16(addr);
        if ptr < start || ptr >= end || (ptr - start) % 2 != 0 {
            start
        } else {
            ptr
        }
    }

    fn advance(&self, ptr: u16) -> u16 {
        let (start, end) = self.bounds();
        let next = ptr.wrapping_add(2);
        if next >= end || next < start {
            start
        } else {
            next
        }
    }

    /// Appends a keystroke. Returns false, leaving the ring untouched, when it is full.
    pub fn produce(&self, scan: u8, ascii: u8) -> bool {
        let write = self.pointer(KBD_WRITE_PTR);
        let next = self.advance(write);
        if next == self.pointer(KBD_READ_PTR) {
            tracing::warn!(scan = format_args!("{scan:#04x}"), "keyboard buffer full");
            return false;
        }

        let slot = BDA_BASE + u32::from(write);
        self.memory.write_u8(slot, ascii);
        self.memory.write_u8(slot + 1, scan);
        self.memory.write_u16(KBD_WRITE_PTR, next);
        true
    }

    /// Oldest keystroke as `(scan, ascii)`, without removing it.
    pub fn peek(&self) -> Option<(u8, u8)> {
        let read = self.pointer(KBD_READ_PTR);
        if read == self.pointer(KBD_WRITE_PTR) {
            return None;
        }
        let slot = BDA_BASE + u32::from(read);
        Some((self.memory.read_u8(slot + 1), self.memory.read_u8(slot)))
    }

    /// Removes and returns the oldest keystroke as `(scan, ascii)`.
    pub fn consume(&self) -> Option<(u8, u8)> {
        let key = self.peek()?;
        let read = self.pointer(KBD_READ_PTR);
        self.memory.write_u16(KBD_READ_PTR, self.advance(read));
        Some(key)
    }

    pub fn is_empty(&self) -> bool {
        self.peek().is_none()
    }
}

/// Scan codes waiting to be picked up by the guest's INT 09h handler.
pub const KEYBOARD_QUEUE_LEN: usize = 15;
pub const KEYBOARD_DATA_PORT: u16 = 0x60;
pub const KEYBOARD_STATUS_PORT: u16 = 0x64;

#[derive(Default)]
struct ScanQueue {
    entries: VecDeque<(u8, u8)>,
    last_scan: u8,
}

/// Hands host key events to the guest one IRQ1 at a time.
///
/// Each queued scan code raises IRQ1; the entry stays at the head of the queue (and visible on
/// port 60h) until the IRQ is acknowledged.
pub struct KeyboardController {
    queue: Mutex<ScanQueue>,
    scheduler: Arc<EventScheduler>,
}

impl KeyboardController {
    pub fn new(scheduler: Arc<EventScheduler>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(ScanQueue::default()),
            scheduler,
        })
    }

    /// Queues a scan code and raises IRQ1. Returns false when the queue is full.
    pub fn send_scan(self: &Arc<Self>, scan: u8, ascii: u8) -> Result<bool, SchedulerError> {
        {
            let mut queue = self.queue.lock();
            if queue.entries.len() >= KEYBOARD_QUEUE_LEN {
                tracing::error!(scan = format_args!("{scan:#04x}"), "keyboard queue overflow");
                return Ok(false);
            }
            queue.entries.push_back((scan, ascii));
        }

        let relay: Weak<Self> = Arc::downgrade(self);
        let queued = self.scheduler.queue_event(
            Some(1),
            PRIORITY_KEYBOARD,
            Some(Box::new(move |_ctx: Option<&mut CpuContext>| {
                if let Some(controller) = relay.upgrade() {
                    controller.retire_head();
                }
            })),
        );
        if let Err(err) = queued {
            self.queue.lock().entries.pop_back();
            return Err(err);
        }
        Ok(true)
    }

    /// The scan code (and translated ASCII) the current IRQ1 is about.
    pub fn current_scan(&self) -> (u8, u8) {
        let queue = self.queue.lock();
        queue
            .entries
            .front()
            .copied()
            .unwrap_or((queue.last_scan, 0))
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().entries.len()
    }

    fn retire_head(&self) {
        let mut queue = self.queue.lock();
        if let Some((scan, _)) = queue.entries.pop_front() {
            queue.last_scan = scan;
        }
    }
}

/// Port 60h/64h view of the [`KeyboardController`].
pub struct KeyboardPorts {
    controller: Arc<KeyboardController>,
}

impl KeyboardPorts {
    pub fn new(controller: Arc<KeyboardController>) -> Self {
        Self { controller }
    }
}

impl PortIoDevice for KeyboardPorts {
    fn read(&mut self, port: u16, _size: u8) -> u32 {
        match port {
            KEYBOARD_DATA_PORT => u32::from(self.controller.current_scan().0),
            KEYBOARD_STATUS_PORT => u32::from(self.controller.queued() > 0),
            _ => 0xFF,
        }
    }

    fn write(&mut self, port: u16, _size: u8, value: u32) {
        tracing::debug!(
            port = format_args!("{port:#x}"),
            value = format_args!("{value:#x}"),
            "keyboard controller command ignored"
        );
    }
}
