use std::convert::Infallible;
use std::sync::Arc;

use dosvm_bios::bda::{init_bda, KBD_READ_PTR, KBD_WRITE_PTR};
use dosvm_bios::{KeyboardBuffer, KeyboardController, KEYBOARD_QUEUE_LEN};
use dosvm_cpu::CpuContext;
use dosvm_interrupts::{EventScheduler, InterruptDispatch};
use dosvm_memory::{GuestMemory, GUEST_MEMORY_SIZE};

fn buffer() -> (GuestMemory, KeyboardBuffer) {
    let memory = GuestMemory::new(GUEST_MEMORY_SIZE);
    init_bda(&memory);
    let kbd = KeyboardBuffer::new(memory.clone());
    (memory, kbd)
}

#[test]
fn keystrokes_come_out_in_order() {
    let (_memory, kbd) = buffer();
    assert!(kbd.produce(0x1E, b'A'));
    assert!(kbd.produce(0x30, b'B'));

    assert_eq!(kbd.peek(), Some((0x1E, b'A')));
    assert_eq!(kbd.consume(), Some((0x1E, b'A')));
    assert_eq!(kbd.consume(), Some((0x30, b'B')));
    assert_eq!(kbd.consume(), None);
}

#[test]
fn full_ring_rejects_without_overwriting() {
    let (memory, kbd) = buffer();
    for i in 0..15u8 {
        assert!(kbd.produce(i + 1, b'a' + i), "slot {i} should be free");
    }
    let write = memory.read_u16(KBD_WRITE_PTR);
    assert!(!kbd.produce(0x7F, b'z'));
    assert_eq!(memory.read_u16(KBD_WRITE_PTR), write);

    assert_eq!(kbd.consume(), Some((1, b'a')));
    assert!(kbd.produce(0x7F, b'z'));
}

#[test]
fn pointers_wrap_around_the_buffer_end() {
    let (memory, kbd) = buffer();
    for round in 0..40u8 {
        assert!(kbd.produce(round, round ^ 0x55));
        assert_eq!(kbd.consume(), Some((round, round ^ 0x55)));
    }
    let read = memory.read_u16(KBD_READ_PTR);
    assert!((0x1E..0x3E).contains(&read));
    assert!(kbd.is_empty());
}

#[test]
fn corrupt_guest_pointers_restart_at_buffer_start() {
    let (memory, kbd) = buffer();
    memory.write_u16(KBD_WRITE_PTR, 0xFFFF);
    assert!(kbd.produce(0x1E, b'a'));
    assert_eq!(memory.read_u16(KBD_WRITE_PTR), 0x20);
    assert_eq!(kbd.consume(), Some((0x1E, b'a')));
    assert!(kbd.is_empty());

    // Odd and out-of-range pointers read as the start of the ring.
    memory.write_u16(KBD_READ_PTR, 0x21);
    memory.write_u16(KBD_WRITE_PTR, 0x0400);
    assert!(kbd.is_empty());
    assert!(kbd.produce(0x30, b'b'));
    assert_eq!(kbd.consume(), Some((0x30, b'b')));
}

struct Ack<'a>(&'a EventScheduler);

impl InterruptDispatch for Ack<'_> {
    type Error = Infallible;

    fn dispatch_interrupt(&mut self, vector: u8, _ctx: &mut CpuContext) -> Result<(), Infallible> {
        assert_eq!(vector, 0x09);
        self.0.acknowledge_eoi();
        Ok(())
    }
}

#[test]
fn scan_stays_visible_until_irq1_is_acknowledged() {
    let scheduler = Arc::new(EventScheduler::new());
    let controller = KeyboardController::new(scheduler.clone());

    assert!(controller.send_scan(0x1E, b'A').unwrap());
    assert!(controller.send_scan(0x9E, 0).unwrap());
    assert_eq!(controller.current_scan(), (0x1E, b'A'));
    assert_eq!(scheduler.pending_len(), 2);

    let mut ctx = CpuContext::default();
    scheduler.deliver_pending(&mut ctx, &mut Ack(&scheduler)).unwrap();
    assert_eq!(controller.queued(), 0);
    assert_eq!(controller.current_scan(), (0x9E, 0));
}

#[test]
fn scan_queue_overflow_is_reported() {
    let scheduler = Arc::new(EventScheduler::new());
    let controller = KeyboardController::new(scheduler);
    for _ in 0..KEYBOARD_QUEUE_LEN {
        assert!(controller.send_scan(0x1E, b'a').unwrap());
    }
    assert!(!controller.send_scan(0x1E, b'a').unwrap());
    assert_eq!(controller.queued(), KEYBOARD_QUEUE_LEN);
}
