use std::convert::Infallible;
use std::sync::Arc;

use dosvm_cpu::{CpuContext, EFlags};
use dosvm_interrupts::{
    EventScheduler, InterruptDispatch, PIC_COMMAND_PORT, PIC_EOI, PRIORITY_KEYBOARD,
    PRIORITY_REALTIME,
};
use parking_lot::Mutex;
use proptest::prelude::*;

/// Records vectors without acknowledging them, like a guest handler that has not sent EOI yet.
#[derive(Default)]
struct Recorder {
    vectors: Vec<u8>,
}

impl InterruptDispatch for Recorder {
    type Error = Infallible;

    fn dispatch_interrupt(&mut self, vector: u8, _ctx: &mut CpuContext) -> Result<(), Infallible> {
        self.vectors.push(vector);
        Ok(())
    }
}

/// Acknowledges every IRQ as soon as it is dispatched.
struct Acker<'a> {
    scheduler: &'a EventScheduler,
}

impl InterruptDispatch for Acker<'_> {
    type Error = Infallible;

    fn dispatch_interrupt(&mut self, _vector: u8, _ctx: &mut CpuContext) -> Result<(), Infallible> {
        self.scheduler.acknowledge_eoi();
        Ok(())
    }
}

fn record_into(log: &Arc<Mutex<Vec<usize>>>, id: usize) -> dosvm_interrupts::EventCallback {
    let log = log.clone();
    Box::new(move |_ctx: Option<&mut CpuContext>| log.lock().push(id))
}

#[test]
fn higher_priority_preempts_and_eoi_is_lifo() {
    let scheduler = EventScheduler::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut ctx = CpuContext::default();
    let mut recorder = Recorder::default();

    scheduler
        .queue_event(Some(1), PRIORITY_KEYBOARD, Some(record_into(&log, 1)))
        .unwrap();
    scheduler.deliver_pending(&mut ctx, &mut recorder).unwrap();
    assert_eq!(scheduler.in_service(), vec![Some(1)]);

    scheduler
        .queue_event(Some(0), PRIORITY_REALTIME, Some(record_into(&log, 0)))
        .unwrap();
    assert!(scheduler.pending_flag());
    scheduler.deliver_pending(&mut ctx, &mut recorder).unwrap();
    assert_eq!(recorder.vectors, vec![0x09, 0x08]);
    assert_eq!(scheduler.in_service(), vec![Some(1), Some(0)]);

    scheduler.pic_port_write(PIC_COMMAND_PORT, PIC_EOI);
    assert_eq!(*log.lock(), vec![0]);
    scheduler.pic_port_write(PIC_COMMAND_PORT, PIC_EOI);
    assert_eq!(*log.lock(), vec![0, 1]);
    assert!(scheduler.in_service().is_empty());
}

#[test]
fn equal_priority_waits_for_eoi_and_then_raises_pending_flag() {
    let scheduler = EventScheduler::new();
    let mut ctx = CpuContext::default();
    let mut recorder = Recorder::default();

    scheduler.queue_event(Some(1), PRIORITY_KEYBOARD, None).unwrap();
    scheduler.deliver_pending(&mut ctx, &mut recorder).unwrap();
    assert!(!scheduler.pending_flag());

    scheduler.queue_event(Some(1), PRIORITY_KEYBOARD, None).unwrap();
    assert!(!scheduler.has_eligible());
    assert!(!scheduler.pending_flag());

    scheduler.acknowledge_eoi();
    assert!(scheduler.pending_flag());

    ctx.eflags.insert(EFlags::VIP);
    scheduler.deliver_pending(&mut ctx, &mut recorder).unwrap();
    assert_eq!(recorder.vectors, vec![0x09, 0x09]);
    assert!(!ctx.vip());
    assert!(!scheduler.pending_flag());
}

#[test]
fn callback_events_see_the_live_context() {
    let scheduler = EventScheduler::new();
    let mut ctx = CpuContext::default();
    scheduler
        .queue_event(
            None,
            PRIORITY_REALTIME,
            Some(Box::new(|ctx: Option<&mut CpuContext>| {
                if let Some(ctx) = ctx {
                    ctx.set_ax(0x1234);
                }
            })),
        )
        .unwrap();

    scheduler
        .deliver_pending(&mut ctx, &mut Recorder::default())
        .unwrap();
    assert_eq!(ctx.ax(), 0x1234);
    assert_eq!(scheduler.pending_len(), 0);
    assert!(scheduler.in_service().is_empty());
}

proptest! {
    #[test]
    fn delivery_order_is_priority_then_arrival(priorities in proptest::collection::vec(0i32..5, 1..32)) {
        let scheduler = EventScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for (id, &priority) in priorities.iter().enumerate() {
            let irq = if id % 3 == 0 { None } else { Some((id % 16) as u8) };
            scheduler.queue_event(irq, priority, Some(record_into(&log, id))).unwrap();
        }

        let mut ctx = CpuContext::default();
        scheduler.deliver_pending(&mut ctx, &mut Acker { scheduler: &scheduler }).unwrap();

        let mut expected: Vec<usize> = (0..priorities.len()).collect();
        expected.sort_by_key(|&id| priorities[id]);
        prop_assert_eq!(log.lock().clone(), expected);
        prop_assert!(scheduler.in_service().is_empty());
    }
}
