use std::collections::{TryReserveError, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};
use dosvm_cpu::{CpuContext, EFlags};
use parking_lot::Mutex;

use crate::event::{irq_vector, EventCallback, PendingEvent};
use crate::pic::{PIC_COMMAND_PORT, PIC_EOI};
use crate::WakeSignal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("cannot allocate event: {0}")]
    OutOfMemory(#[from] TryReserveError),
}

/// Receives IRQs the scheduler decides to deliver into the guest.
pub trait InterruptDispatch {
    type Error;

    fn dispatch_interrupt(&mut self, vector: u8, ctx: &mut CpuContext) -> Result<(), Self::Error>;
}

#[derive(Default)]
struct SchedulerState {
    /// Sorted by priority, FIFO among equal priorities.
    pending: VecDeque<PendingEvent>,
    /// IRQs dispatched and not yet acknowledged; the last entry is the active one.
    in_service: Vec<PendingEvent>,
}

impl SchedulerState {
    fn has_eligible(&self) -> bool {
        match (self.pending.front(), self.in_service.last()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(next), Some(current)) => next.priority < current.priority,
        }
    }
}

enum Delivery {
    Irq { irq: u8, priority: i32 },
    Callback(PendingEvent),
}

pub struct EventScheduler {
    state: Mutex<SchedulerState>,
    pending_flag: AtomicBool,
    wake: WakeSignal,
    notify_tx: Sender<()>,
    notify_rx: Receiver<()>,
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventScheduler {
    pub fn new() -> Self {
        let (notify_tx, notify_rx) = crossbeam_channel::bounded(1);
        Self {
            state: Mutex::new(SchedulerState::default()),
            pending_flag: AtomicBool::new(false),
            wake: WakeSignal::default(),
            notify_tx,
            notify_rx,
        }
    }

    /// Queues an event. `irq: None` events carry only a callback and are run inline on delivery.
    ///
    /// Callable from any thread.
    pub fn queue_event(
        &self,
        irq: Option<u8>,
        priority: i32,
        callback: Option<EventCallback>,
    ) -> Result<(), SchedulerError> {
        let eligible = {
            let mut state = self.state.lock();
            if let Err(err) = state.pending.try_reserve(1) {
                tracing::error!(?irq, priority, %err, "dropping event");
                return Err(err.into());
            }
            let idx = state.pending.partition_point(|e| e.priority <= priority);
            state
                .pending
                .insert(idx, PendingEvent::new(irq, priority, callback));
            state.has_eligible()
        };

        tracing::trace!(?irq, priority, eligible, "queued event");
        if eligible {
            self.pending_flag.store(true, Ordering::Release);
            self.wake.raise();
            self.notify();
        }
        Ok(())
    }

    /// Delivers every eligible pending event into `ctx`.
    ///
    /// The scheduler lock is released before each dispatch so handlers may queue events or
    /// acknowledge IRQs.
    pub fn deliver_pending<D>(&self, ctx: &mut CpuContext, dispatcher: &mut D) -> Result<(), D::Error>
    where
        D: InterruptDispatch + ?Sized,
    {
        loop {
            let delivery = {
                let mut state = self.state.lock();
                if !state.has_eligible() {
                    ctx.eflags.remove(EFlags::VIP);
                    self.pending_flag.store(false, Ordering::Release);
                    return Ok(());
                }
                let Some(event) = state.pending.pop_front() else {
                    return Ok(());
                };
                match event.irq {
                    Some(irq) => {
                        let priority = event.priority;
                        state.in_service.push(event);
                        Delivery::Irq { irq, priority }
                    }
                    None => Delivery::Callback(event),
                }
            };

            match delivery {
                Delivery::Irq { irq, priority } => {
                    let vector = irq_vector(irq);
                    tracing::trace!(irq, priority, vector = format_args!("{vector:#04x}"), "dispatching IRQ");
                    dispatcher.dispatch_interrupt(vector, ctx)?;
                }
                Delivery::Callback(mut event) => {
                    tracing::trace!(priority = event.priority, "running event callback");
                    event.run_callback(Some(&mut *ctx));
                }
            }
        }
    }

    /// End of interrupt: retires the most recently dispatched IRQ and runs its completion callback.
    pub fn acknowledge_eoi(&self) {
        let (event, eligible) = {
            let mut state = self.state.lock();
            let event = state.in_service.pop();
            (event, state.has_eligible())
        };

        match event {
            Some(mut event) => {
                tracing::trace!(irq = ?event.irq, "EOI");
                event.run_callback(None);
            }
            None => tracing::warn!("EOI without active IRQ"),
        }

        if eligible {
            tracing::trace!("new event pending after EOI");
            self.pending_flag.store(true, Ordering::Release);
            self.notify();
        }
    }

    /// Handles a guest write to the PIC command/data ports.
    pub fn pic_port_write(&self, port: u16, value: u8) {
        if port == PIC_COMMAND_PORT && value == PIC_EOI {
            self.acknowledge_eoi();
        } else {
            tracing::warn!(
                port = format_args!("{port:#x}"),
                value = format_args!("{value:#04x}"),
                "unimplemented PIC command"
            );
        }
    }

    pub fn has_eligible(&self) -> bool {
        self.state.lock().has_eligible()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// IRQ numbers currently in service, oldest first.
    pub fn in_service(&self) -> Vec<Option<u8>> {
        self.state.lock().in_service.iter().map(|e| e.irq).collect()
    }

    /// Whether the monitor should set VIP on the next guest entry.
    pub fn pending_flag(&self) -> bool {
        self.pending_flag.load(Ordering::Acquire)
    }

    pub fn wake(&self) -> &WakeSignal {
        &self.wake
    }

    /// Channel signalled whenever new eligible work appears.
    pub fn notifier(&self) -> Receiver<()> {
        self.notify_rx.clone()
    }

    fn notify(&self) {
        // A full channel already carries an unconsumed notification.
        let _ = self.notify_tx.try_send(());
    }
}
