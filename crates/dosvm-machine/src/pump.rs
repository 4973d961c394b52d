//! Host integration: blocking waits on the VM thread and the host-side event loop.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{never, select, tick, Receiver};
use dosvm_bios::ivt::{BIOS_SEGMENT, RETURN_STUB_OFFSET};
use dosvm_bios::KeyboardController;
use dosvm_cpu::{CpuContext, EFlags};
use dosvm_interrupts::{EventScheduler, SchedulerError, PRIORITY_REALTIME};

use crate::{VirtualMachineInstance, VmError};

const TIMER_IRQ: u8 = 0;

/// Input from the host side of the VM.
pub enum HostEvent {
    /// A key press or release as a PC scan code plus its translated ASCII value.
    Key { scan: u8, ascii: u8 },
    /// One PIT period elapsed.
    TimerTick,
    /// Work that must run on the thread consuming host events.
    Run(Box<dyn FnOnce() + Send>),
    Quit,
}

impl fmt::Debug for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key { scan, ascii } => f
                .debug_struct("Key")
                .field("scan", scan)
                .field("ascii", ascii)
                .finish(),
            Self::TimerTick => f.write_str("TimerTick"),
            Self::Run(_) => f.write_str("Run(..)"),
            Self::Quit => f.write_str("Quit"),
        }
    }
}

/// Why [`VirtualMachineInstance::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Queued events were delivered into the guest.
    Delivered,
    /// One host event was processed.
    HostEvent,
    /// The scheduler signalled new work, but none was eligible by the time it was checked.
    Notified,
    /// The caller's extra channel became ready.
    Extra,
    TimedOut,
}

fn queue_timer_irq(scheduler: &EventScheduler) -> Result<(), SchedulerError> {
    scheduler.queue_event(Some(TIMER_IRQ), PRIORITY_REALTIME, None)
}

impl VirtualMachineInstance {
    /// Blocks until something happens: pending events are delivered, a host event arrives, or
    /// the configured timeout passes.
    pub fn wait(&mut self, ctx: &CpuContext) -> Result<WaitOutcome, VmError> {
        self.wait_with(ctx, None)
    }

    /// Like [`wait`](Self::wait), additionally returning once a message arrives on `extra`.
    /// That message is consumed.
    pub fn wait_with(
        &mut self,
        ctx: &CpuContext,
        extra: Option<&Receiver<()>>,
    ) -> Result<WaitOutcome, VmError> {
        if self.scheduler.has_eligible() {
            self.run_pending_events(ctx)?;
            return Ok(WaitOutcome::Delivered);
        }

        let input = self.host_input.clone().unwrap_or_else(never);
        let notifier = self.scheduler.notifier();
        let extra = extra.cloned().unwrap_or_else(never);
        let timeout = self.config.wait_timeout;

        select! {
            recv(input) -> event => match event {
                Ok(event) => {
                    self.process_host_event(event)?;
                    Ok(WaitOutcome::HostEvent)
                }
                Err(_) => {
                    tracing::debug!("host input closed, stopping the VM");
                    self.host_input = None;
                    self.exit_status.get_or_insert(0);
                    Ok(WaitOutcome::HostEvent)
                }
            },
            recv(notifier) -> _ => {
                if self.scheduler.has_eligible() {
                    self.run_pending_events(ctx)?;
                    Ok(WaitOutcome::Delivered)
                } else {
                    Ok(WaitOutcome::Notified)
                }
            },
            recv(extra) -> _ => Ok(WaitOutcome::Extra),
            default(timeout) => Ok(WaitOutcome::TimedOut),
        }
    }

    /// Delivers eligible events from inside a host wait.
    ///
    /// Delivery happens on a copy of `ctx` parked at the host-return stub with interrupts
    /// enabled. If an event was redirected to a guest handler, the copy runs until that handler
    /// returns to the stub.
    fn run_pending_events(&mut self, ctx: &CpuContext) -> Result<(), VmError> {
        let mut nested = ctx.clone();
        nested.set_flag(EFlags::VIF, true);
        nested.cs = BIOS_SEGMENT;
        nested.set_ip(RETURN_STUB_OFFSET);

        self.deliver_pending(&mut nested)?;
        if (nested.cs, nested.ip()) != (BIOS_SEGMENT, RETURN_STUB_OFFSET) {
            self.enter(&mut nested)?;
        }
        Ok(())
    }

    /// Applies one host event on the VM thread.
    pub fn process_host_event(&mut self, event: HostEvent) -> Result<(), VmError> {
        tracing::trace!(?event, "host event");
        match event {
            HostEvent::Key { scan, ascii } => {
                self.keyboard.send_scan(scan, ascii)?;
            }
            HostEvent::TimerTick => queue_timer_irq(&self.scheduler)?,
            HostEvent::Run(work) => work(),
            HostEvent::Quit => {
                tracing::debug!("host requested quit");
                self.exit_status.get_or_insert(0);
            }
        }
        Ok(())
    }

    /// Takes the next keystroke from the BIOS ring.
    ///
    /// With `wait`, blocks through [`wait`](Self::wait) until a key arrives or the VM is asked
    /// to stop. Without it, returns `None` immediately when the ring is empty.
    pub fn consume_key(
        &mut self,
        ctx: &CpuContext,
        wait: bool,
    ) -> Result<Option<(u8, u8)>, VmError> {
        loop {
            if let Some(key) = self.keyboard_buffer.consume() {
                return Ok(Some(key));
            }
            if !wait || self.exit_status.is_some() {
                return Ok(None);
            }
            self.wait(ctx)?;
        }
    }
}

/// How [`HostLoop::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The host asked to quit or closed its input.
    Quit,
    VmExited,
}

/// Host-thread pump for a VM running on another thread.
///
/// Feeds host input and an optional PIT tick into the scheduler; the VM thread picks the events
/// up on its next trap or wait.
pub struct HostLoop {
    scheduler: Arc<EventScheduler>,
    keyboard: Arc<KeyboardController>,
    input: Receiver<HostEvent>,
    timer: Option<Receiver<Instant>>,
}

impl HostLoop {
    pub fn new(vm: &VirtualMachineInstance, input: Receiver<HostEvent>) -> Self {
        Self {
            scheduler: Arc::clone(vm.scheduler()),
            keyboard: Arc::clone(vm.keyboard()),
            input,
            timer: None,
        }
    }

    /// Raises IRQ0 every `period`.
    pub fn with_timer(mut self, period: Duration) -> Self {
        self.timer = Some(tick(period));
        self
    }

    /// Runs until the host quits or `vm_done` fires (or disconnects).
    pub fn run(&self, vm_done: &Receiver<()>) -> Result<LoopExit, SchedulerError> {
        let timer = self.timer.clone().unwrap_or_else(never);
        loop {
            select! {
                recv(self.input) -> event => match event {
                    Ok(HostEvent::Key { scan, ascii }) => {
                        self.keyboard.send_scan(scan, ascii)?;
                    }
                    Ok(HostEvent::TimerTick) => queue_timer_irq(&self.scheduler)?,
                    Ok(HostEvent::Run(work)) => work(),
                    Ok(HostEvent::Quit) | Err(_) => {
                        tracing::debug!("host loop quitting");
                        return Ok(LoopExit::Quit);
                    }
                },
                recv(timer) -> _ => queue_timer_irq(&self.scheduler)?,
                recv(vm_done) -> _ => return Ok(LoopExit::VmExited),
            }
        }
    }
}
