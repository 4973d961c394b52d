use dosvm_cpu::CpuContext;

/// Work attached to an event.
///
/// Callback-only events receive the live guest context when they are delivered. IRQ events run
/// their callback when the IRQ is acknowledged, at which point there is no context to hand out.
pub type EventCallback = Box<dyn FnOnce(Option<&mut CpuContext>) + Send>;

// Lower values are more urgent.
pub const PRIORITY_REALTIME: i32 = 0;
pub const PRIORITY_KEYBOARD: i32 = 1;
pub const PRIORITY_VGA: i32 = 2;
pub const PRIORITY_MOUSE: i32 = 3;
pub const PRIORITY_SERIAL: i32 = 4;

pub struct PendingEvent {
    pub irq: Option<u8>,
    pub priority: i32,
    pub(crate) callback: Option<EventCallback>,
}

impl PendingEvent {
    pub fn new(irq: Option<u8>, priority: i32, callback: Option<EventCallback>) -> Self {
        Self {
            irq,
            priority,
            callback,
        }
    }

    pub(crate) fn run_callback(&mut self, ctx: Option<&mut CpuContext>) {
        if let Some(callback) = self.callback.take() {
            callback(ctx);
        }
    }
}

impl std::fmt::Debug for PendingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingEvent")
            .field("irq", &self.irq)
            .field("priority", &self.priority)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Real-mode interrupt vector for a PIC input: master IRQs map to 08h–0Fh, slave IRQs to 70h–77h.
pub const fn irq_vector(irq: u8) -> u8 {
    if irq < 8 {
        8 + irq
    } else {
        0x70 + (irq - 8)
    }
}
