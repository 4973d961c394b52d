//! Virtual PIC and event scheduling for the DOS VM.
//!
//! Host-side sources (timer, keyboard, redraw) queue [`PendingEvent`]s on the
//! [`EventScheduler`]. The VM thread drains them into the guest when the guest's virtual IF
//! allows it; IRQ events stay in service until the guest (or a builtin handler) writes an EOI to
//! the PIC command port.

mod event;
mod pic;
mod scheduler;
mod wake;

pub use event::{
    irq_vector, EventCallback, PendingEvent, PRIORITY_KEYBOARD, PRIORITY_MOUSE, PRIORITY_REALTIME,
    PRIORITY_SERIAL, PRIORITY_VGA,
};
pub use pic::{PicPorts, PIC_COMMAND_PORT, PIC_DATA_PORT, PIC_EOI};
pub use scheduler::{EventScheduler, InterruptDispatch, SchedulerError};
pub use wake::WakeSignal;
