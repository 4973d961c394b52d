use dosvm_memory::GuestMemory;

use crate::CpuContext;

/// Why the host execution primitive handed control back to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmTrap {
    /// The guest executed `INT vector`; `CS:IP` already points past the instruction.
    SoftwareInterrupt(u8),
    /// The guest set its virtual IF while a virtual interrupt was pending (STI/POPF/IRET with VIP).
    InterruptsEnabled,
    /// `IN` from a port. The result is written back into AL/AX/EAX by the monitor.
    PortIn { port: u16, size: u8 },
    /// `OUT` to a port.
    PortOut { port: u16, size: u8, value: u32 },
    /// Anything else (invalid opcode, general protection, ...). Not recoverable.
    Fault { vector: u8, error_code: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostCpuError {
    #[error("host rejected VM entry: {0}")]
    EntryRejected(String),
}

/// The host's raw real-mode execution primitive.
///
/// `run` executes guest code starting from `ctx` until the next trap, updating `ctx` in place.
pub trait RealModeCpu: Send {
    fn run(&mut self, ctx: &mut CpuContext, memory: &GuestMemory) -> Result<VmTrap, HostCpuError>;
}

impl CpuContext {
    /// Stores the result of an `IN` instruction of the given width.
    pub fn set_port_result(&mut self, size: u8, value: u32) {
        match size {
            1 => self.set_al(value as u8),
            2 => self.set_ax(value as u16),
            _ => self.eax = value,
        }
    }
}
