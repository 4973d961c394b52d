use dosvm_cpu::HostCpuError;
use dosvm_interrupts::SchedulerError;
use dosvm_memory::GuestMemoryError;
use dosvm_vga::VgaError;

#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error(transparent)]
    Cpu(#[from] HostCpuError),
    #[error("unhandled trap {vector:#04x} (error code {error_code:#x}) at {cs:04x}:{ip:04x}")]
    UnhandledTrap {
        vector: u8,
        error_code: u32,
        cs: u16,
        ip: u16,
    },
    #[error(transparent)]
    Vga(#[from] VgaError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Memory(#[from] GuestMemoryError),
}
