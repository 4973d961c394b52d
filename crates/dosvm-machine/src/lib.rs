//! The DOS virtual machine monitor.
//!
//! [`VirtualMachineInstance`] owns guest memory, the virtual PIC, the keyboard path and the VGA
//! adapter, and runs guest code through a host [`RealModeCpu`](dosvm_cpu::RealModeCpu). Traps
//! come back to [`VirtualMachineInstance::enter`], which routes software interrupts to the
//! builtin BIOS handlers or to guest hooks, delivers queued hardware interrupts and forwards port
//! I/O to the devices.

mod bios;
mod config;
mod dispatch;
mod entry;
mod error;
mod instance;
mod pump;

pub use config::VmConfig;
pub use dispatch::{lookup, BuiltinInterrupt};
pub use error::VmError;
pub use instance::VirtualMachineInstance;
pub use pump::{HostEvent, HostLoop, LoopExit, WaitOutcome};
