//! A DOS virtual machine monitor.
//!
//! Guest code runs through a host-provided [`RealModeCpu`](cpu::RealModeCpu); this crate supplies
//! everything around it: the interrupt vector table and BIOS data area, a virtual PIC with an
//! event scheduler, the keyboard path, a VGA/CGA adapter and the host event pump.
//!
//! ```ignore
//! let mut vm = VirtualMachineInstance::new(
//!     VmConfig::default(),
//!     Box::new(cpu),
//!     Box::new(BufferConsole::new(80, 25)),
//!     Box::new(MemoryDisplay::new()),
//! );
//! vm.set_host_input(host_events);
//! vm.enter(&mut ctx)?;
//! ```

pub use dosvm_bios as bios;
pub use dosvm_cpu as cpu;
pub use dosvm_interrupts as interrupts;
pub use dosvm_memory as memory;
pub use dosvm_vga as vga;

pub use dosvm_machine::{
    lookup, BuiltinInterrupt, HostEvent, HostLoop, LoopExit, VirtualMachineInstance, VmConfig,
    VmError, WaitOutcome,
};
