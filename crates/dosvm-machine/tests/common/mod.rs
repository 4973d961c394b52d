#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use dosvm_cpu::{CpuContext, EFlags, HostCpuError, RealModeCpu, VmTrap};
use dosvm_machine::{VirtualMachineInstance, VmConfig};
use dosvm_memory::GuestMemory;
use dosvm_vga::{BufferConsole, MemoryDisplay, VgaConfig};

pub const GUEST_CS: u16 = 0x1000;
pub const GUEST_SS: u16 = 0x2000;

type Step = Box<dyn FnOnce(&mut CpuContext, &GuestMemory) -> VmTrap + Send>;

/// Stands in for the host's real-mode primitive: each `run` plays the next scripted step.
#[derive(Default)]
pub struct ScriptedCpu {
    steps: VecDeque<Step>,
}

impl ScriptedCpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(
        mut self,
        step: impl FnOnce(&mut CpuContext, &GuestMemory) -> VmTrap + Send + 'static,
    ) -> Self {
        self.steps.push_back(Box::new(step));
        self
    }
}

impl RealModeCpu for ScriptedCpu {
    fn run(&mut self, ctx: &mut CpuContext, memory: &GuestMemory) -> Result<VmTrap, HostCpuError> {
        match self.steps.pop_front() {
            Some(step) => Ok(step(ctx, memory)),
            None => Err(HostCpuError::EntryRejected("script exhausted".into())),
        }
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn config() -> VmConfig {
    VmConfig {
        wait_timeout: Duration::from_millis(10),
        vga: VgaConfig {
            graphics_refresh: Duration::from_secs(3600),
            text_refresh: Duration::from_secs(3600),
            ..VgaConfig::default()
        },
        ..VmConfig::default()
    }
}

pub fn machine(cpu: ScriptedCpu) -> VirtualMachineInstance {
    machine_with_console(cpu, BufferConsole::detached())
}

pub fn machine_with_console(cpu: ScriptedCpu, console: BufferConsole) -> VirtualMachineInstance {
    init_tracing();
    VirtualMachineInstance::new(
        config(),
        Box::new(cpu),
        Box::new(console),
        Box::new(MemoryDisplay::new()),
    )
}

/// A program at 1000:0100 with its stack in segment 2000h and interrupts enabled.
pub fn guest_context() -> CpuContext {
    let mut ctx = CpuContext {
        cs: GUEST_CS,
        ds: GUEST_CS,
        es: GUEST_CS,
        ss: GUEST_SS,
        eflags: EFlags::IF | EFlags::VIF | EFlags::from_bits_retain(0x2),
        ..CpuContext::default()
    };
    ctx.set_ip(0x0100);
    ctx.set_sp(0xFFF0);
    ctx
}

/// Executes a two-byte `INT vector` at CS:IP.
pub fn int(ctx: &mut CpuContext, vector: u8) -> VmTrap {
    ctx.set_ip(ctx.ip().wrapping_add(2));
    VmTrap::SoftwareInterrupt(vector)
}

/// Executes `IRET`.
pub fn iret(ctx: &mut CpuContext, memory: &GuestMemory) {
    let ip = ctx.pop16(memory);
    let cs = ctx.pop16(memory);
    let flags = ctx.pop16(memory);
    ctx.cs = cs;
    ctx.set_ip(ip);
    ctx.set_flags16(flags);
    ctx.set_flag(EFlags::VIF, flags & EFlags::IF.bits() as u16 != 0);
}

/// Returns from a guest interrupt handler: `IRET`, then the stub it lands on.
pub fn iret_to_host(ctx: &mut CpuContext, memory: &GuestMemory) -> VmTrap {
    iret(ctx, memory);
    let opcode = memory.read_u8(ctx.code_address() + 1);
    int(ctx, opcode)
}
