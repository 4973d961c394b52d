//! Guest entry and trap routing.

use std::sync::Arc;

use dosvm_bios::ivt::{self, BIOS_SEGMENT, RETURN_STUB_OFFSET};
use dosvm_cpu::{CpuContext, EFlags, VmTrap};
use dosvm_interrupts::InterruptDispatch;
use dosvm_memory::linear;
use dosvm_vga::is_vga_port;

use crate::{VirtualMachineInstance, VmError};

const RETURN_MASK: u16 = (EFlags::CF.bits()
    | EFlags::PF.bits()
    | EFlags::AF.bits()
    | EFlags::ZF.bits()
    | EFlags::SF.bits()
    | EFlags::DF.bits()
    | EFlags::OF.bits()) as u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Return,
}

impl VirtualMachineInstance {
    /// Runs guest code from `ctx` until it returns through the host-return stub, the program
    /// terminates, or a fatal trap occurs.
    ///
    /// Reentrant: builtin handlers call back into real mode through nested `enter`s.
    pub fn enter(&mut self, ctx: &mut CpuContext) -> Result<(), VmError> {
        let previous = self.current.replace(ctx.clone());
        self.depth += 1;
        tracing::trace!(
            depth = self.depth,
            cs = format_args!("{:#06x}", ctx.cs),
            ip = format_args!("{:#06x}", ctx.ip()),
            "entering real mode"
        );

        let result = self.run_guest(ctx);

        self.depth -= 1;
        self.current = previous;
        result
    }

    fn run_guest(&mut self, ctx: &mut CpuContext) -> Result<(), VmError> {
        loop {
            if self.exit_status.is_some() {
                return Ok(());
            }

            self.scheduler.wake().acknowledge();
            if self.scheduler.pending_flag() {
                ctx.set_flag(EFlags::VIP, true);
            }
            if ctx.vif() && ctx.vip() {
                self.deliver_pending(ctx)?;
                continue;
            }

            let trap = self.cpu.run(ctx, &self.memory)?;
            self.current = Some(ctx.clone());
            if self.handle_trap(ctx, trap)? == Flow::Return {
                return Ok(());
            }
        }
    }

    fn handle_trap(&mut self, ctx: &mut CpuContext, trap: VmTrap) -> Result<Flow, VmError> {
        match trap {
            VmTrap::SoftwareInterrupt(vector) => {
                if ivt::is_return_stub(ctx.cs, ctx.ip()) {
                    return Ok(Flow::Return);
                }
                if ctx.cs == BIOS_SEGMENT {
                    self.builtin_stub(ctx, vector)?;
                } else {
                    self.hardware_interrupt_rm(ctx, vector)?;
                }
            }
            VmTrap::InterruptsEnabled => self.deliver_pending(ctx)?,
            VmTrap::PortIn { port, size } => {
                let value = self.port_in(port, size);
                ctx.set_port_result(size, value);
            }
            VmTrap::PortOut { port, size, value } => self.port_out(port, size, value)?,
            VmTrap::Fault { vector, error_code } => {
                tracing::error!(
                    vector = format_args!("{vector:#04x}"),
                    error_code = format_args!("{error_code:#x}"),
                    cs = format_args!("{:#06x}", ctx.cs),
                    ip = format_args!("{:#06x}", ctx.ip()),
                    "unhandled trap in real mode"
                );
                return Err(VmError::UnhandledTrap {
                    vector,
                    error_code,
                    cs: ctx.cs,
                    ip: ctx.ip(),
                });
            }
        }
        Ok(Flow::Continue)
    }

    /// The guest branched into a builtin stub at `F000:vector*4`, usually by chaining from its
    /// own handler. The caller's flags live in the IRET frame on the stack.
    fn builtin_stub(&mut self, ctx: &mut CpuContext, vector: u8) -> Result<(), VmError> {
        let stub = ivt::stub_vector(ctx.ip());
        if stub != vector {
            tracing::warn!(
                vector = format_args!("{vector:#04x}"),
                stub = format_args!("{stub:#04x}"),
                "builtin stub reached through another vector"
            );
        }

        // Stack layout: [SS:SP] IP, [SS:SP+2] CS, [SS:SP+4] FLAGS.
        let flags_addr = linear(ctx.ss, ctx.sp().wrapping_add(4));
        let saved = self.memory.read_u16(flags_addr);
        ctx.set_flags16(saved);
        self.dispatch(vector, ctx)?;

        // Only the status flags travel back; IF and TF stay as the caller pushed them.
        let returned = ctx.flags16() & RETURN_MASK;
        self.memory
            .write_u16(flags_addr, (saved & !RETURN_MASK) | returned);
        Ok(())
    }

    /// Raises `vector` in real mode: builtin handlers run directly, hooked vectors get an
    /// interrupt frame and start executing with virtual interrupts disabled.
    pub fn hardware_interrupt_rm(&mut self, ctx: &mut CpuContext, vector: u8) -> Result<(), VmError> {
        if ivt::is_builtin(&self.memory, vector) {
            return self.dispatch(vector, ctx);
        }

        let target = ivt::get_vector(&self.memory, vector);
        tracing::trace!(
            vector = format_args!("{vector:#04x}"),
            handler = format_args!("{:04x}:{:04x}", target.0, target.1),
            "reflecting interrupt to guest handler"
        );
        ctx.push_interrupt_frame(&self.memory, target);
        ctx.set_flag(EFlags::VIF, false);
        ctx.set_flag(EFlags::TF, false);
        Ok(())
    }

    /// Calls the real-mode routine at `target` as an interrupt handler and runs it to completion.
    ///
    /// The routine's IRET lands on the host-return stub, which ends the nested `enter`.
    pub fn call_real_mode(&mut self, ctx: &mut CpuContext, target: (u16, u16)) -> Result<(), VmError> {
        let flags = ctx.frame_flags();
        ctx.push16(&self.memory, flags);
        ctx.push16(&self.memory, BIOS_SEGMENT);
        ctx.push16(&self.memory, RETURN_STUB_OFFSET);
        ctx.cs = target.0;
        ctx.set_ip(target.1);
        ctx.set_flag(EFlags::VIF, false);
        ctx.set_flag(EFlags::TF, false);
        self.enter(ctx)
    }

    /// Drains eligible scheduler events into `ctx`.
    pub fn deliver_pending(&mut self, ctx: &mut CpuContext) -> Result<(), VmError> {
        let scheduler = Arc::clone(&self.scheduler);
        scheduler.deliver_pending(ctx, self)
    }

    fn port_in(&mut self, port: u16, size: u8) -> u32 {
        if !is_vga_port(port) {
            return self.io.read(port, size);
        }
        (0..u16::from(size)).fold(0, |value, i| {
            value | u32::from(self.vga.port_read(port.wrapping_add(i))) << (8 * i)
        })
    }

    fn port_out(&mut self, port: u16, size: u8, value: u32) -> Result<(), VmError> {
        if !is_vga_port(port) {
            self.io.write(port, size, value);
            return Ok(());
        }
        // Wide writes hit consecutive registers, e.g. an index/data pair.
        for i in 0..u16::from(size) {
            self.vga
                .port_write(port.wrapping_add(i), (value >> (8 * i)) as u8)?;
        }
        Ok(())
    }
}

impl InterruptDispatch for VirtualMachineInstance {
    type Error = VmError;

    fn dispatch_interrupt(&mut self, vector: u8, ctx: &mut CpuContext) -> Result<(), VmError> {
        self.hardware_interrupt_rm(ctx, vector)
    }
}
