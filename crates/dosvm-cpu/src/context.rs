use bitflags::bitflags;
use dosvm_memory::{linear, GuestMemory};

bitflags! {
    /// EFLAGS as seen by a virtual-8086 guest, including the virtual interrupt bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EFlags: u32 {
        const CF = 1 << 0;
        const PF = 1 << 2;
        const AF = 1 << 4;
        const ZF = 1 << 6;
        const SF = 1 << 7;
        const TF = 1 << 8;
        const IF = 1 << 9;
        const DF = 1 << 10;
        const OF = 1 << 11;
        /// Virtual interrupt flag: the guest's view of IF.
        const VIF = 1 << 19;
        /// Virtual interrupt pending: set when the monitor has work to deliver.
        const VIP = 1 << 20;

        const _ = !0;
    }
}

/// Register snapshot of one real-mode guest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuContext {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
    pub esi: u32,
    pub edi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub eip: u32,
    pub cs: u16,
    pub ds: u16,
    pub es: u16,
    pub ss: u16,
    pub fs: u16,
    pub gs: u16,
    pub eflags: EFlags,
}

macro_rules! gpr16 {
    ($reg:ident, $x:ident, $set_x:ident, $h:ident, $set_h:ident, $l:ident, $set_l:ident) => {
        pub fn $x(&self) -> u16 {
            self.$reg as u16
        }

        pub fn $set_x(&mut self, value: u16) {
            self.$reg = (self.$reg & 0xFFFF_0000) | u32::from(value);
        }

        pub fn $h(&self) -> u8 {
            (self.$reg >> 8) as u8
        }

        pub fn $set_h(&mut self, value: u8) {
            self.$reg = (self.$reg & !0xFF00) | (u32::from(value) << 8);
        }

        pub fn $l(&self) -> u8 {
            self.$reg as u8
        }

        pub fn $set_l(&mut self, value: u8) {
            self.$reg = (self.$reg & !0xFF) | u32::from(value);
        }
    };
}

impl CpuContext {
    gpr16!(eax, ax, set_ax, ah, set_ah, al, set_al);
    gpr16!(ebx, bx, set_bx, bh, set_bh, bl, set_bl);
    gpr16!(ecx, cx, set_cx, ch, set_ch, cl, set_cl);
    gpr16!(edx, dx, set_dx, dh, set_dh, dl, set_dl);

    pub fn si(&self) -> u16 {
        self.esi as u16
    }

    pub fn di(&self) -> u16 {
        self.edi as u16
    }

    pub fn bp(&self) -> u16 {
        self.ebp as u16
    }

    pub fn sp(&self) -> u16 {
        self.esp as u16
    }

    pub fn set_sp(&mut self, value: u16) {
        self.esp = (self.esp & 0xFFFF_0000) | u32::from(value);
    }

    pub fn ip(&self) -> u16 {
        self.eip as u16
    }

    pub fn set_ip(&mut self, value: u16) {
        self.eip = u32::from(value);
    }

    /// Linear address of `CS:IP`.
    pub fn code_address(&self) -> u32 {
        linear(self.cs, self.ip())
    }

    /// Linear address of `SS:SP`.
    pub fn stack_address(&self) -> u32 {
        linear(self.ss, self.sp())
    }

    pub fn flags16(&self) -> u16 {
        self.eflags.bits() as u16
    }

    /// Replaces the low 16 bits of EFLAGS, keeping VIF/VIP and the other high bits.
    pub fn set_flags16(&mut self, value: u16) {
        let high = self.eflags.bits() & 0xFFFF_0000;
        self.eflags = EFlags::from_bits_retain(high | u32::from(value));
    }

    pub fn vif(&self) -> bool {
        self.eflags.contains(EFlags::VIF)
    }

    pub fn vip(&self) -> bool {
        self.eflags.contains(EFlags::VIP)
    }

    pub fn set_flag(&mut self, flag: EFlags, on: bool) {
        self.eflags.set(flag, on);
    }

    /// The 16-bit FLAGS image pushed into an interrupt frame: IF reflects the virtual IF.
    pub fn frame_flags(&self) -> u16 {
        let mut flags = EFlags::from_bits_retain(u32::from(self.flags16()));
        flags.set(EFlags::IF, self.vif());
        flags.bits() as u16
    }

    pub fn push16(&mut self, memory: &GuestMemory, value: u16) {
        let sp = self.sp().wrapping_sub(2);
        self.set_sp(sp);
        memory.write_u16(linear(self.ss, sp), value);
    }

    pub fn pop16(&mut self, memory: &GuestMemory) -> u16 {
        let sp = self.sp();
        let value = memory.read_u16(linear(self.ss, sp));
        self.set_sp(sp.wrapping_add(2));
        value
    }

    /// Pushes a real-mode interrupt frame (FLAGS, CS, IP) and jumps to `target`.
    pub fn push_interrupt_frame(&mut self, memory: &GuestMemory, target: (u16, u16)) {
        let flags = self.frame_flags();
        self.push16(memory, flags);
        self.push16(memory, self.cs);
        self.push16(memory, self.ip());
        self.cs = target.0;
        self.set_ip(target.1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_halves_alias_the_word_register() {
        let mut ctx = CpuContext {
            eax: 0xAABB_0000,
            ..Default::default()
        };
        ctx.set_ah(0x1E);
        ctx.set_al(0x41);
        assert_eq!(ctx.ax(), 0x1E41);
        assert_eq!(ctx.eax, 0xAABB_1E41);
    }

    #[test]
    fn set_flags16_keeps_virtual_bits() {
        let mut ctx = CpuContext::default();
        ctx.eflags = EFlags::VIF | EFlags::VIP | EFlags::ZF;
        ctx.set_flags16(0x0001);
        assert_eq!(ctx.eflags, EFlags::VIF | EFlags::VIP | EFlags::CF);
    }

    #[test]
    fn interrupt_frame_mirrors_vif_into_if() {
        let memory = GuestMemory::new(0x1_0000);
        let mut ctx = CpuContext {
            cs: 0x1234,
            eip: 0x0010,
            ss: 0x0000,
            esp: 0x8000,
            eflags: EFlags::VIF,
            ..Default::default()
        };
        ctx.push_interrupt_frame(&memory, (0x2000, 0x0040));

        assert_eq!((ctx.cs, ctx.ip()), (0x2000, 0x0040));
        assert_eq!(ctx.sp(), 0x7FFA);
        assert_eq!(memory.read_u16(0x7FFA), 0x0010);
        assert_eq!(memory.read_u16(0x7FFC), 0x1234);
        assert_eq!(memory.read_u16(0x7FFE), EFlags::IF.bits() as u16);
    }
}
