//! Interrupt vector table and the builtin handler stubs in the fake BIOS segment.
//!
//! Every vector initially points at `F000:vector*4`, which holds `INT vector; IRET; NOP`. A guest
//! that chains to the original handler therefore traps back into the monitor with `CS == F000`,
//! which is how builtin handlers are recognised.

use dosvm_memory::{linear, GuestMemory};

pub const IVT_BASE: u32 = 0;
pub const BIOS_SEGMENT: u16 = 0xF000;
pub const STUB_SIZE: u16 = 4;
/// Target of the frame pushed for nested real-mode calls. Executing it ends the nested run.
pub const RETURN_STUB_OFFSET: u16 = 0x0400;

const RETURN_STUB: [u8; 4] = [0xCD, 0xFF, 0x90, 0x90];

pub fn install_stubs(memory: &GuestMemory) {
    for vector in 0u16..=0xFF {
        let offset = vector * STUB_SIZE;
        let stub = [0xCD, vector as u8, 0xCF, 0x90];
        // The stubs live inside the arena for any supported memory size.
        if let Err(err) = memory.write_from(linear(BIOS_SEGMENT, offset), &stub) {
            tracing::error!(%err, "cannot install BIOS stubs");
            return;
        }
        set_vector(memory, vector as u8, BIOS_SEGMENT, offset);
    }
    if let Err(err) = memory.write_from(linear(BIOS_SEGMENT, RETURN_STUB_OFFSET), &RETURN_STUB) {
        tracing::error!(%err, "cannot install return stub");
    }
}

pub fn get_vector(memory: &GuestMemory, vector: u8) -> (u16, u16) {
    let addr = IVT_BASE + u32::from(vector) * 4;
    let offset = memory.read_u16(addr);
    let segment = memory.read_u16(addr + 2);
    (segment, offset)
}

pub fn set_vector(memory: &GuestMemory, vector: u8, segment: u16, offset: u16) {
    let addr = IVT_BASE + u32::from(vector) * 4;
    memory.write_u16(addr, offset);
    memory.write_u16(addr + 2, segment);
}

/// True while the guest has not hooked `vector` away from the builtin stub.
pub fn is_builtin(memory: &GuestMemory, vector: u8) -> bool {
    get_vector(memory, vector).0 == BIOS_SEGMENT
}

/// `CS:IP` right after the `INT` in the return stub.
pub fn is_return_stub(cs: u16, ip: u16) -> bool {
    cs == BIOS_SEGMENT && ip == RETURN_STUB_OFFSET + 2
}

/// The vector whose stub contains the `INT` instruction ending just before `ip`.
pub fn stub_vector(ip: u16) -> u8 {
    (ip.wrapping_sub(2) / STUB_SIZE) as u8
}
