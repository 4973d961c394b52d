//! BIOS-visible machine state: the BIOS data area, the interrupt vector table with its builtin
//! stubs, and the keyboard path from host scan codes to the BDA ring buffer.

pub mod bda;
pub mod ivt;
mod keyboard;
mod scancode;

pub use keyboard::{
    KeyboardBuffer, KeyboardController, KeyboardPorts, KEYBOARD_DATA_PORT, KEYBOARD_QUEUE_LEN,
    KEYBOARD_STATUS_PORT,
};
pub use scancode::{ShiftFlags, ShiftKey};
