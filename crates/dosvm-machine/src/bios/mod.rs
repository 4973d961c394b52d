//! Builtin BIOS interrupt handlers.

mod int10;
mod int16;
mod irq;
mod system;
