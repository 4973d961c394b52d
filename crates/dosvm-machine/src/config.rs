use std::time::Duration;

use dosvm_memory::GUEST_MEMORY_SIZE;
use dosvm_vga::VgaConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Size of the guest arena in bytes.
    pub memory_size: usize,
    /// Longest a single blocking wait sleeps before re-checking the scheduler.
    pub wait_timeout: Duration,
    pub vga: VgaConfig,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            memory_size: GUEST_MEMORY_SIZE,
            wait_timeout: Duration::from_millis(50),
            vga: VgaConfig::default(),
        }
    }
}
