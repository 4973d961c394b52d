//! Real-mode CPU state and the seam to the host execution primitive.

mod context;
pub mod io;
mod trap;

pub use context::{CpuContext, EFlags};
pub use io::{IoPortBus, PortIoDevice};
pub use trap::{HostCpuError, RealModeCpu, VmTrap};
