use std::sync::Arc;

use crossbeam_channel::Receiver;
use dosvm_bios::{bda, ivt, KeyboardBuffer, KeyboardController, KeyboardPorts};
use dosvm_bios::{KEYBOARD_DATA_PORT, KEYBOARD_STATUS_PORT};
use dosvm_cpu::{CpuContext, IoPortBus, RealModeCpu};
use dosvm_interrupts::{EventScheduler, PicPorts, PIC_COMMAND_PORT};
use dosvm_memory::GuestMemory;
use dosvm_vga::{HostConsole, HostDisplay, VgaController};

use crate::pump::HostEvent;
use crate::VmConfig;

/// One DOS virtual machine. Owns guest memory and every device model.
pub struct VirtualMachineInstance {
    pub(crate) config: VmConfig,
    pub(crate) memory: GuestMemory,
    pub(crate) cpu: Box<dyn RealModeCpu>,
    pub(crate) scheduler: Arc<EventScheduler>,
    pub(crate) vga: Arc<VgaController>,
    pub(crate) keyboard: Arc<KeyboardController>,
    pub(crate) keyboard_buffer: KeyboardBuffer,
    pub(crate) io: IoPortBus,
    pub(crate) host_input: Option<Receiver<HostEvent>>,
    /// Context of the innermost running `enter`, as of its last trap.
    pub(crate) current: Option<CpuContext>,
    pub(crate) depth: usize,
    pub(crate) exit_status: Option<u8>,
}

impl VirtualMachineInstance {
    pub fn new(
        config: VmConfig,
        cpu: Box<dyn RealModeCpu>,
        console: Box<dyn HostConsole>,
        display: Box<dyn HostDisplay>,
    ) -> Self {
        let memory = GuestMemory::new(config.memory_size);
        bda::init_bda(&memory);
        ivt::install_stubs(&memory);

        let scheduler = Arc::new(EventScheduler::new());
        let vga = VgaController::new(memory.clone(), config.vga.clone(), console, display);
        let (cols, rows) = vga.init_alpha_mode();
        bda::set_video_mode(&memory, 0x03, cols, rows);

        let keyboard = KeyboardController::new(Arc::clone(&scheduler));
        let keyboard_buffer = KeyboardBuffer::new(memory.clone());

        let mut io = IoPortBus::new();
        io.register_range(
            PIC_COMMAND_PORT,
            2,
            Box::new(PicPorts::new(Arc::clone(&scheduler))),
        );
        io.register(
            KEYBOARD_DATA_PORT,
            Box::new(KeyboardPorts::new(Arc::clone(&keyboard))),
        );
        io.register(
            KEYBOARD_STATUS_PORT,
            Box::new(KeyboardPorts::new(Arc::clone(&keyboard))),
        );

        tracing::debug!(
            memory_size = config.memory_size,
            cols,
            rows,
            "virtual machine created"
        );
        Self {
            config,
            memory,
            cpu,
            scheduler,
            vga,
            keyboard,
            keyboard_buffer,
            io,
            host_input: None,
            current: None,
            depth: 0,
            exit_status: None,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn memory(&self) -> &GuestMemory {
        &self.memory
    }

    pub fn scheduler(&self) -> &Arc<EventScheduler> {
        &self.scheduler
    }

    pub fn vga(&self) -> &Arc<VgaController> {
        &self.vga
    }

    pub fn keyboard(&self) -> &Arc<KeyboardController> {
        &self.keyboard
    }

    pub fn keyboard_buffer(&self) -> &KeyboardBuffer {
        &self.keyboard_buffer
    }

    /// Port bus for PIC, keyboard and any extra devices. VGA ports never reach it.
    pub fn io_bus_mut(&mut self) -> &mut IoPortBus {
        &mut self.io
    }

    /// Host events consumed while the VM blocks in [`wait`](Self::wait).
    pub fn set_host_input(&mut self, input: Receiver<HostEvent>) {
        self.host_input = Some(input);
    }

    pub fn current_context(&self) -> Option<&CpuContext> {
        self.current.as_ref()
    }

    /// Nesting level of `enter`; zero when no guest code is running.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Set once the program terminated (INT 20h) or the host asked the VM to quit.
    pub fn exit_status(&self) -> Option<u8> {
        self.exit_status
    }

    /// Stops the VGA redraw thread and releases the host surface.
    pub fn shutdown(&mut self) {
        self.vga.shutdown();
    }
}

impl Drop for VirtualMachineInstance {
    fn drop(&mut self) {
        self.shutdown();
    }
}
