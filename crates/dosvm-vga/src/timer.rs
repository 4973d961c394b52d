use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::controller::VgaController;

enum TimerCommand {
    SetRate(Duration),
    Stop,
}

/// Worker thread that polls the adapter at a fixed rate.
///
/// Holds only a weak reference; the thread exits once the controller is gone.
pub(crate) struct RedrawTimer {
    control: Sender<TimerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl RedrawTimer {
    pub(crate) fn start(vga: Weak<VgaController>, rate: Duration) -> std::io::Result<Self> {
        let (control, commands) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name("vga-redraw".into())
            .spawn(move || run(vga, commands, rate))?;
        Ok(Self {
            control,
            thread: Some(thread),
        })
    }

    pub(crate) fn set_rate(&self, rate: Duration) {
        let _ = self.control.send(TimerCommand::SetRate(rate));
    }

    /// Stops the thread and waits for it. Must not be called with the device lock held.
    pub(crate) fn stop(mut self) {
        let _ = self.control.send(TimerCommand::Stop);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("vga redraw thread panicked");
            }
        }
    }
}

impl Drop for RedrawTimer {
    fn drop(&mut self) {
        // Detach: the last controller reference may be dropped on the redraw thread itself.
        let _ = self.control.send(TimerCommand::Stop);
    }
}

fn run(vga: Weak<VgaController>, commands: Receiver<TimerCommand>, mut rate: Duration) {
    let mut ticks = crossbeam_channel::tick(rate);
    loop {
        let command = crossbeam_channel::select! {
            recv(commands) -> command => command.unwrap_or(TimerCommand::Stop),
            recv(ticks) -> _ => {
                let Some(vga) = vga.upgrade() else {
                    break;
                };
                vga.poll();
                continue;
            }
        };
        match command {
            TimerCommand::SetRate(new_rate) if new_rate != rate => {
                rate = new_rate;
                ticks = crossbeam_channel::tick(rate);
            }
            TimerCommand::SetRate(_) => {}
            TimerCommand::Stop => break,
        }
    }
    tracing::trace!("vga redraw thread exiting");
}
