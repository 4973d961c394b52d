use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

type Waker = Box<dyn Fn() + Send + Sync>;

/// Process-wide "come back to the monitor" signal.
///
/// At most one signal is outstanding; further raises are suppressed until the VM thread
/// acknowledges the previous one.
#[derive(Default)]
pub struct WakeSignal {
    outstanding: AtomicBool,
    sent: AtomicUsize,
    waker: Mutex<Option<Waker>>,
}

impl WakeSignal {
    /// Installs the host hook that interrupts a running guest (e.g. kicks the vCPU thread).
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.lock() = Some(Box::new(waker));
    }

    pub(crate) fn raise(&self) {
        if self.outstanding.swap(true, Ordering::AcqRel) {
            return;
        }
        self.sent.fetch_add(1, Ordering::Relaxed);
        if let Some(waker) = self.waker.lock().as_ref() {
            waker();
        }
    }

    /// Clears the outstanding signal. Returns whether one was outstanding.
    pub fn acknowledge(&self) -> bool {
        self.outstanding.swap(false, Ordering::AcqRel)
    }

    pub fn is_outstanding(&self) -> bool {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Number of signals actually delivered to the waker.
    pub fn signals_sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}
