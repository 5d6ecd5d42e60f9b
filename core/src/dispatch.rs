//! Delivery contexts for request callbacks.
//!
//! Request I/O runs on worker threads. Callbacks must not: they are handed
//! to a [`Dispatcher`], which decides where they run. [`DeliveryQueue`] is
//! the stock dispatcher for a UI-style thread that drains a queue from its
//! own loop, so callback bodies only ever touch that thread's state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{trace, warn};

/// A unit of work handed to a delivery context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks on some execution context chosen by the implementor.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, task: Task);
}

impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
    fn dispatch(&self, task: Task) {
        (**self).dispatch(task)
    }
}

/// FIFO of callbacks, drained by the thread that owns it.
#[derive(Debug)]
pub struct DeliveryQueue {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Handle that worker threads use to enqueue callbacks.
    pub fn dispatcher(&self) -> QueueDispatcher {
        QueueDispatcher {
            sender: self.sender.clone(),
        }
    }

    /// Run every task queued right now, returning how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Block until `count` tasks ran or `timeout` elapsed; returns the
    /// number that ran. A timeout too large to represent waits forever.
    pub fn run_until(&self, count: usize, timeout: Duration) -> usize {
        let deadline = Instant::now().checked_add(timeout);
        let mut ran = 0;
        while ran < count {
            let next = match deadline {
                Some(deadline) => self.receiver.recv_deadline(deadline).ok(),
                None => self.receiver.recv().ok(),
            };
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Cloneable sending side of a [`DeliveryQueue`].
#[derive(Debug, Clone)]
pub struct QueueDispatcher {
    sender: Sender<Task>,
}

impl Dispatcher for QueueDispatcher {
    fn dispatch(&self, task: Task) {
        if self.sender.send(task).is_err() {
            warn!("delivery queue is gone; dropping callback");
        } else {
            trace!("callback queued for delivery");
        }
    }
}
