use std::collections::VecDeque;
use std::sync::{ Arc, Mutex };
use std::sync::mpsc::{ channel, Sender };
use std::thread;
use std::time::Instant;
use crate::integration::looppump::LoopPump;
use crate::integration::runcontext::ContextIntegration;

/* Two stock ContextIntegrations: a manually-pumped queue for deterministic
 * tests and samples, and a single worker thread for callers who just want
 * somewhere for work to happen. The library itself never spawns a thread;
 * these are the batteries included for embedders without an engine of
 * their own.
 */

pub(crate) type Work = Box<dyn FnOnce() + Send + 'static>;

/// Queues submitted work until run_one/run_all is called. Also usable as a
/// LoopPump, which makes it the smallest possible cooperative loop.
#[derive(Clone)]
pub struct QueueIntegration {
    queue: Arc<Mutex<VecDeque<Work>>>
}

impl QueueIntegration {
    pub fn new() -> QueueIntegration {
        QueueIntegration { queue: Arc::new(Mutex::new(VecDeque::new())) }
    }

    pub(crate) fn queue_work(&self, work: Work) {
        self.queue.lock().unwrap().push_back(work);
    }

    /// Run the oldest queued unit of work. True if there was one.
    pub fn run_one(&self) -> bool {
        let work = self.queue.lock().unwrap().pop_front();
        match work {
            Some(work) => { work(); true },
            None => false
        }
    }

    /// Drain the queue, including work queued by the work itself. Returns
    /// the number of units run.
    pub fn run_all(&self) -> usize {
        let mut count = 0;
        while self.run_one() { count += 1; }
        count
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

impl ContextIntegration for QueueIntegration {
    fn submit(&self, work: Work) { self.queue_work(work); }
}

impl LoopPump for QueueIntegration {
    fn pump(&self, deadline: Instant) -> bool {
        let mut any = false;
        while self.run_one() {
            any = true;
            if Instant::now() >= deadline { break; }
        }
        any
    }
}

/// Runs submitted work in order on one dedicated worker thread. The worker
/// exits when the integration is dropped.
pub struct ThreadIntegration {
    sender: Mutex<Sender<Work>>
}

impl ThreadIntegration {
    pub fn new() -> ThreadIntegration {
        let (sender,receiver) = channel::<Work>();
        thread::spawn(move || {
            while let Ok(work) = receiver.recv() { work(); }
        });
        ThreadIntegration { sender: Mutex::new(sender) }
    }
}

impl ContextIntegration for ThreadIntegration {
    fn submit(&self, work: Work) {
        self.sender.lock().unwrap().send(work).ok();
    }
}
