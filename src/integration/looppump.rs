use std::cell::RefCell;
use std::rc::Rc;

/* Some embedders run a cooperative loop on a thread which also wants to call
 * get(): blocking that thread on a condvar would deadlock it against its own
 * scheduler, since the work which would settle the future can only run when
 * the loop is pumped. Such a thread registers its loop here; get() on that
 * thread then drives the pump in bounded slices instead of parking.
 *
 * Bindings nest: an inner binding shadows the outer one until its guard
 * drops. The registry is strictly thread-local, hence Rc not Arc.
 */

pub trait LoopPump {
    /// Run pending loop work until none remains or the deadline passes.
    /// Returns true if any work was run.
    fn pump(&self, deadline: std::time::Instant) -> bool;
}

thread_local! {
    static THREAD_PUMP: RefCell<Vec<Rc<dyn LoopPump>>> = RefCell::new(vec![]);
}

/// Bind a pump to the calling thread until the returned guard drops.
pub fn bind_loop_pump(pump: Rc<dyn LoopPump>) -> PumpBinding {
    THREAD_PUMP.with(|pumps| pumps.borrow_mut().push(pump));
    PumpBinding(())
}

pub struct PumpBinding(());

impl Drop for PumpBinding {
    fn drop(&mut self) {
        THREAD_PUMP.with(|pumps| { pumps.borrow_mut().pop(); });
    }
}

pub(crate) fn current_pump() -> Option<Rc<dyn LoopPump>> {
    THREAD_PUMP.with(|pumps| pumps.borrow().last().cloned())
}
