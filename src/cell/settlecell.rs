use std::mem;
use std::sync::{ Arc, Condvar, Mutex };
use std::task::Waker;
use std::time::Instant;
use crate::cell::callbackset::{ CallbackSet, FailureCallback, FinallyCallback, SuccessCallback };
use crate::error::{ Fault, FutureError };
use crate::integration::runcontext::Dispatch;

#[cfg(test)]
use owning_ref::MutexGuardRef;

/* A SettleCell is the one-shot container underneath a Promise/Future pair:
 * a write-once tri-state (pending, success, failure) plus the callbacks
 * deferred while pending and the machinery to wake blocked waiters. All
 * mutation is serialized through the one mutex; the condvar wakes wait_until.
 *
 * The important discipline is in resolve and the add_* registrations: the
 * callback set is captured and cleared (and late registrations turned into
 * run-now thunks) strictly under the lock, but invoked strictly after the
 * lock is released. A callback is therefore free to touch this same cell
 * again without deadlocking, and no callback can be skipped or run twice
 * however registration races against resolution.
 */

pub(crate) enum SettleState<T> {
    Pending,
    Success(T),
    Failure(Fault)
}

pub(crate) struct CellState<T> {
    state: SettleState<T>,
    callbacks: CallbackSet<T>,
    wakers: Vec<Waker>
}

struct CellSync<T> {
    state: Mutex<CellState<T>>,
    settled: Condvar
}

pub(crate) struct SettleCell<T>(Arc<CellSync<T>>);

// can't derive Clone on polymorphic types without bounding T
impl<T> Clone for SettleCell<T> {
    fn clone(&self) -> Self { SettleCell(self.0.clone()) }
}

impl<T> SettleCell<T> {
    pub(crate) fn new() -> SettleCell<T> {
        SettleCell(Arc::new(CellSync {
            state: Mutex::new(CellState {
                state: SettleState::Pending,
                callbacks: CallbackSet::new(),
                wakers: vec![]
            }),
            settled: Condvar::new()
        }))
    }

    /* failure path has no bound on T so that Promise::drop can use it */
    pub(crate) fn fail_if_pending(&self, fault: Fault) -> bool {
        let mut guard = self.0.state.lock().unwrap();
        if !matches!(guard.state,SettleState::Pending) { return false; }
        guard.state = SettleState::Failure(fault.clone());
        let callbacks = guard.callbacks.take();
        let wakers = mem::take(&mut guard.wakers);
        self.0.settled.notify_all();
        drop(guard);
        for waker in wakers { waker.wake(); }
        callbacks.fire_failure(&fault);
        true
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(self.0.state.lock().unwrap().state,SettleState::Pending)
    }

    /// Block until settled or the deadline passes. True if settled. Spurious
    /// condvar wakeups are absorbed by the loop.
    pub(crate) fn wait_until(&self, deadline: Option<Instant>) -> bool {
        let mut guard = self.0.state.lock().unwrap();
        loop {
            if !matches!(guard.state,SettleState::Pending) { return true; }
            match deadline {
                None => {
                    guard = self.0.settled.wait(guard).unwrap();
                },
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline { return false; }
                    let (next,_) = self.0.settled.wait_timeout(guard,deadline-now).unwrap();
                    guard = next;
                }
            }
        }
    }

    pub(crate) fn add_finally(&self, dispatch: Dispatch, callback: FinallyCallback) {
        let mut guard = self.0.state.lock().unwrap();
        if matches!(guard.state,SettleState::Pending) {
            guard.callbacks.add_finally(dispatch,callback);
            return;
        }
        /* fires on either terminal branch */
        drop(guard);
        dispatch.run(callback);
    }

    #[cfg(test)]
    pub(crate) fn callback_count(&self) -> usize {
        self.0.state.lock().unwrap().callbacks.len()
    }

    #[cfg(test)]
    pub(crate) fn waker_count(&self) -> usize {
        self.0.state.lock().unwrap().wakers.len()
    }
}

impl<T> SettleCell<T> where T: Clone + Send + 'static {
    pub(crate) fn resolve(&self, outcome: Result<T,Fault>) -> Result<(),FutureError> {
        match outcome {
            Ok(value) => self.succeed(value),
            Err(fault) => {
                if self.fail_if_pending(fault) { Ok(()) } else { Err(FutureError::AlreadySettled) }
            }
        }
    }

    fn succeed(&self, value: T) -> Result<(),FutureError> {
        let mut guard = self.0.state.lock().unwrap();
        if !matches!(guard.state,SettleState::Pending) { return Err(FutureError::AlreadySettled); }
        guard.state = SettleState::Success(value.clone());
        let callbacks = guard.callbacks.take();
        let wakers = mem::take(&mut guard.wakers);
        self.0.settled.notify_all();
        drop(guard);
        for waker in wakers { waker.wake(); }
        callbacks.fire_success(&value);
        Ok(())
    }

    pub(crate) fn add_success(&self, dispatch: Dispatch, callback: SuccessCallback<T>) {
        let mut guard = self.0.state.lock().unwrap();
        if matches!(guard.state,SettleState::Pending) {
            guard.callbacks.add_success(dispatch,callback);
            return;
        }
        let value = if let SettleState::Success(value) = &guard.state { Some(value.clone()) } else { None };
        drop(guard);
        if let Some(value) = value {
            /* already succeeded: run now, after unlock */
            dispatch.run(Box::new(move || callback(value)));
        }
        /* already failed: success callback never fires, dropped */
    }

    pub(crate) fn add_failure(&self, dispatch: Dispatch, callback: FailureCallback) {
        let mut guard = self.0.state.lock().unwrap();
        if matches!(guard.state,SettleState::Pending) {
            guard.callbacks.add_failure(dispatch,callback);
            return;
        }
        let fault = if let SettleState::Failure(fault) = &guard.state { Some(fault.clone()) } else { None };
        drop(guard);
        if let Some(fault) = fault {
            dispatch.run(Box::new(move || callback(fault)));
        }
    }

    pub(crate) fn snapshot(&self) -> Option<Result<T,Fault>> {
        match &self.0.state.lock().unwrap().state {
            SettleState::Pending => None,
            SettleState::Success(value) => Some(Ok(value.clone())),
            SettleState::Failure(fault) => Some(Err(fault.clone()))
        }
    }

    pub(crate) fn poll_settled(&self, waker: &Waker) -> Option<Result<T,Fault>> {
        let mut guard = self.0.state.lock().unwrap();
        match &guard.state {
            SettleState::Pending => {},
            SettleState::Success(value) => { return Some(Ok(value.clone())); },
            SettleState::Failure(fault) => { return Some(Err(fault.clone())); }
        }
        /* a re-polling executor supplies an equivalent waker each time */
        if !guard.wakers.iter().any(|known| known.will_wake(waker)) {
            guard.wakers.push(waker.clone());
        }
        None
    }

    #[cfg(test)]
    fn value_ref(&self) -> Option<MutexGuardRef<CellState<T>,T>> {
        let guard = self.0.state.lock().unwrap();
        if matches!(guard.state,SettleState::Success(_)) {
            Some(MutexGuardRef::new(guard).map(|state| match &state.state {
                SettleState::Success(value) => value,
                _ => unreachable!()
            }))
        } else {
            None
        }
    }
}
