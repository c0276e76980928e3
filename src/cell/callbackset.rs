use std::mem;
use crate::error::Fault;
use crate::integration::runcontext::Dispatch;

/* A CallbackSet holds the callbacks deferred on a pending cell: one sequence
 * per branch (success, failure, finally), each entry tagged with the Dispatch
 * it was registered under. The owning cell captures the whole set the moment
 * it settles (via take, under the cell lock) and fires it afterwards, so no
 * user code ever runs while the lock is held. Firing order is the matching
 * branch in registration order, then finally in registration order; the
 * wrong-branch sequence is simply dropped.
 */

pub(crate) type SuccessCallback<T> = Box<dyn FnOnce(T) + Send + 'static>;
pub(crate) type FailureCallback = Box<dyn FnOnce(Fault) + Send + 'static>;
pub(crate) type FinallyCallback = Box<dyn FnOnce() + Send + 'static>;

pub(crate) struct CallbackSet<T> {
    on_success: Vec<(Dispatch,SuccessCallback<T>)>,
    on_failure: Vec<(Dispatch,FailureCallback)>,
    on_finally: Vec<(Dispatch,FinallyCallback)>
}

impl<T> CallbackSet<T> {
    pub(crate) fn new() -> CallbackSet<T> {
        CallbackSet {
            on_success: vec![],
            on_failure: vec![],
            on_finally: vec![]
        }
    }

    pub(crate) fn add_success(&mut self, dispatch: Dispatch, callback: SuccessCallback<T>) {
        self.on_success.push((dispatch,callback));
    }

    pub(crate) fn add_failure(&mut self, dispatch: Dispatch, callback: FailureCallback) {
        self.on_failure.push((dispatch,callback));
    }

    pub(crate) fn add_finally(&mut self, dispatch: Dispatch, callback: FinallyCallback) {
        self.on_finally.push((dispatch,callback));
    }

    pub(crate) fn take(&mut self) -> CallbackSet<T> {
        mem::replace(self,CallbackSet::new())
    }

    pub(crate) fn fire_failure(self, fault: &Fault) {
        for (dispatch,callback) in self.on_failure {
            let fault = fault.clone();
            dispatch.run(Box::new(move || callback(fault)));
        }
        for (dispatch,callback) in self.on_finally {
            dispatch.run(callback);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.on_success.len() + self.on_failure.len() + self.on_finally.len()
    }
}

impl<T> CallbackSet<T> where T: Clone + Send + 'static {
    pub(crate) fn fire_success(self, value: &T) {
        for (dispatch,callback) in self.on_success {
            let value = value.clone();
            dispatch.run(Box::new(move || callback(value)));
        }
        for (dispatch,callback) in self.on_finally {
            dispatch.run(callback);
        }
    }
}
