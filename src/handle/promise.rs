use anyhow::{ anyhow as err };
use log::warn;
use crate::cell::settlecell::SettleCell;
use crate::error::{ fault, FutureError };
use crate::handle::future::Future;

/* A Promise is the write half of a cell: logically single-use, in that
 * exactly one fulfill or fail can ever succeed, with every later attempt
 * reported as AlreadySettled. The matching read half is handed out by
 * future(), as many times as wanted.
 *
 * Dropping a promise which is still pending fails the cell, so a producer
 * which panics (or just forgets) cannot leave consumers blocked forever.
 */

pub struct Promise<T: 'static> {
    cell: SettleCell<T>,
    disarmed: bool
}

impl<T> Promise<T> where T: Clone + Send + 'static {
    pub fn new() -> Promise<T> {
        Promise { cell: SettleCell::new(), disarmed: false }
    }

    pub(crate) fn from_cell(cell: SettleCell<T>) -> Promise<T> {
        Promise { cell, disarmed: false }
    }

    /* hand the cell over without triggering the drop-unfulfilled fault */
    pub(crate) fn into_cell(mut self) -> SettleCell<T> {
        self.disarmed = true;
        self.cell.clone()
    }

    /// A read handle observing this promise. May be called repeatedly.
    pub fn future(&self) -> Future<T> {
        Future::from_cell(self.cell.clone())
    }

    /// Settle with a success value. Fails with `AlreadySettled` if this
    /// promise has already been fulfilled or failed.
    pub fn fulfill(&self, value: T) -> Result<(),FutureError> {
        self.cell.resolve(Ok(value))
    }

    /// Settle with a failure. Fails with `AlreadySettled` if this promise
    /// has already been fulfilled or failed.
    pub fn fail<E>(&self, error: E) -> Result<(),FutureError> where E: Into<anyhow::Error> {
        self.cell.resolve(Err(fault(error)))
    }
}

impl<T: 'static> Drop for Promise<T> {
    fn drop(&mut self) {
        if self.disarmed { return; }
        if self.cell.fail_if_pending(fault(err!("promise dropped unfulfilled"))) {
            warn!("promise dropped while still unfulfilled");
        }
    }
}

#[cfg(test)]
mod test {
    use std::thread;
    use crate::error::FutureError;
    use super::*;

    #[test]
    pub fn test_promise_smoke() {
        let promise = Promise::new();
        let future = promise.future();
        thread::spawn(move || {
            promise.fulfill(10).unwrap();
        });
        assert_eq!(10,future.get().unwrap());
    }

    #[test]
    pub fn test_already_settled() {
        let promise = Promise::new();
        assert!(promise.fulfill(1).is_ok());
        assert!(matches!(promise.fulfill(2),Err(FutureError::AlreadySettled)));
        assert!(matches!(promise.fail(err!("nope")),Err(FutureError::AlreadySettled)));
        assert_eq!(1,promise.future().get().unwrap());
    }

    #[test]
    pub fn test_fail_wins_once() {
        let promise : Promise<u32> = Promise::new();
        let future = promise.future();
        assert!(promise.fail(err!("broken")).is_ok());
        assert!(matches!(promise.fulfill(1),Err(FutureError::AlreadySettled)));
        match future.get() {
            Err(FutureError::Failed(fault)) => assert_eq!("broken",format!("{}",fault)),
            other => panic!("unexpected {:?}",other)
        }
    }

    #[test]
    pub fn test_drop_unfulfilled_fails_future() {
        let promise : Promise<u32> = Promise::new();
        let future = promise.future();
        drop(promise);
        match future.try_get() {
            Err(FutureError::Failed(fault)) => {
                assert!(format!("{}",fault).contains("dropped"));
            },
            other => panic!("unexpected {:?}",other)
        }
    }

    #[test]
    pub fn test_many_read_handles() {
        let promise = Promise::new();
        let a = promise.future();
        let b = promise.future();
        promise.fulfill("shared".to_string()).unwrap();
        assert_eq!("shared",a.get().unwrap());
        assert_eq!("shared",b.get().unwrap());
    }
}
