use std::pin::Pin;
use std::task::{ Context, Poll };
use std::thread;
use std::time::{ Duration, Instant };
use crate::cell::settlecell::SettleCell;
use crate::error::{ fault, Fault, FutureError };
use crate::handle::promise::Promise;
use crate::integration::looppump::current_pump;
use crate::integration::runcontext::{ Dispatch, RunContext };

/* A Future is a shared read handle on a cell: blocking get, non-blocking
 * try_get, and the chaining registrations. Chaining creates a fresh cell and
 * wires the parent's branches to settle it; then_promise is the general
 * primitive and then/then_future are sugar over it. All registrations accept
 * a run context via the _on variants; the plain variants are Dispatch::Inline.
 *
 * get has one special case: a thread which owns a cooperative run-loop must
 * not block its own scheduler, so when a LoopPump is bound on the calling
 * thread, get pumps the loop in bounded slices instead of parking on the
 * cell's condvar.
 */

const PUMP_SLICE: Duration = Duration::from_millis(20);
const PUMP_IDLE: Duration = Duration::from_millis(1);

pub struct Future<T: 'static>(SettleCell<T>);

// can't derive Clone on polymorphic types without bounding T
impl<T> Clone for Future<T> {
    fn clone(&self) -> Self { Future(self.0.clone()) }
}

impl<T> Future<T> where T: Clone + Send + 'static {
    pub(crate) fn from_cell(cell: SettleCell<T>) -> Future<T> { Future(cell) }
    pub(crate) fn cell(&self) -> &SettleCell<T> { &self.0 }

    /// A future already settled with the given value.
    pub fn settled(value: T) -> Future<T> {
        let cell = SettleCell::new();
        cell.resolve(Ok(value)).ok();
        Future(cell)
    }

    /// A future already settled with the given failure.
    pub fn failed<E>(error: E) -> Future<T> where E: Into<anyhow::Error> {
        let cell = SettleCell::new();
        cell.resolve(Err(fault(error))).ok();
        Future(cell)
    }

    fn get_by(&self, deadline: Option<Instant>) -> Result<T,FutureError> {
        if let Some(pump) = current_pump() {
            /* loop-owning thread: pump rather than block its own scheduler */
            loop {
                if let Some(outcome) = self.0.snapshot() {
                    return outcome.map_err(FutureError::Failed);
                }
                let now = Instant::now();
                if let Some(deadline) = deadline {
                    if now >= deadline { return Err(FutureError::Timeout); }
                }
                let mut slice = now + PUMP_SLICE;
                if let Some(deadline) = deadline { slice = slice.min(deadline); }
                if !pump.pump(slice) {
                    thread::sleep(PUMP_IDLE);
                }
            }
        }
        if self.0.wait_until(deadline) {
            if let Some(outcome) = self.0.snapshot() {
                return outcome.map_err(FutureError::Failed);
            }
        }
        Err(FutureError::Timeout)
    }

    /// Block until settled: the success value, the re-raised failure, never
    /// a timeout.
    pub fn get(&self) -> Result<T,FutureError> { self.get_by(None) }

    /// As get, but gives up with `Timeout` at the deadline. The future is
    /// unaffected by a timeout and may still settle later.
    pub fn get_until(&self, deadline: Instant) -> Result<T,FutureError> {
        self.get_by(Some(deadline))
    }

    pub fn get_within(&self, limit: Duration) -> Result<T,FutureError> {
        self.get_by(Some(Instant::now()+limit))
    }

    /// Non-blocking: `Ok(None)` while pending, otherwise the value or the
    /// re-raised failure.
    pub fn try_get(&self) -> Result<Option<T>,FutureError> {
        match self.0.snapshot() {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(fault)) => Err(FutureError::Failed(fault))
        }
    }

    fn wait_by(&self, deadline: Option<Instant>) -> Result<(),FutureError> {
        match self.get_by(deadline) {
            Err(FutureError::Timeout) => Err(FutureError::Timeout),
            _ => Ok(())
        }
    }

    /// Block until settled on either branch, discarding the outcome.
    pub fn wait(&self) -> Result<(),FutureError> { self.wait_by(None) }

    pub fn wait_until(&self, deadline: Instant) -> Result<(),FutureError> {
        self.wait_by(Some(deadline))
    }

    /* the general chaining primitive all registration forms reduce to */
    fn chain<U,F>(&self, dispatch: Dispatch, callback: F) -> Future<U>
            where U: Clone + Send + 'static, F: FnOnce(T,Promise<U>) + Send + 'static {
        let cell = SettleCell::new();
        let child = cell.clone();
        self.0.add_success(dispatch,Box::new(move |value| {
            callback(value,Promise::from_cell(child));
        }));
        let child = cell.clone();
        /* parent failure propagates untransformed, always inline */
        self.0.add_failure(Dispatch::Inline,Box::new(move |fault| {
            child.resolve(Err(fault)).ok();
        }));
        Future(cell)
    }

    fn then_by<U,F>(&self, dispatch: Dispatch, callback: F) -> Future<U>
            where U: Clone + Send + 'static, F: FnOnce(T) -> anyhow::Result<U> + Send + 'static {
        self.chain(dispatch,move |value,promise| {
            match callback(value) {
                Ok(value) => { promise.fulfill(value).ok(); },
                Err(error) => { promise.fail(error).ok(); }
            }
        })
    }

    fn then_future_by<U,F>(&self, dispatch: Dispatch, callback: F) -> Future<U>
            where U: Clone + Send + 'static, F: FnOnce(T) -> Future<U> + Send + 'static {
        self.chain(dispatch,move |value,promise| {
            callback(value).settle_into(promise);
        })
    }

    /// Run `callback` on success; the returned future settles with its
    /// result, or with this future's failure, propagated.
    pub fn then<U,F>(&self, callback: F) -> Future<U>
            where U: Clone + Send + 'static, F: FnOnce(T) -> anyhow::Result<U> + Send + 'static {
        self.then_by(Dispatch::Inline,callback)
    }

    pub fn then_on<U,F>(&self, context: &RunContext, callback: F) -> Future<U>
            where U: Clone + Send + 'static, F: FnOnce(T) -> anyhow::Result<U> + Send + 'static {
        self.then_by(Dispatch::on(context),callback)
    }

    /// Flattening form: `callback` returns a future and the returned future
    /// adopts that inner future's eventual outcome. A future-of-a-future is
    /// never observable downstream.
    pub fn then_future<U,F>(&self, callback: F) -> Future<U>
            where U: Clone + Send + 'static, F: FnOnce(T) -> Future<U> + Send + 'static {
        self.then_future_by(Dispatch::Inline,callback)
    }

    pub fn then_future_on<U,F>(&self, context: &RunContext, callback: F) -> Future<U>
            where U: Clone + Send + 'static, F: FnOnce(T) -> Future<U> + Send + 'static {
        self.then_future_by(Dispatch::on(context),callback)
    }

    /// The most general chaining form: `callback` receives the child promise
    /// and must settle it. If it returns (or panics) without doing so, the
    /// dropped promise fails the child on its behalf.
    pub fn then_promise<U,F>(&self, callback: F) -> Future<U>
            where U: Clone + Send + 'static, F: FnOnce(T,Promise<U>) + Send + 'static {
        self.chain(Dispatch::Inline,callback)
    }

    pub fn then_promise_on<U,F>(&self, context: &RunContext, callback: F) -> Future<U>
            where U: Clone + Send + 'static, F: FnOnce(T,Promise<U>) + Send + 'static {
        self.chain(Dispatch::on(context),callback)
    }

    /// Run `callback` on failure only. Side-effect only: returns the same
    /// future, so downstream consumers still see the failure.
    pub fn catch<F>(&self, callback: F) -> Future<T> where F: FnOnce(Fault) + Send + 'static {
        self.0.add_failure(Dispatch::Inline,Box::new(callback));
        self.clone()
    }

    pub fn catch_on<F>(&self, context: &RunContext, callback: F) -> Future<T>
            where F: FnOnce(Fault) + Send + 'static {
        self.0.add_failure(Dispatch::on(context),Box::new(callback));
        self.clone()
    }

    /// Run `callback` once this future settles on either branch, ignoring
    /// the outcome. Returns the same future.
    pub fn finally<F>(&self, callback: F) -> Future<T> where F: FnOnce() + Send + 'static {
        self.0.add_finally(Dispatch::Inline,Box::new(callback));
        self.clone()
    }

    pub fn finally_on<F>(&self, context: &RunContext, callback: F) -> Future<T>
            where F: FnOnce() + Send + 'static {
        self.0.add_finally(Dispatch::on(context),Box::new(callback));
        self.clone()
    }

    /* adopt our eventual outcome as the given promise's outcome */
    pub(crate) fn settle_into(&self, promise: Promise<T>) {
        let cell = promise.into_cell();
        let child = cell.clone();
        self.0.add_success(Dispatch::Inline,Box::new(move |value| {
            child.resolve(Ok(value)).ok();
        }));
        self.0.add_failure(Dispatch::Inline,Box::new(move |fault| {
            cell.resolve(Err(fault)).ok();
        }));
    }
}

impl<T> std::future::Future for Future<T> where T: Clone + Send + 'static {
    type Output = Result<T,FutureError>;

    fn poll(self: Pin<&mut Self>, ctx: &mut Context) -> Poll<Self::Output> {
        match self.0.poll_settled(ctx.waker()) {
            Some(outcome) => Poll::Ready(outcome.map_err(FutureError::Failed)),
            None => Poll::Pending
        }
    }
}

#[cfg(test)]
mod test {
    use futures::executor::block_on;
    use std::sync::{ Arc, Barrier, Mutex };
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use anyhow::{ anyhow as err };
    use crate::integration::submit::submit;
    use crate::integration::testintegration::{ QueueIntegration, ThreadIntegration };
    use super::*;

    #[test]
    pub fn test_fresh_future_pending() {
        let promise : Promise<u32> = Promise::new();
        let future = promise.future();
        assert!(matches!(future.try_get(),Ok(None)));
        assert!(matches!(future.get_until(Instant::now()),Err(FutureError::Timeout)));
        assert!(matches!(future.get_within(Duration::from_millis(0)),Err(FutureError::Timeout)));
    }

    #[test]
    pub fn test_timeout_then_resolve() {
        /* scenario: deadline passes, nothing lost, later get still succeeds */
        let promise = Promise::new();
        let future = promise.future();
        assert!(matches!(future.get_within(Duration::from_millis(10)),Err(FutureError::Timeout)));
        promise.fulfill(7).unwrap();
        assert_eq!(7,future.get_within(Duration::from_millis(10)).unwrap());
    }

    #[test]
    pub fn test_callbacks_exactly_once_in_order() {
        let promise = Promise::new();
        let future = promise.future();
        let report = Arc::new(Mutex::new(vec![]));
        /* three before resolution */
        for i in 0..3 {
            let report2 = report.clone();
            future.then(move |v: u32| { report2.lock().unwrap().push(format!("t{}={}",i,v)); Ok(()) });
        }
        let report2 = report.clone();
        future.finally(move || { report2.lock().unwrap().push("z0".to_string()); });
        promise.fulfill(4).unwrap();
        /* two after resolution */
        let report2 = report.clone();
        future.then(move |v: u32| { report2.lock().unwrap().push(format!("t3={}",v)); Ok(()) });
        let report2 = report.clone();
        future.finally(move || { report2.lock().unwrap().push("z1".to_string()); });
        assert_eq!("t0=4,t1=4,t2=4,z0,t3=4,z1",report.lock().unwrap().join(","));
    }

    #[test]
    pub fn test_then_transforms_and_chains() {
        let future = Future::settled(1);
        let chained = future.then(|x| Ok(x+1)).then(|x| Ok(x*10));
        assert_eq!(20,chained.get().unwrap());
    }

    #[test]
    pub fn test_then_error_fails_child() {
        let future = Future::settled(1);
        let chained : Future<u32> = future.then(|_| Err(err!("sums are hard")));
        match chained.get() {
            Err(FutureError::Failed(fault)) => assert_eq!("sums are hard",format!("{}",fault)),
            other => panic!("unexpected {:?}",other)
        }
        /* parent untouched */
        assert_eq!(1,future.get().unwrap());
    }

    #[test]
    pub fn test_parent_failure_propagates() {
        let promise : Promise<u32> = Promise::new();
        let caught = Arc::new(Mutex::new(None));
        let caught2 = caught.clone();
        let chained = promise.future()
            .then(|x| Ok(x+1))
            .catch(move |fault| { *caught2.lock().unwrap() = Some(format!("{}",fault)); });
        promise.fail(err!("upstream")).unwrap();
        assert!(matches!(chained.try_get(),Err(FutureError::Failed(_))));
        assert_eq!(Some("upstream".to_string()),*caught.lock().unwrap());
    }

    #[test]
    pub fn test_flattening() {
        /* scenario: two chained transforms plus one flattening step */
        let context = RunContext::new(ThreadIntegration::new());
        let context2 = context.clone();
        let future = submit(&context,|| Ok(1))
            .then(|x| Ok(x+1))
            .then_future(move |x| submit(&context2,move || Ok(x+1)));
        assert_eq!(3,future.get().unwrap());
    }

    #[test]
    pub fn test_flattening_inner_failure() {
        let future = Future::settled(1);
        let chained : Future<u32> = future.then_future(|_| Future::failed(err!("inner")));
        match chained.get() {
            Err(FutureError::Failed(fault)) => assert_eq!("inner",format!("{}",fault)),
            other => panic!("unexpected {:?}",other)
        }
    }

    #[test]
    pub fn test_then_promise_general_form() {
        let future = Future::settled(3);
        let chained = future.then_promise(|value,promise: Promise<u32>| {
            promise.fulfill(value*2).unwrap();
        });
        assert_eq!(6,chained.get().unwrap());
    }

    #[test]
    pub fn test_then_promise_unsettled_fails_child() {
        let future = Future::settled(3);
        let chained : Future<u32> = future.then_promise(|_,_promise| {
            /* never settles the promise: machinery fails it on our behalf */
        });
        assert!(matches!(chained.try_get(),Err(FutureError::Failed(_))));
    }

    #[test]
    pub fn test_catch_skipped_on_success() {
        let promise = Promise::new();
        let fired = Arc::new(Mutex::new(false));
        let fired2 = fired.clone();
        let finished = Arc::new(Mutex::new(false));
        let finished2 = finished.clone();
        promise.future()
            .catch(move |_| { *fired2.lock().unwrap() = true; })
            .finally(move || { *finished2.lock().unwrap() = true; });
        promise.fulfill(1).unwrap();
        assert!(!*fired.lock().unwrap());
        assert!(*finished.lock().unwrap());
    }

    #[test]
    pub fn test_finally_fires_on_failure() {
        let promise : Promise<u32> = Promise::new();
        let finished = Arc::new(Mutex::new(false));
        let finished2 = finished.clone();
        promise.future().finally(move || { *finished2.lock().unwrap() = true; });
        promise.fail(err!("bad")).unwrap();
        assert!(*finished.lock().unwrap());
    }

    #[test]
    pub fn test_wait_discards_outcome() {
        let promise : Promise<u32> = Promise::new();
        let future = promise.future();
        assert!(matches!(future.wait_until(Instant::now()),Err(FutureError::Timeout)));
        promise.fail(err!("bad")).unwrap();
        assert!(future.wait().is_ok());
    }

    #[test]
    pub fn test_then_on_queues_at_resolution() {
        let queue = QueueIntegration::new();
        let context = RunContext::new(queue.clone());
        let promise = Promise::new();
        let report = Arc::new(Mutex::new(vec![]));
        let report2 = report.clone();
        let chained = promise.future().then_on(&context,move |v: u32| {
            report2.lock().unwrap().push(v);
            Ok(v+1)
        });
        promise.fulfill(6).unwrap();
        /* tagged callback was queued, not run on the resolving thread */
        assert!(report.lock().unwrap().is_empty());
        assert!(matches!(chained.try_get(),Ok(None)));
        assert_eq!(1,queue.len());
        assert_eq!(1,queue.run_all());
        assert_eq!(vec![6],*report.lock().unwrap());
        assert_eq!(7,chained.get().unwrap());
    }

    #[test]
    pub fn test_then_on_inline_when_resolved_inside_context() {
        let queue = QueueIntegration::new();
        let context = RunContext::new(queue.clone());
        let promise = Promise::new();
        let ran = Arc::new(Mutex::new(false));
        let ran2 = ran.clone();
        promise.future().then_on(&context,move |_: u32| {
            *ran2.lock().unwrap() = true;
            Ok(())
        });
        let queue2 = queue.clone();
        let ran3 = ran.clone();
        context.submit(Box::new(move || {
            promise.fulfill(1).ok();
            /* resolving thread is inside the context: fired inline, not re-queued */
            assert!(*ran3.lock().unwrap());
            assert_eq!(0,queue2.len());
        }));
        assert_eq!(1,queue.run_all());
        assert!(*ran.lock().unwrap());
    }

    #[test]
    pub fn test_catch_on_and_finally_on_queue_at_failure() {
        let queue = QueueIntegration::new();
        let context = RunContext::new(queue.clone());
        let promise : Promise<u32> = Promise::new();
        let report = Arc::new(Mutex::new(vec![]));
        let report2 = report.clone();
        let report3 = report.clone();
        promise.future()
            .catch_on(&context,move |fault| { report2.lock().unwrap().push(format!("c={}",fault)); })
            .finally_on(&context,move || { report3.lock().unwrap().push("z".to_string()); });
        promise.fail(err!("late")).unwrap();
        assert!(report.lock().unwrap().is_empty());
        assert_eq!(2,queue.len());
        assert_eq!(2,queue.run_all());
        assert_eq!("c=late,z",report.lock().unwrap().join(","));
    }

    #[test]
    pub fn test_registration_race() {
        /* R registering threads against one fulfilling thread: every
         * callback exactly once, no wrong-branch firings */
        const R : usize = 4;
        let promise = Promise::new();
        let future = promise.future();
        let barrier = Arc::new(Barrier::new(R+1));
        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let finallies = Arc::new(AtomicUsize::new(0));
        let mut registrants = vec![];
        for _ in 0..R {
            let future2 = future.clone();
            let barrier2 = barrier.clone();
            let successes2 = successes.clone();
            let failures2 = failures.clone();
            let finallies2 = finallies.clone();
            registrants.push(thread::spawn(move || {
                barrier2.wait();
                future2.then(move |_: u32| { successes2.fetch_add(1,Ordering::SeqCst); Ok(()) });
                future2.catch(move |_| { failures2.fetch_add(1,Ordering::SeqCst); });
                future2.finally(move || { finallies2.fetch_add(1,Ordering::SeqCst); });
            }));
        }
        barrier.wait();
        promise.fulfill(1).unwrap();
        for registrant in registrants {
            registrant.join().expect("registrant thread panicked");
        }
        assert_eq!(R,successes.load(Ordering::SeqCst));
        assert_eq!(0,failures.load(Ordering::SeqCst));
        assert_eq!(R,finallies.load(Ordering::SeqCst));
    }

    #[test]
    pub fn test_await() {
        let promise = Promise::new();
        let future = promise.future();
        let waiter = thread::spawn(move || {
            block_on(async move { future.await })
        });
        promise.fulfill(12).unwrap();
        assert_eq!(12,waiter.join().unwrap().unwrap());
    }

    #[test]
    pub fn test_await_failure() {
        let promise : Promise<u32> = Promise::new();
        let future = promise.future();
        promise.fail(err!("bad")).unwrap();
        assert!(matches!(block_on(future),Err(FutureError::Failed(_))));
    }
}
