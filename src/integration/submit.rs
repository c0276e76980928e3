use crate::handle::future::Future;
use crate::handle::promise::Promise;
use crate::integration::runcontext::RunContext;

/// Run `producer` on the given context and hand back a future of its result.
/// A producer which fails (or panics, dropping the promise) fails the future.
pub fn submit<T,F>(context: &RunContext, producer: F) -> Future<T>
        where T: Clone + Send + 'static, F: FnOnce() -> anyhow::Result<T> + Send + 'static {
    let promise = Promise::new();
    let future = promise.future();
    context.submit(Box::new(move || {
        match producer() {
            Ok(value) => { promise.fulfill(value).ok(); },
            Err(error) => { promise.fail(error).ok(); }
        }
    }));
    future
}
