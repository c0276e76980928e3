use crate::handle::future::Future;

/// A future of every input's success value, in input order. Fails as soon as
/// the first input (scanning head-first) is seen to fail, with that fault.
/// An empty input settles immediately with an empty vec.
pub fn all<T>(inputs: Vec<Future<T>>) -> Future<Vec<T>> where T: Clone + Send + 'static {
    let mut complete = Future::settled(Vec::with_capacity(inputs.len()));
    for input in inputs {
        /* head-first: each input is only consulted once every earlier one
         * has succeeded */
        complete = complete.then_future(move |mut gathered: Vec<T>| {
            input.then(move |value| {
                gathered.push(value);
                Ok(gathered)
            })
        });
    }
    complete
}
