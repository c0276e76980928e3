use crate::cell::settlecell::SettleCell;
use crate::combine::all::all;
use crate::handle::future::Future;
use crate::integration::runcontext::Dispatch;

/* Map an input's eventual outcome to a success either way: Some(value) on
 * success, None on failure. The derived future never fails. */
pub(crate) fn presence<T>(input: &Future<T>) -> Future<Option<T>> where T: Clone + Send + 'static {
    let cell = SettleCell::new();
    let child = cell.clone();
    input.cell().add_success(Dispatch::Inline,Box::new(move |value| {
        child.resolve(Ok(Some(value))).ok();
    }));
    let child = cell.clone();
    input.cell().add_failure(Dispatch::Inline,Box::new(move |_| {
        child.resolve(Ok(None)).ok();
    }));
    Future::from_cell(cell)
}

/// Waits for every input to settle on either branch, then succeeds with one
/// slot per input: `Some(value)` where it succeeded, `None` where it failed.
/// Unlike a race, no input's failure short-circuits, and the derived future
/// itself never fails. An empty input settles immediately with an empty vec.
pub fn any<T>(inputs: Vec<Future<T>>) -> Future<Vec<Option<T>>> where T: Clone + Send + 'static {
    all(inputs.iter().map(|input| presence(input)).collect())
}
