use std::sync::Arc;
use thiserror::Error;

/* A settled cell must be able to show the same failure to every consumer, so
 * the user's error payload is held behind an Arc and handed out by clone.
 */

/// The opaque failure payload carried by a failed future. Shared between all
/// consumers of the same future.
pub type Fault = Arc<anyhow::Error>;

pub(crate) fn fault<E>(error: E) -> Fault where E: Into<anyhow::Error> {
    Arc::new(error.into())
}

/// Errors reported by the library itself, plus the wrapper re-raising a
/// producer's own failure.
#[derive(Error,Debug,Clone)]
pub enum FutureError {
    /// A fulfill or fail was attempted on a promise which has already been
    /// settled. Always a programming error at the call site.
    #[error("settle attempted on an already-settled promise")]
    AlreadySettled,
    /// A deadline passed while the future was still pending. The future is
    /// unaffected and may still settle later; waiting again is fine.
    #[error("deadline passed while future still pending")]
    Timeout,
    /// The producer (or a callback in the chain) failed. Carries the
    /// producer's payload unchanged.
    #[error("{0}")]
    Failed(Fault)
}
