use log::debug;
use std::cell::RefCell;
use std::sync::{ Arc, Mutex };

/* A RunContext is the library's view of "somewhere callbacks can be sent to
 * run": a thread pool, a serial queue, whatever. The embedder supplies the
 * engine as a ContextIntegration; RunContext wraps it with an identity so
 * that "am I already running inside this context?" is answerable. Work
 * submitted through a RunContext is bracketed by an entry guard, which is
 * what makes that test hold while the work runs.
 *
 * Dispatch is the tag attached to every registered callback. Inline is a
 * first-class value meaning "run on whichever thread causes the callback to
 * fire", distinct from On(context) meaning "submit to that context unless
 * the firing thread is already inside it".
 */

lazy_static! {
    static ref NEXT_IDENTITY : Arc<Mutex<u64>> = Arc::new(Mutex::new(0));
}

thread_local! {
    static ENTERED: RefCell<Vec<u64>> = RefCell::new(vec![]);
}

/// Supplied by the embedder: anything which can accept a zero-argument unit
/// of work for later execution.
pub trait ContextIntegration {
    fn submit(&self, work: Box<dyn FnOnce() + Send + 'static>);
}

struct RunContextState {
    identity: u64,
    integration: Box<dyn ContextIntegration + Send + Sync>
}

/// An execution context callbacks can be dispatched to.
#[derive(Clone)]
pub struct RunContext(Arc<RunContextState>);

impl RunContext {
    pub fn new<T>(integration: T) -> RunContext where T: ContextIntegration + Send + Sync + 'static {
        let identity = {
            let mut id = NEXT_IDENTITY.lock().unwrap();
            *id += 1;
            *id
        };
        debug!("new run context {}",identity);
        RunContext(Arc::new(RunContextState {
            identity,
            integration: Box::new(integration)
        }))
    }

    pub fn identity(&self) -> u64 { self.0.identity }

    /// Is the calling thread currently executing work inside this context?
    pub fn is_current(&self) -> bool {
        ENTERED.with(|entered| entered.borrow().contains(&self.0.identity))
    }

    /// Mark the calling thread as inside this context until the guard drops.
    /// Work sent via submit is bracketed like this automatically.
    pub fn enter(&self) -> ContextEntry {
        ENTERED.with(|entered| entered.borrow_mut().push(self.0.identity));
        ContextEntry(self.0.identity)
    }

    pub(crate) fn submit(&self, work: Box<dyn FnOnce() + Send + 'static>) {
        let context = self.clone();
        self.0.integration.submit(Box::new(move || {
            let _entry = context.enter();
            work();
        }));
    }
}

pub struct ContextEntry(u64);

impl Drop for ContextEntry {
    fn drop(&mut self) {
        ENTERED.with(|entered| {
            let mut entered = entered.borrow_mut();
            if let Some(index) = entered.iter().rposition(|id| *id == self.0) {
                entered.remove(index);
            }
        });
    }
}

/// Where a registered callback should run when it fires.
#[derive(Clone)]
pub enum Dispatch {
    /// Run synchronously on whichever thread triggers resolution (or, for a
    /// late registration, the registering thread).
    Inline,
    /// Submit to the given context, unless the triggering thread is already
    /// inside it, in which case run inline.
    On(RunContext)
}

impl Dispatch {
    pub fn on(context: &RunContext) -> Dispatch { Dispatch::On(context.clone()) }

    pub(crate) fn run(&self, work: Box<dyn FnOnce() + Send + 'static>) {
        match self {
            Dispatch::Inline => { work(); },
            Dispatch::On(context) => {
                if context.is_current() { work(); } else { context.submit(work); }
            }
        }
    }
}
