#[macro_use]
extern crate lazy_static;

mod cell {
    pub(crate) mod callbackset;
    pub(crate) mod settlecell;
}

mod combine {
    pub(crate) mod all;
    pub(crate) mod any;
    pub(crate) mod arity;
}

mod handle {
    pub(crate) mod future;
    pub(crate) mod promise;
}

mod integration {
    pub(crate) mod looppump;
    pub(crate) mod runcontext;
    pub(crate) mod submit;
    pub(crate) mod testintegration;
}

mod error;

pub use crate::combine::all::all;
pub use crate::combine::any::any;
pub use crate::combine::arity::{ all2, all3, all4, any2, any3, any4 };
pub use crate::error::{ Fault, FutureError };
pub use crate::handle::future::Future;
pub use crate::handle::promise::Promise;
pub use crate::integration::looppump::{ LoopPump, PumpBinding, bind_loop_pump };
pub use crate::integration::runcontext::{ ContextEntry, ContextIntegration, Dispatch, RunContext };
pub use crate::integration::submit::submit;
pub use crate::integration::testintegration::{ QueueIntegration, ThreadIntegration };
