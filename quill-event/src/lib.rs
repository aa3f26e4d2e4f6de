//! `quill-event` provides the small set of async primitives every other
//! completion-core crate is built on: a debounced event-hook runner and a
//! cooperative cancellation token. Nothing here is specific to completions;
//! it exists so that `quill-trigger`, `quill-retrieval` and `quill-client`
//! can all cancel and debounce work the same way instead of each rolling
//! their own timer bookkeeping.

mod cancel;
mod debounce;

pub use cancel::{cancelable_future, cancelation, CancelRx, CancelTx};
pub use debounce::{send_blocking, AsyncHook};
