//!
//! This Source Code Form is subject to the terms of the Mozilla Public
//! License, v. 2.0. If a copy of the MPL was not distributed with this
//! file, You can find the complete license text at
//! https://mozilla.org/MPL/2.0/
//!
//! Copyright (c) 2024 Helix Editor Contributors

use std::future::Future;

pub use oneshot::channel as cancelation;
use tokio::sync::oneshot;

/// One half of a cancellation token pair; dropping it (or sending) signals
/// cancellation to whatever is awaiting the matching [`CancelRx`].
pub type CancelTx = oneshot::Sender<()>;
pub type CancelRx = oneshot::Receiver<()>;

/// Races `future` against cancellation, returning `None` if `cancel` fires
/// first. Biased so a cancellation that arrives at the same time as the
/// future's completion always wins - callers rely on this to guarantee a
/// cancelled request never produces a visible side effect.
pub async fn cancelable_future<T>(future: impl Future<Output = T>, cancel: CancelRx) -> Option<T> {
    tokio::select! {
        biased;
        _ = cancel => {
            None
        }
        res = future => {
            Some(res)
        }
    }
}
