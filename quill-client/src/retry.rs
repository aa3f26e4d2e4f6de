use std::future::Future;
use std::time::Duration;

use crate::error::{ClientError, ClientErrorKind};

/// Up to 2 retries on [`ClientErrorKind::Network`], exponential backoff
/// capped at 2s, only when the caller has marked the request idempotent
/// `Provider` and `Protocol` errors never retry.
const MAX_RETRIES: u32 = 2;
const BASE_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(2);

pub(crate) async fn with_retry<T, F, Fut>(idempotent: bool, mut attempt: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut tries = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if idempotent && err.kind() == ClientErrorKind::Network && tries < MAX_RETRIES => {
                let backoff = (BASE_BACKOFF * 2u32.pow(tries)).min(MAX_BACKOFF);
                log::warn!("completion request failed ({err}), retrying in {backoff:?}");
                tokio::time::sleep(backoff).await;
                tries += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
