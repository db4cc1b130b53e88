use std::future::Future;
use std::time::Duration;

use common::{Error, Result};

/// Run an external call with an upper bound on its duration.
///
/// Expiry drops the in-flight future and yields `Error::Timeout` naming
/// `call`, so the caller's failure policy handles hangs the same way as
/// ordinary errors.
pub async fn bounded<T, F>(call: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout { call, after: limit }),
    }
}
