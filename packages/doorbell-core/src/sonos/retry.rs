//! Retry logic for transient SOAP errors.
//!
//! Sonos answers with faults 701/714/716 while a transport is still
//! switching sources; those calls succeed a moment later.

use std::time::Duration;

use crate::sonos::soap::{SoapError, SoapResult};

/// Retry delays for transient SOAP errors (exponential backoff).
const RETRY_DELAYS_MS: [u64; 3] = [200, 500, 1000];

/// Executes a SOAP request, retrying transient faults and timeouts with
/// backoff (200ms, 500ms, 1000ms).
///
/// # Arguments
/// * `action` - Action name for logging
/// * `operation` - Closure that performs the SOAP request
pub(crate) async fn with_retry<F, Fut>(action: &str, mut operation: F) -> SoapResult<String>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = SoapResult<String>>,
{
    let mut last_error: Option<SoapError> = None;
    for (attempt, &delay_ms) in std::iter::once(&0)
        .chain(RETRY_DELAYS_MS.iter())
        .enumerate()
    {
        if attempt > 0 {
            log::info!(
                "[Sonos] Retrying {} (attempt {}/{}) after {}ms",
                action,
                attempt + 1,
                RETRY_DELAYS_MS.len() + 1,
                delay_ms
            );
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        match operation().await {
            Ok(r) => return Ok(r),
            Err(e) if e.is_transient() => {
                log::warn!("[Sonos] {} transient error: {}", action, e);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or(SoapError::Parse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_transient_faults_until_success() {
        let calls = AtomicUsize::new(0);
        let result = with_retry("Play", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(SoapError::Fault("UPnPError (UPnP error 701)".into()))
                } else {
                    Ok("ok".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.ok().as_deref(), Some("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_fault_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result = with_retry("Play", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SoapError::Fault("UPnPError (UPnP error 402)".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_all_delays() {
        let calls = AtomicUsize::new(0);
        let result = with_retry("Play", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SoapError::Fault("Transition not available".into())) }
        })
        .await;

        assert!(matches!(result, Err(SoapError::Fault(_))));
        assert_eq!(calls.load(Ordering::SeqCst), RETRY_DELAYS_MS.len() + 1);
    }
}
