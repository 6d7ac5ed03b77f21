use std::time::Duration;

use thiserror::Error;

/// Failure of a model-backed capability (ASR, translation, emotion, language
/// detection).
///
/// Callers decide whether the failure degrades or aborts; the type itself only
/// records what went wrong.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("capability timed out after {0:?}")]
    Timeout(Duration),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("detector failed: {0}")]
    Detector(String),
}

/// Run `fut` with an upper bound on its duration, mapping an elapsed deadline
/// to [`CapabilityError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, CapabilityError>
where
    F: std::future::Future<Output = Result<T, CapabilityError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(CapabilityError::Timeout(limit)),
    }
}

/// Turn a non-success HTTP response into [`CapabilityError::Status`].
pub(crate) async fn check_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, CapabilityError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(CapabilityError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_is_a_timeout() {
        let res: Result<(), _> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(res, Err(CapabilityError::Timeout(d)) if d == Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn inner_result_passes_through() {
        let res = with_timeout(Duration::from_secs(1), async { Ok::<_, CapabilityError>(7) }).await;
        assert_eq!(res.unwrap(), 7);
    }
}
