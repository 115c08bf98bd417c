use crate::error::ApiError;

/// Checks an email-keyed rate limit stored in Redis.
///
/// Uses the INCR + EXPIRE strategy:
/// - Increments a counter for `key`
/// - On first increment, sets TTL to `window_secs`
/// - Returns 429 if counter exceeds `max_attempts`
///
/// Without a Redis connection every attempt is allowed.
pub async fn check_rate_limit(
    redis: Option<&redis::aio::MultiplexedConnection>,
    key: &str,
    max_attempts: u64,
    window_secs: u64,
) -> Result<(), ApiError> {
    let Some(redis) = redis else {
        return Ok(());
    };
    let mut redis = redis.clone();

    let count: u64 = match redis::cmd("INCR").arg(key).query_async(&mut redis).await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("Rate limit check skipped, Redis error: {}", e);
            return Ok(());
        }
    };

    if count == 1 {
        // Set TTL only on first increment to avoid resetting the window on each attempt
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(window_secs)
            .query_async(&mut redis)
            .await;
    }

    if count > max_attempts {
        return Err(ApiError::TooManyRequests);
    }

    Ok(())
}
