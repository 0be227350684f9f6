// tests/limiter/clear_tests.rs

#[cfg(test)]
mod tests {
    use bucket_limiter::{LimiterError, LimiterMode, RateLimiter, RateLimiterConfig};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn naive_config() -> RateLimiterConfig {
        RateLimiterConfig::new(3600, 3600).mode(LimiterMode::Naive)
    }

    fn counting(calls: &Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<()> + Send + 'static {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_queued_and_timed_tasks() {
        let limiter = RateLimiter::new(naive_config()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = limiter.enqueue(counting(&calls));
        let second = limiter.enqueue(counting(&calls));
        let third = limiter.enqueue(counting(&calls));

        first.await.unwrap();
        // second waits behind the timer, third is still queued
        assert_eq!(limiter.queue_length(), 2);

        limiter.clear();
        assert_eq!(limiter.queue_length(), 0);
        assert_eq!(third.await, Err(LimiterError::Cancelled));
        assert_eq!(second.await, Err(LimiterError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn limiter_keeps_working_after_clear() {
        let limiter = RateLimiter::new(naive_config()).unwrap();

        limiter.enqueue(|| async {}).await.unwrap();
        let pending = limiter.enqueue(|| async {});
        limiter.clear();
        assert_eq!(pending.await, Err(LimiterError::Cancelled));

        // requests already counted still space the next dispatch
        assert_eq!(limiter.enqueue(|| async { 7 }).await, Ok(7));
        assert_eq!(limiter.buckets().iter().sum::<u64>(), 2);
    }

    #[tokio::test]
    async fn clear_on_idle_limiter_is_harmless() {
        let limiter = RateLimiter::new(RateLimiterConfig::default()).unwrap();
        limiter.clear();
        assert_eq!(limiter.queue_length(), 0);
        assert_eq!(limiter.enqueue(|| async { "ok" }).await, Ok("ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_limiter_closes_pending_tickets() {
        let limiter = RateLimiter::new(naive_config()).unwrap();

        limiter.enqueue(|| async {}).await.unwrap();
        let pending = limiter.enqueue(|| async {});
        drop(limiter);

        assert_eq!(pending.await, Err(LimiterError::Closed));
    }
}
