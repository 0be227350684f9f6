// tests/limiter/error_tests.rs

#[cfg(test)]
mod tests {
    use crate::fixtures::test_clock::TestClock;
    use bucket_limiter::{ClockError, LimiterError, RateLimiter, RateLimiterConfig};

    fn config() -> RateLimiterConfig {
        RateLimiterConfig::new(8, 16).bucket_count(4)
    }

    #[tokio::test]
    async fn clock_error_fails_construction() {
        let clock = TestClock::new(0.0);
        clock.fail_next_call();

        let result = RateLimiter::with_config(config(), clock);
        assert!(matches!(
            result,
            Err(LimiterError::Clock(ClockError::SystemTimeError))
        ));
    }

    #[tokio::test]
    async fn clock_error_rejects_the_dispatching_task() {
        let clock = TestClock::new(0.0);
        let limiter = RateLimiter::with_config(config(), clock.clone()).unwrap();

        clock.fail_next_call();
        let failed = limiter.enqueue(|| async { 1 });
        let recovered = limiter.enqueue(|| async { 2 });

        assert_eq!(
            failed.await,
            Err(LimiterError::Clock(ClockError::SystemTimeError))
        );
        assert_eq!(recovered.await, Ok(2));
        // only the dispatched task was counted
        assert_eq!(limiter.buckets(), vec![0, 0, 0, 1]);
    }

    #[tokio::test]
    async fn clock_error_propagates_in_wait_time() {
        let clock = TestClock::new(0.0);
        let limiter = RateLimiter::with_config(config(), clock.clone()).unwrap();

        clock.fail_next_call();
        assert!(matches!(limiter.wait_time(), Err(LimiterError::Clock(_))));
        assert!(limiter.wait_time().is_ok());
    }

    #[tokio::test]
    async fn operation_errors_pass_through_unchanged() {
        let limiter = RateLimiter::new(config()).unwrap();

        let result = limiter
            .enqueue(|| async { Err::<u32, String>("connection reset".to_string()) })
            .await;
        assert_eq!(result, Ok(Err("connection reset".to_string())));
    }

    #[tokio::test]
    async fn failed_operations_still_count_against_the_budget() {
        let limiter = RateLimiter::new(config()).unwrap();

        for _ in 0..3 {
            let _ = limiter.enqueue(|| async { Err::<(), ()>(()) }).await;
        }
        assert_eq!(limiter.buckets().iter().sum::<u64>(), 3);
    }

    #[tokio::test]
    async fn panicking_operation_does_not_stall_the_queue() {
        let limiter = RateLimiter::new(config()).unwrap();

        let failed = limiter.enqueue(|| -> std::future::Ready<u32> { panic!("boom") });
        let recovered = limiter.enqueue(|| async { 5 });

        assert_eq!(failed.await, Err(LimiterError::OperationPanicked));
        assert_eq!(recovered.await, Ok(5));
        // the panicking call was still a dispatched request
        assert_eq!(limiter.buckets(), vec![0, 0, 0, 2]);
    }

    #[tokio::test]
    async fn panicking_future_closes_only_its_own_ticket() {
        let limiter = RateLimiter::new(config()).unwrap();

        let failed = limiter.enqueue(|| async {
            if true {
                panic!("boom");
            }
            1u32
        });
        let recovered = limiter.enqueue(|| async { 2u32 });

        assert_eq!(failed.await, Err(LimiterError::Closed));
        assert_eq!(recovered.await, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_listener_does_not_stall_dispatch() {
        let limiter = RateLimiter::new(config()).unwrap();
        limiter.add_listener(|_| panic!("listener failure"));

        // the sixth dispatch engages limiting and fires the listener
        let tickets: Vec<_> = (0..8)
            .map(|index| limiter.enqueue(move || async move { index }))
            .collect();
        let mut settled = Vec::new();
        for ticket in tickets {
            settled.push(ticket.await.unwrap());
        }

        assert_eq!(settled, (0..8).collect::<Vec<_>>());
        assert!(limiter.is_limiting());
    }

    #[test]
    fn error_display_formatting() {
        let message = LimiterError::Clock(ClockError::SystemTimeError).to_string();
        assert!(message.to_lowercase().contains("clock"));
        assert!(!LimiterError::Cancelled.to_string().is_empty());
    }
}
