//! Property: a token bucket never holds more than `capacity + burst` tokens,
//! no matter how long it sits idle or what sequence of consumes hit it.

use gateway_ratelimiter::TokenBucket;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn never_exceeds_capacity_plus_burst(
        capacity in 0.0f64..50.0,
        burst in 0.0f64..20.0,
        refill_per_second in 0.1f64..100.0,
        consumes in proptest::collection::vec(0.0f64..10.0, 0..20),
    ) {
        let ceiling = capacity + burst;
        let mut bucket = TokenBucket::new(capacity, burst, refill_per_second);

        prop_assert!(bucket.peek() == (ceiling >= 1.0));

        for amount in consumes {
            bucket.try_consume(amount);
        }

        std::thread::sleep(std::time::Duration::from_millis(20));

        // However long it has refilled, it can never hand out more than the
        // ceiling in one shot.
        let over_ceiling = ceiling + 1.0;
        prop_assert!(!bucket.try_consume(over_ceiling));
    }

    #[test]
    fn reset_always_returns_to_a_full_bucket(
        capacity in 0.1f64..50.0,
        burst in 0.0f64..20.0,
        refill_per_second in 0.1f64..10.0,
        drains in 1usize..10,
    ) {
        let ceiling = capacity + burst;
        let mut bucket = TokenBucket::new(capacity, burst, refill_per_second);
        for _ in 0..drains {
            bucket.try_consume(ceiling);
        }
        bucket.reset();
        prop_assert!(bucket.try_consume(ceiling));
    }
}
