// tests/limiter/fixtures/mod.rs

pub mod test_clock;
