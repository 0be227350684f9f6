// tests/limiter/main.rs

// test modules
mod clear_tests;
mod error_tests;
mod fixtures;
