#![allow(dead_code)]

pub use runwatch_test_utils::{builders, init_tracing, sink::RecordingSink, with_timeout};
