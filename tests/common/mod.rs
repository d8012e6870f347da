#![allow(dead_code, unused_imports)]

pub use watchrun_test_utils::builders;
pub use watchrun_test_utils::fake_backend;
pub use watchrun_test_utils::{eventually, init_tracing, with_timeout};
