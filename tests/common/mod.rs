#![allow(unused_imports)]

pub use rewind_test_utils::*;
