pub mod error;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod sources;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
