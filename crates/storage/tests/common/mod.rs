pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{byte_stream, failing_stream, seeded_bytes};
