//! HTTP request handlers.

pub mod downloads;
pub mod health;
pub mod projects;
pub mod uploads;

pub use downloads::*;
pub use health::*;
pub use projects::*;
pub use uploads::*;
