#[macro_use]
extern crate tracing;

pub mod http;
pub mod signal;
