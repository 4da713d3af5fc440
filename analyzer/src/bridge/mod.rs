//! HTTP upload bridge hosting the analyzer as a service.

pub mod model;
pub mod server;
