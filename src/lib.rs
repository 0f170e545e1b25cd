pub mod catalog;
pub mod generate;
pub mod metrics;
pub mod pg;
pub mod query;
pub mod result;
pub mod server;
pub mod service;
pub mod settings;
pub mod tracing_utils;
