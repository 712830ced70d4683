//! Configuration management and validation.

pub mod config;

pub use config::DescribeConfig;
