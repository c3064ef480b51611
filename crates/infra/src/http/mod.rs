//! HTTP client used by REST connectors and the configuration generator

pub mod client;

pub use client::{HttpClient, HttpClientBuilder, RetryPolicy};
