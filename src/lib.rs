pub mod cli;
pub mod config;
pub mod distances;
pub mod engine;
pub mod error;
pub mod export;
pub mod filter;
pub mod metrics;
pub mod models;
pub mod source;
