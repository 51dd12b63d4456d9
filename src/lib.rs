pub mod builder;
pub mod cli;
pub mod config;
pub mod constants;
pub mod descriptor;
pub mod exec;
pub mod retry;
pub mod service;

pub use anyhow::Result;
