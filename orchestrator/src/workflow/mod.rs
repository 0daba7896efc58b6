pub mod config;
pub mod plan;
pub mod request;
pub mod runner;
