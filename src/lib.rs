pub mod archiver;
pub mod collector;
pub mod config;
pub mod db;
pub mod metrics;
pub mod report;
pub mod server;
pub mod spotify;
pub mod wrapped;

/// Application name for XDG paths
pub const APP_NAME: &str = "listening-trends";
