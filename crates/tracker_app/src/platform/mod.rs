mod app;
mod config;
mod console;
mod effects;
mod hooks;
mod logging;
mod persistence;

pub use app::run_app;
pub use config::Cli;
