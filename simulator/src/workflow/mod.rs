pub mod config;
pub mod runner;
pub mod session;
pub mod source;
