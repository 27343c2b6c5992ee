pub mod cli;
pub mod config;
pub mod decision;
pub mod error;
pub mod hook;
pub mod logging;
pub mod runner;
pub mod session;
pub mod stream;
