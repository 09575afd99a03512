pub mod cli;
pub mod config;
pub mod events;
pub mod graph;
pub mod job;
pub mod logging;
pub mod render;
pub mod report;
pub mod session;
pub mod stock;
