pub mod alert;
pub mod api;
pub mod app;
pub mod camera;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod decision;
pub mod evaluation;
pub mod images;
pub mod logging;
pub mod monitor;
pub mod preview;

#[cfg(test)]
mod stub_server;
