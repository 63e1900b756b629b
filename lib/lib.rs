pub mod build_info;
pub mod cli;
pub mod commands;
pub mod config;
pub mod item;
pub mod logging;
pub mod migration;
