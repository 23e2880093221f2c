pub mod alerts;
pub mod audio;
pub mod cli;
pub mod config;
pub mod engine;
pub mod geodesy;
#[cfg(feature = "gui")]
pub mod gui;
pub mod ingestor;
pub mod labels;
pub mod logging;
pub mod notifications;
pub mod parser;
pub mod preferences;
pub mod render;
pub mod renderer;
pub mod scope;
pub mod sweep;
pub mod task_manager;
pub mod track_store;
pub mod types;
