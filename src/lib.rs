pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod models;
pub mod settings;
pub mod speech;
pub mod tokenizer;
pub mod tooltip;
pub mod translation;
pub mod ui;
