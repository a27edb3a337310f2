// scaffold - project scaffolding CLI
// Core library functionality

pub mod cli;
pub mod models;
pub mod services;
pub mod utils;
