pub mod config;
pub mod delete;
pub mod wait;
