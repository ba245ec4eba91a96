pub mod config;
pub mod tail;
