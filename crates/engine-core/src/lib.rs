pub mod config;
pub mod error;
pub mod jobs;
pub mod limiter;
pub mod retry;
pub mod state;
