pub mod discovery;
pub mod error;
pub mod export;
pub mod migration;
pub mod report;
