pub mod discover;
pub mod export;
pub mod health;
pub mod jobs;
pub mod migrate;
pub mod report;
