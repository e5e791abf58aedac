pub mod checkpoint;
pub mod image;
pub mod job;
pub mod mapping;
pub mod payload;
pub mod record;
