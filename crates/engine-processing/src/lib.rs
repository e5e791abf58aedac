pub mod error;
pub mod images;
pub mod retry;
pub mod transform;
