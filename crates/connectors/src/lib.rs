pub mod blob;
pub mod commerce;
pub mod error;
pub mod images;
pub mod source;
