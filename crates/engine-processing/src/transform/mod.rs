pub mod options;
pub mod payload;
pub mod pricing;
pub mod taxonomy;
pub mod text;
pub mod units;
