pub mod pipeline;
pub mod resolver;
