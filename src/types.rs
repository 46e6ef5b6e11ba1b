pub mod model;
pub mod push;
