pub mod inbox;
pub mod push;
pub mod time;
