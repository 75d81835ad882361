pub mod creature;
pub mod player;
