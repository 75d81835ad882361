pub mod channels;
pub mod map;
pub mod position;
pub mod tile;
pub mod time;
