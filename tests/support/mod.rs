pub mod chunks;
pub mod synthetic;
