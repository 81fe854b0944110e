pub mod prize;
pub mod quiz;
pub mod session;
pub mod shared;
