pub mod health;
pub mod prize;
pub mod quiz;
pub mod session;
