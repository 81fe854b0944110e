pub mod event;
pub mod jwt;
