pub mod overview;
pub mod prize;
pub mod session;
pub mod txn;
