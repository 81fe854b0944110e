pub mod answer;
pub mod event;
pub mod prize_award;
pub mod question;
pub mod quiz_session;
