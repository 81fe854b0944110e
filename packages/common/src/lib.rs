pub mod question;
pub mod retry;
pub mod selector;
pub mod session_status;

pub use question::{QuestionCategory, QuestionType};
pub use session_status::SessionStatus;
