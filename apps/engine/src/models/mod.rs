pub mod feedback;
pub mod record;
pub mod user;

pub use feedback::{AtsFeedback, Category, Feedback, Tip, TipKind};
pub use record::{record_key, AnalysisOutcome, AnalysisRecord};
pub use user::User;
