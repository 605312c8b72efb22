pub mod error;
pub mod feedback;
pub mod gateway;
pub mod prompts;
pub mod session;
pub mod topic;

pub use error::TutorError;
pub use session::{SessionController, SessionState};
