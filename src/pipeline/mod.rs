pub mod extract;
pub mod outcome;
pub mod validator;

pub use extract::extract_token;
pub use outcome::{Outcome, ValidationOutcome};
pub use validator::Validator;
