//! Request handlers.

pub mod applicants;
pub mod health;
pub mod jobs;
pub mod requirements;

pub use applicants::*;
pub use health::*;
pub use jobs::*;
pub use requirements::*;
