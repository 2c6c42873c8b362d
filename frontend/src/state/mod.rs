pub mod dependents;
pub mod session;

pub use dependents::{DependentStateReset, NoopDependents};
pub use session::{SessionDeps, SessionError, SessionManager, SessionState, SessionStatus};
