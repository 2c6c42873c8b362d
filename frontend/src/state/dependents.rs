/// UI state that caches per-user data and must be dropped on logout.
///
/// Calls are fire-and-forget: the session has already been cleared locally
/// by the time any of them runs.
#[cfg_attr(test, mockall::automock)]
pub trait DependentStateReset: Send + Sync {
    /// Visited/cached views (tags bar).
    fn reset_views(&self);
    fn reset_permissions(&self);
    /// Dynamic route table built from granted permissions.
    fn reset_routes(&self);
}

/// For hosts with no UI state to reset, such as the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDependents;

impl DependentStateReset for NoopDependents {
    fn reset_views(&self) {
        log::debug!("no views to reset");
    }

    fn reset_permissions(&self) {
        log::debug!("no permissions to reset");
    }

    fn reset_routes(&self) {
        log::debug!("no routes to reset");
    }
}
