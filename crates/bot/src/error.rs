use thiserror::Error;

use warden_infra::{PlatformError, PolicyStoreError};

/// Failure of a single command.
///
/// `NotFound`, `Usage` and `NotInWorkspace` are answered to the invoker;
/// the rest abort the dispatch.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Usage(String),

    #[error("This command can only be used inside a workspace")]
    NotInWorkspace,

    #[error("persistence failed: {0}")]
    Persistence(#[from] PolicyStoreError),

    #[error("platform call failed: {0}")]
    Platform(PlatformError),
}

impl CommandError {
    pub fn module_not_found(module: &str) -> Self {
        Self::NotFound(format!("Module {module} does not exist"))
    }

    pub fn usage(usage: &str) -> Self {
        Self::Usage(format!("Usage: {usage}"))
    }

    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CommandError::NotFound(_) | CommandError::Usage(_) | CommandError::NotInWorkspace
        )
    }
}

impl From<PlatformError> for CommandError {
    fn from(value: PlatformError) -> Self {
        match value {
            PlatformError::NotFound(what) => CommandError::NotFound(format!("Could not find {what}")),
            other => CommandError::Platform(other),
        }
    }
}

/// A predicate could not be composed onto a module.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("Module {0} does not exist")]
    UnknownModule(String),
}

/// Errors surfaced by routing and dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Reading or writing the tenant's policy failed.
    #[error("persistence failed: {0}")]
    Persistence(PolicyStoreError),
    /// The platform could not be reached or answered with an error.
    #[error("platform call failed: {0}")]
    Platform(PlatformError),
    /// A command failed in a way that could not be answered to the invoker.
    #[error("command failed: {0}")]
    Command(String),
}

impl From<PolicyStoreError> for DispatchError {
    fn from(value: PolicyStoreError) -> Self {
        DispatchError::Persistence(value)
    }
}

impl From<PlatformError> for DispatchError {
    fn from(value: PlatformError) -> Self {
        DispatchError::Platform(value)
    }
}

impl From<CommandError> for DispatchError {
    fn from(value: CommandError) -> Self {
        match value {
            CommandError::Persistence(e) => DispatchError::Persistence(e),
            CommandError::Platform(e) => DispatchError::Platform(e),
            other => DispatchError::Command(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_not_found_is_answered_to_the_invoker() {
        let err = CommandError::from(PlatformError::not_found("user 7"));
        assert!(err.is_user_facing());
        assert_eq!(err.to_string(), "Could not find user 7");
    }

    #[test]
    fn persistence_failures_abort_dispatch() {
        let err = CommandError::from(PolicyStoreError::Unavailable("disk gone".to_string()));
        assert!(!err.is_user_facing());
        assert!(matches!(DispatchError::from(err), DispatchError::Persistence(_)));
    }
}
