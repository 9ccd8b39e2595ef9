//! Platform-specific errors

use thiserror::Error;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// No service with that name is registered
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// A service with that name is already registered
    #[error("Service already exists: {0}")]
    ServiceExists(String),

    /// The control manager refused the operation
    #[error("Access denied: {0}")]
    AccessDenied(&'static str),

    /// Event log source could not be created, removed or written
    #[error("Event log error: {0}")]
    EventLog(String),

    /// Any other failure from the service API
    #[error("Service API error: {0}")]
    ServiceApi(String),

    /// System error with code
    #[error("System error {code}: {message}")]
    SystemError {
        /// Error code
        code: u32,
        /// Error message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Platform result type
pub type Result<T> = std::result::Result<T, PlatformError>;

impl PlatformError {
    /// Build a system error from a raw OS error code
    pub fn system(code: u32) -> Self {
        #[allow(clippy::cast_possible_wrap)]
        let message = std::io::Error::from_raw_os_error(code as i32).to_string();
        Self::SystemError { code, message }
    }
}

impl From<PlatformError> for svckit_core::Error {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::ServiceNotFound(name) => svckit_core::Error::NotInstalled { name },
            PlatformError::ServiceExists(name) => svckit_core::Error::AlreadyInstalled { name },
            PlatformError::AccessDenied(operation) => {
                svckit_core::Error::PermissionDenied { operation }
            }
            PlatformError::Io(e) => svckit_core::Error::Io(e),
            other => svckit_core::Error::Registry(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_not_installed() {
        let err: svckit_core::Error = PlatformError::ServiceNotFound("Demo".into()).into();
        assert!(matches!(err, svckit_core::Error::NotInstalled { ref name } if name == "Demo"));
        assert!(err.is_soft());
    }

    #[test]
    fn test_access_denied_maps_to_permission_denied() {
        let err: svckit_core::Error = PlatformError::AccessDenied("start").into();
        assert!(matches!(
            err,
            svckit_core::Error::PermissionDenied { operation: "start" }
        ));
    }

    #[test]
    fn test_other_errors_map_to_registry() {
        let err: svckit_core::Error = PlatformError::system(1053).into();
        match err {
            svckit_core::Error::Registry(message) => assert!(message.contains("1053")),
            other => panic!("unexpected: {other}"),
        }
    }
}
