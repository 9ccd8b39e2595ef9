//! Windows implementations of the service collaborators

mod eventlog;
mod privilege;
mod scm;

pub use eventlog::{install_event_source, remove_event_source, WindowsEventLog};
pub use privilege::TokenPrivilegeCheck;
pub use scm::WindowsServiceRegistry;

use std::ffi::OsStr;
use std::iter;
use std::os::windows::ffi::OsStrExt;

use winapi::shared::winerror::{
    ERROR_ACCESS_DENIED, ERROR_SERVICE_DOES_NOT_EXIST, ERROR_SERVICE_EXISTS,
};

use crate::error::PlatformError;

/// Nul-terminated UTF-16 copy of `s`
pub(crate) fn to_wide(s: impl AsRef<OsStr>) -> Vec<u16> {
    s.as_ref().encode_wide().chain(iter::once(0)).collect()
}

/// Classify a `windows-service` failure for service `name`
pub(crate) fn map_service_error(
    err: windows_service::Error,
    name: &str,
    operation: &'static str,
) -> PlatformError {
    match err {
        windows_service::Error::Winapi(io) => match io.raw_os_error() {
            #[allow(clippy::cast_sign_loss)]
            Some(code) => match code as u32 {
                ERROR_SERVICE_DOES_NOT_EXIST => PlatformError::ServiceNotFound(name.to_string()),
                ERROR_SERVICE_EXISTS => PlatformError::ServiceExists(name.to_string()),
                ERROR_ACCESS_DENIED => PlatformError::AccessDenied(operation),
                other => PlatformError::system(other),
            },
            None => PlatformError::Io(io),
        },
        other => PlatformError::ServiceApi(other.to_string()),
    }
}
