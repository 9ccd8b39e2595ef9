//! Process elevation check

use std::{mem, ptr};

use svckit_core::PrivilegeCheck;
use winapi::um::handleapi::CloseHandle;
use winapi::um::processthreadsapi::{GetCurrentProcess, OpenProcessToken};
use winapi::um::securitybaseapi::GetTokenInformation;
use winapi::um::winnt::{TokenElevation, HANDLE, TOKEN_ELEVATION, TOKEN_QUERY};

/// Reads the elevation flag of the current process token
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenPrivilegeCheck;

impl PrivilegeCheck for TokenPrivilegeCheck {
    fn is_elevated(&self) -> bool {
        // SAFETY: the token handle is closed before returning and the
        // output buffer is a properly sized TOKEN_ELEVATION.
        unsafe {
            let mut token: HANDLE = ptr::null_mut();
            if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) == 0 {
                return false;
            }

            let mut elevation = TOKEN_ELEVATION { TokenIsElevated: 0 };
            #[allow(clippy::cast_possible_truncation)]
            let size = mem::size_of::<TOKEN_ELEVATION>() as u32;
            let mut returned = 0u32;
            let ok = GetTokenInformation(
                token,
                TokenElevation,
                ptr::addr_of_mut!(elevation).cast(),
                size,
                &mut returned,
            );
            CloseHandle(token);

            ok != 0 && elevation.TokenIsElevated != 0
        }
    }
}
