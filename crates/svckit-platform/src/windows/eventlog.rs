//! Windows event log
//!
//! Entries are written with `ReportEventW`. A source must be registered
//! under `HKLM\SYSTEM\CurrentControlSet\Services\EventLog\<log>\<source>`
//! before Event Viewer can attribute entries to it; [`install_event_source`]
//! creates that key during service installation.

use std::ptr;

use svckit_core::EventLog;
use tracing::{debug, warn};
use winapi::shared::minwindef::{DWORD, HKEY};
use winapi::shared::winerror::{ERROR_FILE_NOT_FOUND, ERROR_SUCCESS};
use winapi::um::winbase::{DeregisterEventSource, RegisterEventSourceW, ReportEventW};
use winapi::um::winnt::{
    EVENTLOG_ERROR_TYPE, EVENTLOG_INFORMATION_TYPE, EVENTLOG_WARNING_TYPE, KEY_WRITE,
    REG_DWORD, REG_EXPAND_SZ, REG_OPTION_NON_VOLATILE,
};
use winapi::um::winreg::{
    RegCloseKey, RegCreateKeyExW, RegDeleteKeyW, RegSetValueExW, HKEY_LOCAL_MACHINE,
};

use super::to_wide;
use crate::error::{PlatformError, Result};

/// Message file with a generic `%1` message for every event id
const MESSAGE_FILE: &str = r"%SystemRoot%\System32\EventCreate.exe";

/// Event id used for all entries
const EVENT_ID: DWORD = 1;

#[allow(clippy::cast_possible_truncation)]
const DWORD_SIZE: DWORD = std::mem::size_of::<DWORD>() as DWORD;

fn source_key(log_name: &str, source: &str) -> String {
    format!(r"SYSTEM\CurrentControlSet\Services\EventLog\{log_name}\{source}")
}

/// Register `source` in `log_name`. Requires elevation.
pub fn install_event_source(log_name: &str, source: &str) -> Result<()> {
    let key_path = to_wide(source_key(log_name, source));
    let mut key: HKEY = ptr::null_mut();

    // SAFETY: all strings are nul-terminated and outlive the calls; the key
    // is closed on every path after it was opened.
    unsafe {
        let status = RegCreateKeyExW(
            HKEY_LOCAL_MACHINE,
            key_path.as_ptr(),
            0,
            ptr::null_mut(),
            REG_OPTION_NON_VOLATILE,
            KEY_WRITE,
            ptr::null_mut(),
            &mut key,
            ptr::null_mut(),
        );
        if status as DWORD != ERROR_SUCCESS {
            return Err(PlatformError::EventLog(format!(
                "cannot create source '{source}': {}",
                PlatformError::system(status as DWORD)
            )));
        }

        let message_file = to_wide(MESSAGE_FILE);
        let types: DWORD =
            DWORD::from(EVENTLOG_ERROR_TYPE | EVENTLOG_WARNING_TYPE | EVENTLOG_INFORMATION_TYPE);
        let name_message_file = to_wide("EventMessageFile");
        let name_types = to_wide("TypesSupported");

        #[allow(clippy::cast_possible_truncation)]
        let mut status = RegSetValueExW(
            key,
            name_message_file.as_ptr(),
            0,
            REG_EXPAND_SZ,
            message_file.as_ptr().cast(),
            (message_file.len() * 2) as DWORD,
        );
        if status as DWORD == ERROR_SUCCESS {
            status = RegSetValueExW(
                key,
                name_types.as_ptr(),
                0,
                REG_DWORD,
                ptr::addr_of!(types).cast(),
                DWORD_SIZE,
            );
        }
        RegCloseKey(key);

        if status as DWORD != ERROR_SUCCESS {
            return Err(PlatformError::EventLog(format!(
                "cannot configure source '{source}': {}",
                PlatformError::system(status as DWORD)
            )));
        }
    }

    debug!(log = log_name, source = source, "Event source registered");
    Ok(())
}

/// Remove `source` from `log_name`. A missing source is not an error.
pub fn remove_event_source(log_name: &str, source: &str) -> Result<()> {
    let key_path = to_wide(source_key(log_name, source));

    // SAFETY: `key_path` is nul-terminated and outlives the call.
    let status = unsafe { RegDeleteKeyW(HKEY_LOCAL_MACHINE, key_path.as_ptr()) };

    match status as DWORD {
        ERROR_SUCCESS | ERROR_FILE_NOT_FOUND => {
            debug!(log = log_name, source = source, "Event source removed");
            Ok(())
        }
        code => Err(PlatformError::EventLog(format!(
            "cannot remove source '{source}': {}",
            PlatformError::system(code)
        ))),
    }
}

/// [`EventLog`] writing informational entries to the system event log
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsEventLog;

impl EventLog for WindowsEventLog {
    fn write_entry(&self, source: &str, text: &str) {
        let source_w = to_wide(source);
        let text_w = to_wide(text);
        let strings = [text_w.as_ptr()];

        // SAFETY: the handle is deregistered after use and `strings` holds
        // one valid nul-terminated string for the duration of the call.
        unsafe {
            let handle = RegisterEventSourceW(ptr::null(), source_w.as_ptr());
            if handle.is_null() {
                warn!(source = source, "Cannot open event source");
                return;
            }

            let ok = ReportEventW(
                handle,
                EVENTLOG_INFORMATION_TYPE,
                0,
                EVENT_ID,
                ptr::null_mut(),
                1,
                0,
                strings.as_ptr().cast_mut(),
                ptr::null_mut(),
            );
            DeregisterEventSource(handle);

            if ok == 0 {
                warn!(source = source, "Cannot write event log entry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_key() {
        assert_eq!(
            source_key("Application", "DemoService"),
            r"SYSTEM\CurrentControlSet\Services\EventLog\Application\DemoService"
        );
    }
}
