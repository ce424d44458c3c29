//! libsox FFI Module

pub mod library;
pub mod types;

pub use library::{SoxApi, DEFAULT_LIBRARY_NAMES};

use std::ffi::CStr;
use libc::c_char;

/// Copy a C string owned by libsox, `None` for a null pointer.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub(crate) unsafe fn string_from_ptr(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the function contract.
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}
