//! Runtime loading of the libsox shared library

use std::path::{Path, PathBuf};

use libc::{c_char, c_int, c_void, size_t};
use libloading::Library;

use super::types::*;
use crate::error::{Result, SoxError};

/// Library names tried when no explicit path is configured.
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &[
    "libsox.so.3",
    "libsox.so",
    "/opt/homebrew/lib/libsox.dylib",
    "/usr/local/lib/libsox.dylib",
    "libsox.3.dylib",
    "libsox-3.dll",
    "libsox.dll",
];

/// Function table resolved from a loaded libsox.
///
/// The function pointers stay valid for as long as `_lib` is alive, which is
/// the lifetime of this struct.
pub struct SoxApi {
    pub sox_version: unsafe extern "C" fn() -> *const c_char,
    pub sox_init: unsafe extern "C" fn() -> c_int,
    pub sox_quit: unsafe extern "C" fn() -> c_int,
    pub sox_get_globals: unsafe extern "C" fn() -> *mut sox_globals_t,

    pub sox_open_read: unsafe extern "C" fn(
        path: *const c_char,
        signal: *const sox_signalinfo_t,
        encoding: *const sox_encodinginfo_t,
        filetype: *const c_char,
    ) -> *mut sox_format_t,
    pub sox_open_mem_read: unsafe extern "C" fn(
        buffer: *mut c_void,
        buffer_size: size_t,
        signal: *const sox_signalinfo_t,
        encoding: *const sox_encodinginfo_t,
        filetype: *const c_char,
    ) -> *mut sox_format_t,
    pub sox_open_write: unsafe extern "C" fn(
        path: *const c_char,
        signal: *const sox_signalinfo_t,
        encoding: *const sox_encodinginfo_t,
        filetype: *const c_char,
        oob: *const sox_oob_t,
        overwrite_permitted: sox_overwrite_permitted,
    ) -> *mut sox_format_t,
    pub sox_open_memstream_write: unsafe extern "C" fn(
        buffer_ptr: *mut *mut c_char,
        buffer_size_ptr: *mut size_t,
        signal: *const sox_signalinfo_t,
        encoding: *const sox_encodinginfo_t,
        filetype: *const c_char,
        oob: *const sox_oob_t,
    ) -> *mut sox_format_t,
    pub sox_read: unsafe extern "C" fn(ft: *mut sox_format_t, buf: *mut sox_sample_t, len: size_t) -> size_t,
    pub sox_write: unsafe extern "C" fn(ft: *mut sox_format_t, buf: *const sox_sample_t, len: size_t) -> size_t,
    pub sox_seek: unsafe extern "C" fn(ft: *mut sox_format_t, offset: u64, whence: c_int) -> c_int,
    pub sox_close: unsafe extern "C" fn(ft: *mut sox_format_t) -> c_int,

    pub sox_find_effect: unsafe extern "C" fn(name: *const c_char) -> *const sox_effect_handler_t,
    pub sox_get_effect_fns: unsafe extern "C" fn() -> *const sox_effect_fn_t,
    pub sox_create_effect: unsafe extern "C" fn(eh: *const sox_effect_handler_t) -> *mut sox_effect_t,
    pub sox_effect_options: unsafe extern "C" fn(
        effp: *mut sox_effect_t,
        argc: c_int,
        argv: *const *mut c_char,
    ) -> c_int,
    pub sox_create_effects_chain: unsafe extern "C" fn(
        in_enc: *const sox_encodinginfo_t,
        out_enc: *const sox_encodinginfo_t,
    ) -> *mut sox_effects_chain_t,
    pub sox_add_effect: unsafe extern "C" fn(
        chain: *mut sox_effects_chain_t,
        effp: *mut sox_effect_t,
        input: *mut sox_signalinfo_t,
        output: *const sox_signalinfo_t,
    ) -> c_int,
    pub sox_flow_effects: unsafe extern "C" fn(
        chain: *mut sox_effects_chain_t,
        callback: sox_flow_effects_callback,
        client_data: *mut c_void,
    ) -> c_int,
    pub sox_effects_clips: unsafe extern "C" fn(chain: *mut sox_effects_chain_t) -> u64,
    pub sox_delete_effects_chain: unsafe extern "C" fn(chain: *mut sox_effects_chain_t),

    path: PathBuf,
    _lib: Library,
}

/// Resolve one exported function, copying the pointer out of the symbol.
fn symbol<T: Copy>(lib: &Library, name: &str) -> Result<T> {
    let name = format!("{}\0", name);
    // SAFETY: every field of `SoxApi` declares the libsox 14.4 prototype of
    // the symbol it is resolved from.
    let symbol = unsafe { lib.get::<T>(name.as_bytes()) }
        .map_err(|e| SoxError::library(format!("missing symbol `{}`: {}", name.trim_end_matches('\0'), e)))?;
    Ok(*symbol)
}

impl SoxApi {
    /// Load libsox from `path`, or from the first of [`DEFAULT_LIBRARY_NAMES`]
    /// the dynamic loader can open.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (lib, path) = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(SoxError::library(format!("libsox not found: {}", path.display())));
                }
                (open_library(path)?, path.to_path_buf())
            }
            None => find_library()?,
        };

        log::debug!("Loaded libsox from {}", path.display());

        Ok(Self {
            sox_version: symbol(&lib, "sox_version")?,
            sox_init: symbol(&lib, "sox_init")?,
            sox_quit: symbol(&lib, "sox_quit")?,
            sox_get_globals: symbol(&lib, "sox_get_globals")?,
            sox_open_read: symbol(&lib, "sox_open_read")?,
            sox_open_mem_read: symbol(&lib, "sox_open_mem_read")?,
            sox_open_write: symbol(&lib, "sox_open_write")?,
            sox_open_memstream_write: symbol(&lib, "sox_open_memstream_write")?,
            sox_read: symbol(&lib, "sox_read")?,
            sox_write: symbol(&lib, "sox_write")?,
            sox_seek: symbol(&lib, "sox_seek")?,
            sox_close: symbol(&lib, "sox_close")?,
            sox_find_effect: symbol(&lib, "sox_find_effect")?,
            sox_get_effect_fns: symbol(&lib, "sox_get_effect_fns")?,
            sox_create_effect: symbol(&lib, "sox_create_effect")?,
            sox_effect_options: symbol(&lib, "sox_effect_options")?,
            sox_create_effects_chain: symbol(&lib, "sox_create_effects_chain")?,
            sox_add_effect: symbol(&lib, "sox_add_effect")?,
            sox_flow_effects: symbol(&lib, "sox_flow_effects")?,
            sox_effects_clips: symbol(&lib, "sox_effects_clips")?,
            sox_delete_effects_chain: symbol(&lib, "sox_delete_effects_chain")?,
            path,
            _lib: lib,
        })
    }

    /// Path or loader name the library was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for SoxApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoxApi").field("path", &self.path).finish()
    }
}

fn open_library(path: &Path) -> Result<Library> {
    // SAFETY: libsox has no load-time initialisers with preconditions.
    unsafe { Library::new(path) }
        .map_err(|e| SoxError::library(format!("failed to load {}: {}", path.display(), e)))
}

fn find_library() -> Result<(Library, PathBuf)> {
    let mut failures = Vec::new();
    for name in DEFAULT_LIBRARY_NAMES {
        // SAFETY: see `open_library`.
        match unsafe { Library::new(name) } {
            Ok(lib) => return Ok((lib, PathBuf::from(name))),
            Err(e) => failures.push(format!("{}: {}", name, e)),
        }
    }
    log::debug!("libsox lookup failed: {}", failures.join("; "));
    Err(SoxError::library("libsox not found. Install libsox or set library.path"))
}
