//! Raw libsox C types
//!
//! Layouts follow `sox.h` from libsox 14.4. `sox_format_t` and
//! `sox_globals_t` are allocated and owned by libsox, so they are declared
//! only up to the last field this crate reads and are only ever accessed
//! through pointers handed out by the library. Effect instances are released
//! by this crate when libsox never takes them over, so `sox_effect_t` and
//! the handler embedded in it are declared in full.

#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_uint, c_void, size_t};

pub type sox_sample_t = i32;
pub type sox_rate_t = f64;
pub type sox_bool = c_int;
pub type sox_option_t = c_int;
pub type sox_encoding_t = c_uint;

pub const SOX_SUCCESS: c_int = 0;
pub const SOX_EOF: c_int = -1;
pub const SOX_SEEK_SET: c_int = 0;

pub const SOX_SAMPLE_MAX: sox_sample_t = 0x7FFF_FFFF;
pub const SOX_SAMPLE_MIN: sox_sample_t = -0x8000_0000;

pub const SOX_MAX_NLOOPS: usize = 8;
pub const SOX_ERRSTR_LEN: usize = 256;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct sox_signalinfo_t {
    pub rate: sox_rate_t,
    pub channels: c_uint,
    pub precision: c_uint,
    pub length: u64,
    pub mult: *mut f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct sox_encodinginfo_t {
    pub encoding: sox_encoding_t,
    pub bits_per_sample: c_uint,
    pub compression: f64,
    pub reverse_bytes: sox_option_t,
    pub reverse_nibbles: sox_option_t,
    pub reverse_bits: sox_option_t,
    pub opposite_endian: sox_bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct sox_instrinfo_t {
    pub midi_note: i8,
    pub midi_low: i8,
    pub midi_hi: i8,
    pub loopmode: u8,
    pub nloops: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct sox_loopinfo_t {
    pub start: u64,
    pub length: u64,
    pub count: c_uint,
    pub kind: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct sox_oob_t {
    pub comments: *mut *mut c_char,
    pub instr: sox_instrinfo_t,
    pub loops: [sox_loopinfo_t; SOX_MAX_NLOOPS],
}

/// Leading fields of `sox_format_t`.
#[repr(C)]
pub struct sox_format_t {
    pub filename: *mut c_char,
    pub signal: sox_signalinfo_t,
    pub encoding: sox_encodinginfo_t,
    pub filetype: *mut c_char,
    pub oob: sox_oob_t,
    pub seekable: sox_bool,
    pub mode: c_char,
    pub olength: u64,
    pub clips: u64,
    pub sox_errno: c_int,
    pub sox_errstr: [c_char; SOX_ERRSTR_LEN],
}

pub type sox_effect_handler_getopts =
    Option<unsafe extern "C" fn(effp: *mut sox_effect_t, argc: c_int, argv: *mut *mut c_char) -> c_int>;
pub type sox_effect_handler_start = Option<unsafe extern "C" fn(effp: *mut sox_effect_t) -> c_int>;
pub type sox_effect_handler_flow = Option<
    unsafe extern "C" fn(
        effp: *mut sox_effect_t,
        ibuf: *const sox_sample_t,
        obuf: *mut sox_sample_t,
        isamp: *mut size_t,
        osamp: *mut size_t,
    ) -> c_int,
>;
pub type sox_effect_handler_drain =
    Option<unsafe extern "C" fn(effp: *mut sox_effect_t, obuf: *mut sox_sample_t, osamp: *mut size_t) -> c_int>;
pub type sox_effect_handler_stop = Option<unsafe extern "C" fn(effp: *mut sox_effect_t) -> c_int>;
pub type sox_effect_handler_kill = Option<unsafe extern "C" fn(effp: *mut sox_effect_t) -> c_int>;

#[repr(C)]
pub struct sox_effect_handler_t {
    pub name: *const c_char,
    pub usage: *const c_char,
    pub flags: c_uint,
    pub getopts: sox_effect_handler_getopts,
    pub start: sox_effect_handler_start,
    pub flow: sox_effect_handler_flow,
    pub drain: sox_effect_handler_drain,
    pub stop: sox_effect_handler_stop,
    /// Releases what `getopts` allocated
    pub kill: sox_effect_handler_kill,
    pub priv_size: size_t,
}

/// Leading fields of `sox_globals_t`.
#[repr(C)]
pub struct sox_globals_t {
    pub verbosity: c_uint,
    pub output_message_handler: *const c_void,
    pub repeatable: sox_bool,
    pub bufsiz: size_t,
    pub input_bufsiz: size_t,
}

/// One effect instance (one flow of it, once added to a chain)
#[repr(C)]
pub struct sox_effect_t {
    pub global_info: *mut c_void,
    pub in_signal: sox_signalinfo_t,
    pub out_signal: sox_signalinfo_t,
    pub in_encoding: *const sox_encodinginfo_t,
    pub out_encoding: *const sox_encodinginfo_t,
    pub handler: sox_effect_handler_t,
    pub clips: u64,
    pub flows: size_t,
    pub flow: size_t,
    pub priv_: *mut c_void,
    pub obuf: *mut sox_sample_t,
    pub obeg: size_t,
    pub oend: size_t,
    pub imin: size_t,
}

#[repr(C)]
pub struct sox_effects_chain_t {
    _private: [u8; 0],
}

pub type sox_effect_fn_t = Option<unsafe extern "C" fn() -> *const sox_effect_handler_t>;

pub type sox_flow_effects_callback =
    Option<unsafe extern "C" fn(all_done: sox_bool, client_data: *mut c_void) -> c_int>;

pub type sox_overwrite_permitted = Option<unsafe extern "C" fn(filename: *const c_char) -> sox_bool>;
