//! Effect handlers and effect instances

use std::ffi::CString;
use std::ptr::NonNull;

use libc::{c_char, c_int, c_void};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SoxError};
use crate::ffi::string_from_ptr;
use crate::ffi::types::{sox_effect_handler_t, sox_effect_t, sox_format_t};
use super::runtime::Sox;

/// Capability flags of an effect handler (`SOX_EFF_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectFlags(u32);

impl EffectFlags {
    pub const CHANNELS: u32 = 1;
    pub const RATE: u32 = 2;
    pub const PRECISION: u32 = 4;
    pub const LENGTH: u32 = 8;
    pub const MULTI_CHANNEL: u32 = 16;
    pub const NULL: u32 = 32;
    pub const DEPRECATED: u32 = 64;
    pub const GAIN: u32 = 128;
    pub const MODIFY: u32 = 256;
    pub const ALPHA: u32 = 512;
    pub const INTERNAL: u32 = 1024;

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    pub fn changes_channels(&self) -> bool {
        self.contains(Self::CHANNELS)
    }

    pub fn changes_rate(&self) -> bool {
        self.contains(Self::RATE)
    }

    pub fn is_deprecated(&self) -> bool {
        self.contains(Self::DEPRECATED)
    }

    /// Used by libsox itself, e.g. the `input` and `output` effects
    pub fn is_internal(&self) -> bool {
        self.contains(Self::INTERNAL)
    }
}

/// An effect name with its ordered option strings, e.g. `rate 22050`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl EffectSpec {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), args: Vec::new() }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Parse a whitespace separated command line such as `"vol 0.5"`
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let name = words
            .next()
            .ok_or_else(|| SoxError::invalid_argument("empty effect description"))?;
        Ok(Self::new(name).with_args(words))
    }
}

impl std::fmt::Display for EffectSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Entry in libsox's static effect registry
#[derive(Clone, Copy)]
pub struct EffectHandler<'s> {
    sox: &'s Sox,
    raw: NonNull<sox_effect_handler_t>,
}

impl<'s> EffectHandler<'s> {
    pub(crate) fn find(sox: &'s Sox, name: &str) -> Option<Self> {
        // A name with NUL cannot be registered
        let c_name = CString::new(name).ok()?;
        // SAFETY: `c_name` is NUL-terminated; the result is null or static.
        let raw = unsafe { (sox.api().sox_find_effect)(c_name.as_ptr()) };
        NonNull::new(raw as *mut sox_effect_handler_t).map(|raw| Self { sox, raw })
    }

    pub(crate) fn all(sox: &'s Sox) -> Vec<Self> {
        let mut handlers = Vec::new();
        // SAFETY: sox_get_effect_fns returns a null-terminated static array.
        let mut fns = unsafe { (sox.api().sox_get_effect_fns)() };
        if fns.is_null() {
            return handlers;
        }
        loop {
            // SAFETY: `fns` points inside the array until its terminator.
            let Some(get_handler) = (unsafe { *fns }) else { break };
            // SAFETY: registry functions return static handler structs.
            let raw = unsafe { get_handler() };
            if let Some(raw) = NonNull::new(raw as *mut sox_effect_handler_t) {
                handlers.push(Self { sox, raw });
            }
            // SAFETY: not past the terminator yet.
            fns = unsafe { fns.add(1) };
        }
        handlers
    }

    fn raw(&self) -> &sox_effect_handler_t {
        // SAFETY: handlers live in libsox's static registry.
        unsafe { self.raw.as_ref() }
    }

    pub fn name(&self) -> String {
        // SAFETY: handler names are static strings.
        unsafe { string_from_ptr(self.raw().name) }.unwrap_or_default()
    }

    /// Option synopsis, if the effect has one
    pub fn usage(&self) -> Option<String> {
        // SAFETY: as for `name`.
        unsafe { string_from_ptr(self.raw().usage) }.filter(|u| !u.is_empty())
    }

    pub fn flags(&self) -> EffectFlags {
        EffectFlags::from_bits(self.raw().flags)
    }

    /// Instantiate an unconfigured effect
    pub fn create(&self) -> Result<Effect<'s>> {
        // SAFETY: `raw` is a registry handler.
        let raw = unsafe { (self.sox.api().sox_create_effect)(self.raw.as_ptr()) };
        let raw = NonNull::new(raw)
            .ok_or_else(|| SoxError::operation(format!("Cannot create effect `{}`", self.name())))?;
        Ok(Effect {
            sox: self.sox,
            raw,
            name: self.name(),
            args: Vec::new(),
            chained: false,
        })
    }
}

impl std::fmt::Debug for EffectHandler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandler")
            .field("name", &self.name())
            .field("flags", &self.flags())
            .finish()
    }
}

/// A configurable effect instance, consumed when added to a chain
pub struct Effect<'s> {
    sox: &'s Sox,
    raw: NonNull<sox_effect_t>,
    name: String,
    // libsox effects may keep pointers into their argv
    args: Vec<CString>,
    // set once a chain holds the copy and its private state
    chained: bool,
}

impl<'s> Effect<'s> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply an ordered list of option strings.
    ///
    /// A non-zero status from the effect is returned as
    /// [`SoxError::EffectOptions`] with the code unchanged.
    pub fn set_options<S: AsRef<str>>(&mut self, args: &[S]) -> Result<()> {
        let c_args = args
            .iter()
            .map(|a| CString::new(a.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let argv: Vec<*mut c_char> = c_args.iter().map(|a| a.as_ptr() as *mut c_char).collect();
        self.apply(&argv)?;
        self.args.extend(c_args);
        Ok(())
    }

    /// Apply a single option string
    pub fn set_option(&mut self, arg: &str) -> Result<()> {
        self.set_options(&[arg])
    }

    /// Configure an `input` or `output` effect with its stream
    pub(crate) fn set_stream_option(&mut self, ft: *mut sox_format_t) -> Result<()> {
        self.apply(&[ft as *mut c_char])
    }

    fn apply(&mut self, argv: &[*mut c_char]) -> Result<()> {
        let argc = c_int::try_from(argv.len())
            .map_err(|_| SoxError::invalid_argument("too many effect options"))?;
        // SAFETY: `argv` holds `argc` pointers that outlive the call.
        let code = unsafe { (self.sox.api().sox_effect_options)(self.raw.as_ptr(), argc, argv.as_ptr()) };
        if code == 0 {
            log::debug!("Configured effect `{}` with {} option(s)", self.name, argc);
            Ok(())
        } else {
            Err(SoxError::EffectOptions { effect: self.name.clone(), code })
        }
    }

    pub(crate) fn as_ptr(&self) -> *mut sox_effect_t {
        self.raw.as_ptr()
    }

    pub(crate) fn take_args(&mut self) -> Vec<CString> {
        std::mem::take(&mut self.args)
    }

    /// The chain now owns the private state; only the shell is left to free
    pub(crate) fn mark_chained(&mut self) {
        self.chained = true;
    }
}

impl Drop for Effect<'_> {
    fn drop(&mut self) {
        let effp = self.raw.as_ptr();
        if self.chained {
            // SAFETY: allocated by sox_create_effect with the C allocator.
            unsafe { libc::free(effp as *mut c_void) };
        } else {
            log::debug!("Releasing effect `{}` that never joined a chain", self.name);
            // SAFETY: created by sox_create_effect and not shared with a chain.
            unsafe { release_unchained(effp) };
        }
    }
}

/// Free an effect that no chain took over.
///
/// `sox_delete_effect` cannot be used here: it frees the private area once
/// per flow, and `flows` is 0 before `sox_add_effect` and may exceed the
/// single allocated flow after a failed start.
///
/// # Safety
/// `effp` must come from `sox_create_effect` and must not be used afterwards.
unsafe fn release_unchained(effp: *mut sox_effect_t) {
    // SAFETY: the caller guarantees `effp` is a live effect.
    unsafe {
        if let Some(kill) = (*effp).handler.kill {
            kill(effp);
        }
        libc::free((*effp).priv_);
        libc::free((*effp).obuf as *mut c_void);
        libc::free(effp as *mut c_void);
    }
}

impl std::fmt::Debug for Effect<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}
