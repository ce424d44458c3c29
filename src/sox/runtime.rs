//! libsox library lifetime
//!
//! [`Sox`] brackets every other call: creating it loads the library and runs
//! `sox_init`, dropping it runs `sox_quit`. Stream, effect and chain handles
//! borrow it, so none of them can outlive the bracket.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::LibraryConfig;
use crate::error::{Result, SoxError};
use crate::ffi::types::SOX_SUCCESS;
use crate::ffi::{string_from_ptr, SoxApi};
use super::effect::EffectHandler;

/// libsox keeps process-wide state, so only one bracket may be open.
static ACTIVE: AtomicBool = AtomicBool::new(false);

pub struct Sox {
    api: SoxApi,
    active: bool,
    // libsox globals are unsynchronised
    _not_send: PhantomData<*const ()>,
}

impl Sox {
    /// Load libsox and initialise it
    pub fn init(config: &LibraryConfig) -> Result<Self> {
        if ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SoxError::AlreadyInitialized);
        }

        match Self::start(config) {
            Ok(sox) => Ok(sox),
            Err(e) => {
                ACTIVE.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    fn start(config: &LibraryConfig) -> Result<Self> {
        config.validate()?;
        let api = SoxApi::load(config.path.as_deref())?;

        // SAFETY: no other libsox call is in flight; guarded by ACTIVE.
        if unsafe { (api.sox_init)() } != SOX_SUCCESS {
            return Err(SoxError::library("sox_init failed"));
        }

        let sox = Self {
            api,
            active: true,
            _not_send: PhantomData,
        };
        sox.apply_globals(config);

        log::info!("libsox {} initialised from {}", sox.version(), sox.api.path().display());
        Ok(sox)
    }

    fn apply_globals(&self, config: &LibraryConfig) {
        // SAFETY: sox_get_globals returns libsox's static globals struct.
        let globals = unsafe { (self.api.sox_get_globals)() };
        if globals.is_null() {
            log::warn!("sox_get_globals returned null; keeping library defaults");
            return;
        }
        // SAFETY: non-null, and only the leading fields declared in
        // `sox_globals_t` are written.
        unsafe {
            (*globals).verbosity = config.verbosity;
            (*globals).bufsiz = config.buffer_size;
        }
        log::debug!("libsox globals: verbosity={}, bufsiz={}", config.verbosity, config.buffer_size);
    }

    /// libsox version, "major.minor.revision"
    pub fn version(&self) -> String {
        // SAFETY: sox_version returns a static string.
        unsafe { string_from_ptr((self.api.sox_version)()) }.unwrap_or_default()
    }

    /// Where the library was loaded from
    pub fn library_path(&self) -> &Path {
        self.api.path()
    }

    /// Look up an effect handler by name
    pub fn find_effect(&self, name: &str) -> Option<EffectHandler<'_>> {
        EffectHandler::find(self, name)
    }

    /// Like [`find_effect`](Self::find_effect), but not-found is an error
    pub fn effect(&self, name: &str) -> Result<EffectHandler<'_>> {
        self.find_effect(name)
            .ok_or_else(|| SoxError::effect_not_found(name))
    }

    /// Every effect handler libsox was built with
    pub fn effects(&self) -> Vec<EffectHandler<'_>> {
        EffectHandler::all(self)
    }

    /// End the bracket explicitly, reporting `sox_quit`'s status
    pub fn quit(mut self) -> Result<()> {
        self.shutdown()
    }

    pub(crate) fn api(&self) -> &SoxApi {
        &self.api
    }

    fn shutdown(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        // SAFETY: every handle borrowing `self` has been dropped.
        let status = unsafe { (self.api.sox_quit)() };
        ACTIVE.store(false, Ordering::Release);
        log::debug!("libsox shut down (status {})", status);

        if status == SOX_SUCCESS {
            Ok(())
        } else {
            Err(SoxError::operation(format!("sox_quit failed with status {}", status)))
        }
    }
}

impl Drop for Sox {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("{}", e);
        }
    }
}

impl std::fmt::Debug for Sox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sox")
            .field("library", &self.api.path())
            .field("active", &self.active)
            .finish()
    }
}

/// Whether a [`Sox`] bracket is currently open in this process
pub fn is_initialized() -> bool {
    ACTIVE.load(Ordering::Acquire)
}
