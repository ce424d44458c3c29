//! Effects chains

use std::ffi::CString;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr::NonNull;

use libc::{c_int, c_void};

use crate::audio::{EncodingInfo, SignalInfo};
use crate::error::{Result, SoxError};
use crate::ffi::types::{sox_bool, sox_effects_chain_t, sox_encodinginfo_t, SOX_EOF, SOX_SUCCESS};
use super::effect::Effect;
use super::runtime::Sox;
use super::stream::{InputStream, OutputStream};

/// Returned by a progress callback to continue or abort a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Input exhausted and every effect drained
    Completed,
    /// The progress callback asked to stop
    Stopped,
}

/// An ordered, single-use chain of effects.
///
/// The chain mutably borrows the streams bound by [`add_input`] and
/// [`add_output`] until it is dropped, which deletes it.
///
/// [`add_input`]: EffectsChain::add_input
/// [`add_output`]: EffectsChain::add_output
pub struct EffectsChain<'a> {
    sox: &'a Sox,
    raw: NonNull<sox_effects_chain_t>,
    // libsox keeps pointers to both encodings for the chain's lifetime;
    // leaked from a Box and reclaimed in Drop
    encodings: NonNull<[sox_encodinginfo_t; 2]>,
    retained_args: Vec<CString>,
    names: Vec<String>,
    _streams: PhantomData<&'a mut ()>,
}

impl<'a> EffectsChain<'a> {
    /// Create an empty chain between two encodings
    pub fn new(sox: &'a Sox, input: &EncodingInfo, output: &EncodingInfo) -> Result<Self> {
        let encodings = NonNull::from(Box::leak(Box::new([input.to_raw(), output.to_raw()])));
        let first = encodings.as_ptr() as *const sox_encodinginfo_t;
        // SAFETY: both pointers address the leaked array, which the chain owns.
        let raw = unsafe { (sox.api().sox_create_effects_chain)(first, first.add(1)) };
        let Some(raw) = NonNull::new(raw) else {
            // SAFETY: leaked above and never shared.
            drop(unsafe { Box::from_raw(encodings.as_ptr()) });
            return Err(SoxError::operation("Cannot create effects chain"));
        };
        log::debug!("Created effects chain ({:?} -> {:?})", input.kind, output.kind);

        Ok(Self {
            sox,
            raw,
            encodings,
            retained_args: Vec::new(),
            names: Vec::new(),
            _streams: PhantomData,
        })
    }

    /// Names of the effects added so far, in processing order
    pub fn effect_names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Replace the output encoding for effects added from now on, e.g. once
    /// the output stream is open.
    pub fn set_output_encoding(&mut self, encoding: &EncodingInfo) {
        // SAFETY: the array is owned by the chain; libsox only reads it.
        unsafe { (*self.encodings.as_ptr())[1] = encoding.to_raw() };
    }

    /// Append an effect.
    ///
    /// `input` is the signal entering the effect; on success it is updated
    /// to the signal leaving it, ready for the next call. `output` is the
    /// signal the chain should eventually produce.
    pub fn add_effect(&mut self, mut effect: Effect<'_>, input: &mut SignalInfo, output: &SignalInfo) -> Result<()> {
        let mut raw_in = input.to_raw();
        let raw_out = output.to_raw();

        // SAFETY: chain and effect are live; the signal pointers address locals.
        let status = unsafe { (self.sox.api().sox_add_effect)(self.raw.as_ptr(), effect.as_ptr(), &mut raw_in, &raw_out) };

        let name = effect.name().to_string();
        if status != SOX_SUCCESS {
            return Err(SoxError::operation(format!("Cannot add effect `{}` to chain", name)));
        }

        effect.mark_chained();
        *input = SignalInfo::from_raw(&raw_in);
        self.retained_args.extend(effect.take_args());
        log::debug!("Added effect `{}` at position {} ({})", name, self.names.len(), input);
        self.names.push(name);
        Ok(())
    }

    /// Append libsox's `input` effect, reading from `stream`
    pub fn add_input(&mut self, stream: &'a mut InputStream<'_>, signal: &mut SignalInfo) -> Result<()> {
        let mut effect = self.sox.effect("input")?.create()?;
        effect.set_stream_option(stream.as_ptr())?;
        let out = stream.signal();
        self.add_effect(effect, signal, &out)
    }

    /// Append libsox's `output` effect, writing to `stream`
    pub fn add_output(&mut self, stream: &'a mut OutputStream<'_>, signal: &mut SignalInfo) -> Result<()> {
        let mut effect = self.sox.effect("output")?.create()?;
        effect.set_stream_option(stream.as_ptr())?;
        let out = stream.signal();
        self.add_effect(effect, signal, &out)
    }

    /// Run the chain to completion; blocks until input is exhausted.
    pub fn flow(&mut self) -> Result<()> {
        log::info!("Flowing chain: {}", self.names.join(" -> "));
        // SAFETY: chain is live; no callback is installed.
        let status = unsafe { (self.sox.api().sox_flow_effects)(self.raw.as_ptr(), None, std::ptr::null_mut()) };
        if status == SOX_SUCCESS {
            Ok(())
        } else {
            Err(SoxError::operation(format!("Effects chain failed (status {})", status)))
        }
    }

    /// Run the chain, calling `progress` between buffers.
    ///
    /// The callback receives `true` once every effect has drained. Returning
    /// [`FlowControl::Stop`] ends the flow early; a panic in the callback also
    /// stops it and is reported as an error.
    pub fn flow_with_progress<F>(&mut self, progress: F) -> Result<FlowOutcome>
    where
        F: FnMut(bool) -> FlowControl,
    {
        log::info!("Flowing chain with progress: {}", self.names.join(" -> "));
        let mut state = ProgressState {
            callback: progress,
            stopped: false,
            panicked: false,
        };

        // SAFETY: `state` outlives the call and matches the trampoline's type.
        let status = unsafe {
            (self.sox.api().sox_flow_effects)(
                self.raw.as_ptr(),
                Some(progress_trampoline::<F>),
                &mut state as *mut ProgressState<F> as *mut c_void,
            )
        };

        if state.panicked {
            return Err(SoxError::operation("Progress callback panicked; flow aborted"));
        }
        if state.stopped {
            log::info!("Flow stopped by progress callback");
            return Ok(FlowOutcome::Stopped);
        }
        if status == SOX_SUCCESS {
            Ok(FlowOutcome::Completed)
        } else {
            Err(SoxError::operation(format!("Effects chain failed (status {})", status)))
        }
    }

    /// Samples clipped by the chain's effects
    pub fn clips(&self) -> u64 {
        // SAFETY: chain is live.
        unsafe { (self.sox.api().sox_effects_clips)(self.raw.as_ptr()) }
    }

    /// Delete the chain now rather than at end of scope
    pub fn delete(self) {}
}

impl Drop for EffectsChain<'_> {
    fn drop(&mut self) {
        // SAFETY: created by sox_create_effects_chain and deleted once.
        unsafe { (self.sox.api().sox_delete_effects_chain)(self.raw.as_ptr()) };
        // SAFETY: leaked in `new`; libsox no longer refers to it.
        drop(unsafe { Box::from_raw(self.encodings.as_ptr()) });
        log::debug!("Deleted effects chain of {} effect(s)", self.names.len());
    }
}

impl std::fmt::Debug for EffectsChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectsChain").field("effects", &self.names).finish()
    }
}

struct ProgressState<F> {
    callback: F,
    stopped: bool,
    panicked: bool,
}

unsafe extern "C" fn progress_trampoline<F>(all_done: sox_bool, client_data: *mut c_void) -> c_int
where
    F: FnMut(bool) -> FlowControl,
{
    // SAFETY: `client_data` is the `ProgressState<F>` passed by flow_with_progress.
    let state = unsafe { &mut *(client_data as *mut ProgressState<F>) };
    let callback = &mut state.callback;
    match catch_unwind(AssertUnwindSafe(|| callback(all_done != 0))) {
        Ok(FlowControl::Continue) => SOX_SUCCESS,
        Ok(FlowControl::Stop) => {
            state.stopped = true;
            SOX_EOF
        }
        Err(_) => {
            state.panicked = true;
            SOX_EOF
        }
    }
}
