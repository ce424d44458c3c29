//! Decoding and encoding sessions
//!
//! [`InputStream`] and [`OutputStream`] wrap a libsox `sox_format_t`. Closing
//! consumes the handle, so use-after-close and double close cannot be
//! expressed; a handle that is simply dropped is closed by `Drop`.

use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr::{self, NonNull};

use libc::{c_char, c_void, size_t};
use serde::{Deserialize, Serialize};

use crate::audio::{EncodingInfo, Sample, SampleBuffer, SignalInfo};
use crate::error::{Result, SoxError};
use crate::ffi::types::{sox_format_t, SOX_SEEK_SET, SOX_SUCCESS};
use super::runtime::Sox;

/// Hints for opening a decoding session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadOptions {
    /// Known signal, or `None` to let libsox infer it
    #[serde(default)]
    pub signal: Option<SignalInfo>,
    #[serde(default)]
    pub encoding: Option<EncodingInfo>,
    /// File type such as "wav" or "raw", or `None` to auto-detect
    #[serde(default)]
    pub filetype: Option<String>,
}

impl ReadOptions {
    pub fn with_signal(mut self, signal: SignalInfo) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_filetype<S: Into<String>>(mut self, filetype: S) -> Self {
        self.filetype = Some(filetype.into());
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingInfo) -> Self {
        self.encoding = Some(encoding);
        self
    }
}

/// Parameters for opening an encoding session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOptions {
    pub signal: SignalInfo,
    #[serde(default)]
    pub encoding: Option<EncodingInfo>,
    /// File type, or `None` to derive it from the path extension
    #[serde(default)]
    pub filetype: Option<String>,
}

impl WriteOptions {
    pub fn new(signal: SignalInfo) -> Self {
        Self {
            signal,
            encoding: None,
            filetype: None,
        }
    }

    /// Same signal as an open input
    pub fn like(input: &InputStream<'_>) -> Self {
        Self::new(input.signal())
    }

    pub fn with_filetype<S: Into<String>>(mut self, filetype: S) -> Self {
        self.filetype = Some(filetype.into());
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingInfo) -> Self {
        self.encoding = Some(encoding);
        self
    }
}

/// An open `sox_format_t`
struct Format<'s> {
    sox: &'s Sox,
    ft: NonNull<sox_format_t>,
    open: bool,
    label: String,
}

impl<'s> Format<'s> {
    fn new(sox: &'s Sox, ft: *mut sox_format_t, label: String) -> Option<Self> {
        NonNull::new(ft).map(|ft| Self { sox, ft, open: true, label })
    }

    fn raw(&self) -> &sox_format_t {
        // SAFETY: `ft` is live until `close`, which requires `&mut self`.
        unsafe { self.ft.as_ref() }
    }

    fn signal(&self) -> SignalInfo {
        SignalInfo::from_raw(&self.raw().signal)
    }

    fn encoding(&self) -> EncodingInfo {
        EncodingInfo::from_raw(&self.raw().encoding)
    }

    fn clips(&self) -> u64 {
        self.raw().clips
    }

    /// Last error libsox recorded on this handle, if any
    fn last_error(&self) -> Option<String> {
        let raw = &self.raw().sox_errstr;
        // SAFETY: c_char and u8 have the same size and alignment.
        let bytes = unsafe { std::slice::from_raw_parts(raw.as_ptr() as *const u8, raw.len()) };
        CStr::from_bytes_until_nul(bytes)
            .ok()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
    }

    fn failure(&self, what: &str) -> SoxError {
        match self.last_error() {
            Some(detail) => SoxError::operation(format!("{} failed on {}: {}", what, self.label, detail)),
            None => SoxError::operation(format!("{} failed on {}", what, self.label)),
        }
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        // SAFETY: `ft` came from a sox_open_* call and is closed exactly once.
        let status = unsafe { (self.sox.api().sox_close)(self.ft.as_ptr()) };
        log::debug!("Closed {} (status {})", self.label, status);
        if status == SOX_SUCCESS {
            Ok(())
        } else {
            Err(SoxError::operation(format!("close failed on {} (status {})", self.label, status)))
        }
    }
}

impl Drop for Format<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("{}", e);
        }
    }
}

/// A decoding session
pub struct InputStream<'s> {
    format: Format<'s>,
    // Backing bytes of a memory read; dropped after `format`
    _source: Option<Vec<u8>>,
}

impl<'s> InputStream<'s> {
    pub fn signal(&self) -> SignalInfo {
        self.format.signal()
    }

    pub fn encoding(&self) -> EncodingInfo {
        self.format.encoding()
    }

    /// Path or "<memory>"
    pub fn label(&self) -> &str {
        &self.format.label
    }

    /// Decode up to `buf.len()` samples; 0 means end of stream.
    pub fn read(&mut self, buf: &mut [Sample]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        // SAFETY: `buf` is valid for `buf.len()` writes.
        unsafe { (self.format.sox.api().sox_read)(self.format.ft.as_ptr(), buf.as_mut_ptr(), buf.len()) }
    }

    /// Fill `buffer` from the stream; 0 means end of stream.
    pub fn read_into(&mut self, buffer: &mut SampleBuffer) -> usize {
        let read = self.read(buffer.storage_mut());
        buffer.set_len(read);
        read
    }

    /// Position the reader at an absolute sample offset
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        // SAFETY: `ft` is open.
        let status = unsafe { (self.format.sox.api().sox_seek)(self.format.ft.as_ptr(), offset, SOX_SEEK_SET) };
        if status == SOX_SUCCESS {
            Ok(())
        } else {
            Err(self.format.failure(&format!("seek to {}", offset)))
        }
    }

    pub fn close(mut self) -> Result<()> {
        self.format.close()
    }

    pub(crate) fn as_ptr(&self) -> *mut sox_format_t {
        self.format.ft.as_ptr()
    }
}

impl std::fmt::Debug for InputStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStream")
            .field("label", &self.format.label)
            .field("signal", &self.signal())
            .finish()
    }
}

/// Destination of `open_memstream`, updated by libsox as it writes.
struct MemorySink {
    buffer: *mut c_char,
    size: size_t,
}

impl MemorySink {
    fn take(&mut self) -> Vec<u8> {
        if self.buffer.is_null() {
            return Vec::new();
        }
        // SAFETY: after sox_close, `buffer` holds `size` initialised bytes.
        let bytes = unsafe { std::slice::from_raw_parts(self.buffer as *const u8, self.size) }.to_vec();
        self.release();
        bytes
    }

    fn release(&mut self) {
        if !self.buffer.is_null() {
            // SAFETY: allocated by the C runtime's open_memstream.
            unsafe { libc::free(self.buffer as *mut c_void) };
            self.buffer = ptr::null_mut();
            self.size = 0;
        }
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        self.release();
    }
}

/// An encoding session
pub struct OutputStream<'s> {
    format: Format<'s>,
    // Boxed so libsox can hold its address; dropped after `format`
    sink: Option<Box<MemorySink>>,
}

impl<'s> OutputStream<'s> {
    pub fn signal(&self) -> SignalInfo {
        self.format.signal()
    }

    pub fn encoding(&self) -> EncodingInfo {
        self.format.encoding()
    }

    pub fn label(&self) -> &str {
        &self.format.label
    }

    /// Samples clipped while encoding so far
    pub fn clips(&self) -> u64 {
        self.format.clips()
    }

    /// Encode samples, returning how many libsox accepted.
    ///
    /// A count below `buf.len()` is a failure the caller must handle; see
    /// [`write_all`](Self::write_all).
    pub fn write(&mut self, buf: &[Sample]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        // SAFETY: `buf` is valid for `buf.len()` reads.
        unsafe { (self.format.sox.api().sox_write)(self.format.ft.as_ptr(), buf.as_ptr(), buf.len()) }
    }

    pub fn write_all(&mut self, buf: &[Sample]) -> Result<()> {
        let written = self.write(buf);
        if written == buf.len() {
            Ok(())
        } else {
            if let Some(detail) = self.format.last_error() {
                log::warn!("Short write on {}: {}", self.format.label, detail);
            }
            Err(SoxError::ShortWrite { requested: buf.len(), written })
        }
    }

    pub fn close(mut self) -> Result<()> {
        self.format.close()
    }

    /// Close a memory-stream output and return the encoded bytes
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        self.format.close()?;
        match self.sink.as_mut() {
            Some(sink) => Ok(sink.take()),
            None => Err(SoxError::invalid_argument(format!(
                "{} is not a memory stream", self.format.label
            ))),
        }
    }

    pub(crate) fn as_ptr(&self) -> *mut sox_format_t {
        self.format.ft.as_ptr()
    }
}

impl std::fmt::Debug for OutputStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("label", &self.format.label)
            .field("signal", &self.signal())
            .field("memory", &self.sink.is_some())
            .finish()
    }
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    let s = path
        .to_str()
        .ok_or_else(|| SoxError::invalid_argument(format!("path is not valid UTF-8: {}", path.display())))?;
    Ok(CString::new(s)?)
}

fn optional_cstring(value: Option<&str>) -> Result<Option<CString>> {
    value.map(CString::new).transpose().map_err(SoxError::from)
}

fn ptr_or_null<T>(value: Option<&T>) -> *const T {
    value.map_or(ptr::null(), |v| v as *const T)
}

impl Sox {
    /// Open a file for decoding
    pub fn open_read<P: AsRef<Path>>(&self, path: P, options: &ReadOptions) -> Result<InputStream<'_>> {
        let path = path.as_ref();
        if let Some(signal) = &options.signal {
            signal.validate()?;
        }
        let c_path = path_to_cstring(path)?;
        let filetype = optional_cstring(options.filetype.as_deref())?;
        let signal = options.signal.map(SignalInfo::to_raw);
        let encoding = options.encoding.map(EncodingInfo::to_raw);

        // SAFETY: all pointers are null or point to live locals.
        let ft = unsafe {
            (self.api().sox_open_read)(
                c_path.as_ptr(),
                ptr_or_null(signal.as_ref()),
                ptr_or_null(encoding.as_ref()),
                filetype.as_ref().map_or(ptr::null(), |f| f.as_ptr()),
            )
        };

        let format = Format::new(self, ft, path.display().to_string())
            .ok_or_else(|| SoxError::open(format!("Cannot open {} for reading", path.display())))?;
        log::debug!("Opened {} for reading: {}", format.label, format.signal());
        Ok(InputStream { format, _source: None })
    }

    /// Open an in-memory buffer for decoding. The stream owns the bytes.
    pub fn open_mem_read(&self, bytes: Vec<u8>, options: &ReadOptions) -> Result<InputStream<'_>> {
        if bytes.is_empty() {
            return Err(SoxError::invalid_argument("memory buffer is empty"));
        }
        if let Some(signal) = &options.signal {
            signal.validate()?;
        }
        let mut bytes = bytes;
        let filetype = optional_cstring(options.filetype.as_deref())?;
        let signal = options.signal.map(SignalInfo::to_raw);
        let encoding = options.encoding.map(EncodingInfo::to_raw);

        // SAFETY: the heap buffer of `bytes` moves into the stream with it and
        // outlives the handle.
        let ft = unsafe {
            (self.api().sox_open_mem_read)(
                bytes.as_mut_ptr() as *mut c_void,
                bytes.len(),
                ptr_or_null(signal.as_ref()),
                ptr_or_null(encoding.as_ref()),
                filetype.as_ref().map_or(ptr::null(), |f| f.as_ptr()),
            )
        };

        let format = Format::new(self, ft, "<memory>".to_string())
            .ok_or_else(|| SoxError::open(format!("Cannot decode {} byte memory buffer", bytes.len())))?;
        log::debug!("Opened memory buffer ({} bytes) for reading: {}", bytes.len(), format.signal());
        Ok(InputStream { format, _source: Some(bytes) })
    }

    /// Open a file for encoding
    pub fn open_write<P: AsRef<Path>>(&self, path: P, options: &WriteOptions) -> Result<OutputStream<'_>> {
        let path = path.as_ref();
        options.signal.validate()?;
        let c_path = path_to_cstring(path)?;
        let filetype = optional_cstring(options.filetype.as_deref())?;
        let signal = options.signal.to_raw();
        let encoding = options.encoding.map(EncodingInfo::to_raw);

        // SAFETY: all pointers are null or point to live locals; a null
        // overwrite callback permits overwriting.
        let ft = unsafe {
            (self.api().sox_open_write)(
                c_path.as_ptr(),
                &signal,
                ptr_or_null(encoding.as_ref()),
                filetype.as_ref().map_or(ptr::null(), |f| f.as_ptr()),
                ptr::null(),
                None,
            )
        };

        let format = Format::new(self, ft, path.display().to_string())
            .ok_or_else(|| SoxError::open(format!("Cannot open {} for writing", path.display())))?;
        log::debug!("Opened {} for writing: {}", format.label, format.signal());
        Ok(OutputStream { format, sink: None })
    }

    /// Open a growable memory stream for encoding; collect it with
    /// [`OutputStream::into_bytes`]. A file type is required.
    pub fn open_memstream_write(&self, options: &WriteOptions) -> Result<OutputStream<'_>> {
        options.signal.validate()?;
        let filetype = match options.filetype.as_deref() {
            Some(filetype) => CString::new(filetype)?,
            None => return Err(SoxError::invalid_argument("memory output needs a file type")),
        };
        let signal = options.signal.to_raw();
        let encoding = options.encoding.map(EncodingInfo::to_raw);
        let mut sink = Box::new(MemorySink { buffer: ptr::null_mut(), size: 0 });

        // SAFETY: `sink` is boxed and moves into the stream, so the two
        // out-pointers stay valid until the handle is closed.
        let ft = unsafe {
            (self.api().sox_open_memstream_write)(
                &mut sink.buffer,
                &mut sink.size,
                &signal,
                ptr_or_null(encoding.as_ref()),
                filetype.as_ptr(),
                ptr::null(),
            )
        };

        let format = Format::new(self, ft, "<memory>".to_string())
            .ok_or_else(|| SoxError::open("Cannot open memory stream for writing"))?;
        log::debug!("Opened memory stream for writing: {}", format.signal());
        Ok(OutputStream { format, sink: Some(sink) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_options_builder() {
        let options = WriteOptions::new(SignalInfo::new(44100, 2, 16))
            .with_filetype("wav")
            .with_encoding(EncodingInfo::new(crate::audio::EncodingKind::SignedInteger, 16));
        assert_eq!(options.filetype.as_deref(), Some("wav"));
        assert_eq!(options.encoding.map(|e| e.bits_per_sample), Some(16));
    }

    #[test]
    fn test_read_options_default_infers_everything() {
        let options = ReadOptions::default();
        assert!(options.signal.is_none());
        assert!(options.encoding.is_none());
        assert!(options.filetype.is_none());
    }

    #[test]
    fn test_path_with_nul_is_rejected() {
        let err = path_to_cstring(Path::new("a\0b.wav")).unwrap_err();
        assert!(matches!(err, SoxError::InvalidArgument { .. }));
    }

    #[test]
    fn test_ptr_or_null() {
        assert!(ptr_or_null::<u32>(None).is_null());
        let value = 7u32;
        assert_eq!(ptr_or_null(Some(&value)), &value as *const u32);
    }
}
