//! C boundary. See `include/png_to_svg_rust.h`.

use std::ffi::{CStr, CString, c_char};
use std::panic;

use crate::{ConvertError, ConvertResult};

/// Owning handle for an SVG document handed across the C boundary.
///
/// [`SvgBuffer::into_raw`] passes ownership to the caller; the pointer must
/// come back through [`SvgBuffer::from_raw`] (or [`free_cstring`]) exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgBuffer {
    text: CString,
}

impl SvgBuffer {
    pub fn new(text: String) -> ConvertResult<Self> {
        let text = CString::new(text).map_err(|_| ConvertError::InteriorNul)?;
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        // Built from a `String`, so always valid UTF-8.
        self.text.to_str().unwrap_or_default()
    }

    pub fn as_c_str(&self) -> &CStr {
        &self.text
    }

    /// Length in bytes, without the terminating NUL.
    pub fn len(&self) -> usize {
        self.text.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release ownership to the caller.
    pub fn into_raw(self) -> *mut c_char {
        self.text.into_raw()
    }

    /// Take back a pointer produced by [`SvgBuffer::into_raw`]. Null yields `None`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from [`SvgBuffer::into_raw`] and must not have
    /// been reclaimed before.
    pub unsafe fn from_raw(ptr: *mut c_char) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        // SAFETY: guaranteed by the caller.
        let text = unsafe { CString::from_raw(ptr) };
        Some(Self { text })
    }
}

impl From<SvgBuffer> for String {
    fn from(buffer: SvgBuffer) -> Self {
        buffer.text.into_string().unwrap_or_default()
    }
}

/// Convert a PNG image into a NUL-terminated SVG document.
///
/// Returns null on any failure. A null `params_json` selects the defaults.
/// A non-null result must be released with [`free_cstring`].
///
/// # Safety
///
/// `image_data` must be null or point to `image_size` readable bytes, and
/// `params_json` must be null or point to a NUL-terminated string. Both only
/// need to stay valid for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn convert_png_to_svg(
    image_data: *const u8,
    image_size: usize,
    params_json: *const c_char,
) -> *mut c_char {
    let bytes: &[u8] = if image_data.is_null() || image_size == 0 {
        &[]
    } else {
        // SAFETY: guaranteed by the caller.
        unsafe { std::slice::from_raw_parts(image_data, image_size) }
    };
    let params = if params_json.is_null() {
        ""
    } else {
        // SAFETY: guaranteed by the caller.
        match unsafe { CStr::from_ptr(params_json) }.to_str() {
            Ok(params) => params,
            Err(err) => {
                log::warn!("PNG to SVG conversion failed: params are not valid UTF-8: {err}");
                return std::ptr::null_mut();
            }
        }
    };

    match panic::catch_unwind(|| crate::convert_to_buffer(bytes, params)) {
        Ok(Ok(buffer)) => buffer.into_raw(),
        Ok(Err(err)) => {
            log::warn!("PNG to SVG conversion failed: {err}");
            std::ptr::null_mut()
        }
        Err(_) => {
            log::warn!("PNG to SVG conversion panicked");
            std::ptr::null_mut()
        }
    }
}

/// Release a string returned by [`convert_png_to_svg`]. Null is ignored.
///
/// # Safety
///
/// `s` must be null or a pointer returned by [`convert_png_to_svg`] that has
/// not been released yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_cstring(s: *mut c_char) {
    // SAFETY: guaranteed by the caller.
    drop(unsafe { SvgBuffer::from_raw(s) });
}
