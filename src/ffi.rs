//! C ABI over the PDFium-backed context
//!
//! Handles cross the boundary as `u64` with `0` as null. Integer results use
//! `-1` as the failure sentinel. No call panics across the boundary: every
//! entry point runs guarded, and bad arguments (null pointers, non-UTF-8
//! strings, unknown handles) are recorded in the context's last-error slot
//! like any library failure.

use crate::backend::{Colorspace, Location, TextOptions};
use crate::config::ContextConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::geometry::{Matrix, Rect};
use crate::guard::guarded;
use crate::handle::{kind, Handle, HandleKind};
use crate::model::Pixmap;
use crate::pdf::PdfiumBackend;
use std::ffi::{c_char, c_int, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::ptr;
use std::rc::Rc;

/// Opaque context handed to C callers
pub struct MpContext(Context<PdfiumBackend>);

/// Affine transform `[a b c d e f]`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MpMatrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl From<MpMatrix> for Matrix {
    fn from(m: MpMatrix) -> Self {
        Matrix::new(m.a, m.b, m.c, m.d, m.e, m.f)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MpRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl From<Rect> for MpRect {
    fn from(r: Rect) -> Self {
        Self {
            x0: r.x0,
            y0: r.y0,
            x1: r.x1,
            y1: r.y1,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MpLocation {
    pub chapter: c_int,
    pub page: c_int,
}

/// Text extraction flags, see [`TextOptions`]
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MpTextOptions {
    pub flags: c_int,
}

unsafe fn context<'a>(ctx: *const MpContext) -> Option<&'a Context<PdfiumBackend>> {
    ctx.as_ref().map(|ctx| &ctx.0)
}

/// Borrow a NUL-terminated UTF-8 string
unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(Error::InvalidArgument {
            reason: format!("{} is null", what),
        });
    }

    CStr::from_ptr(ptr).to_str().map_err(|_| Error::InvalidArgument {
        reason: format!("{} is not valid UTF-8", what),
    })
}

unsafe fn byte_slice<'a>(data: *const u8, len: usize) -> Result<&'a [u8]> {
    if len == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        return Err(Error::InvalidArgument {
            reason: "data is null".to_string(),
        });
    }
    Ok(std::slice::from_raw_parts(data, len))
}

/// Copy `value` into a caller buffer of `len` bytes, truncating at a
/// character boundary and always NUL-terminating. Returns the untruncated
/// length.
unsafe fn copy_out(value: &str, buf: *mut c_char, len: usize) -> c_int {
    if !buf.is_null() && len > 0 {
        let mut n = value.len().min(len - 1);
        while !value.is_char_boundary(n) {
            n -= 1;
        }
        ptr::copy_nonoverlapping(value.as_ptr(), buf.cast::<u8>(), n);
        *buf.add(n) = 0;
    }
    c_int::try_from(value.len()).unwrap_or(c_int::MAX)
}

/// Run a release step, containing any panic so it never unwinds into C.
fn release(what: &str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::warn!(what, "panic while releasing");
    }
}

fn pixmap(ctx: &Context<PdfiumBackend>, pix: u64) -> Result<Rc<Pixmap>> {
    ctx.pixmap(Handle::from_raw(pix))
        .ok_or(Error::InvalidHandle {
            kind: kind::Pixmap::NAME,
            handle: pix,
        })
}

// ============================================================================
// Context lifecycle
// ============================================================================

/// Create a context bound to PDFium.
///
/// # Returns
/// Pointer to the new context, or null if PDFium cannot be bound
///
/// # Memory
/// Caller must free with `mp_drop_context`
#[no_mangle]
pub extern "C" fn mp_new_context() -> *mut MpContext {
    match panic::catch_unwind(|| Context::pdfium(ContextConfig::default())) {
        Ok(Ok(ctx)) => Box::into_raw(Box::new(MpContext(ctx))),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "failed to create context");
            ptr::null_mut()
        }
        Err(_) => {
            tracing::warn!("panic while creating context");
            ptr::null_mut()
        }
    }
}

/// Free a context and every handle it still owns.
///
/// # Safety
/// - `ctx` must be a pointer from `mp_new_context`, or null
/// - `ctx` must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn mp_drop_context(ctx: *mut MpContext) {
    if !ctx.is_null() {
        let ctx = Box::from_raw(ctx);
        release("context", move || drop(ctx));
    }
}

// ============================================================================
// Adapted operations
// ============================================================================

/// Open a document from a file path.
///
/// # Returns
/// Document handle, or 0 on failure
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
/// - `filename` must be a valid null-terminated string, or null
#[no_mangle]
pub unsafe extern "C" fn mp_open_document(ctx: *mut MpContext, filename: *const c_char) -> u64 {
    let Some(ctx) = context(ctx) else {
        return 0;
    };
    let filename = c_str(filename, "filename");

    guarded(ctx.error_slot(), "open_document", 0, || {
        ctx.try_open_document(Path::new(filename?)).map(Handle::raw)
    })
}

/// Open a document from a stream. `magic` is an extension, MIME type or
/// file name naming the format.
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
/// - `magic` must be a valid null-terminated string, or null
#[no_mangle]
pub unsafe extern "C" fn mp_open_document_with_stream(
    ctx: *mut MpContext,
    magic: *const c_char,
    stream: u64,
) -> u64 {
    let Some(ctx) = context(ctx) else {
        return 0;
    };
    let magic = c_str(magic, "magic");

    guarded(ctx.error_slot(), "open_document_with_stream", 0, || {
        ctx.try_open_document_with_stream(magic?, Handle::from_raw(stream))
            .map(Handle::raw)
    })
}

/// Copy `len` bytes into a new stream.
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
/// - `data` must point to `len` readable bytes (may be null when `len` is 0)
#[no_mangle]
pub unsafe extern "C" fn mp_open_memory(ctx: *mut MpContext, data: *const u8, len: usize) -> u64 {
    let Some(ctx) = context(ctx) else {
        return 0;
    };
    let data = byte_slice(data, len);

    guarded(ctx.error_slot(), "open_memory", 0, || {
        ctx.try_open_memory(data?).map(Handle::raw)
    })
}

/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
#[no_mangle]
pub unsafe extern "C" fn mp_load_page(ctx: *mut MpContext, doc: u64, number: c_int) -> u64 {
    let Some(ctx) = context(ctx) else {
        return 0;
    };
    ctx.load_page(Handle::from_raw(doc), number).raw()
}

/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
#[no_mangle]
pub unsafe extern "C" fn mp_load_outline(ctx: *mut MpContext, doc: u64) -> u64 {
    let Some(ctx) = context(ctx) else {
        return 0;
    };
    ctx.load_outline(Handle::from_raw(doc)).raw()
}

/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
#[no_mangle]
pub unsafe extern "C" fn mp_load_links(ctx: *mut MpContext, page: u64) -> u64 {
    let Some(ctx) = context(ctx) else {
        return 0;
    };
    ctx.load_links(Handle::from_raw(page)).raw()
}

/// Number of pages, or -1 on failure.
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
#[no_mangle]
pub unsafe extern "C" fn mp_count_pages(ctx: *mut MpContext, doc: u64) -> c_int {
    let Some(ctx) = context(ctx) else {
        return -1;
    };
    ctx.count_pages(Handle::from_raw(doc))
}

/// Page number for a location, or -1 on failure.
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
#[no_mangle]
pub unsafe extern "C" fn mp_page_number_from_location(
    ctx: *mut MpContext,
    doc: u64,
    location: MpLocation,
) -> c_int {
    let Some(ctx) = context(ctx) else {
        return -1;
    };
    ctx.page_number_from_location(
        Handle::from_raw(doc),
        Location::new(location.chapter, location.page),
    )
}

/// Render a page. `components` is 1 (gray) or 3 (RGB); a non-zero `alpha`
/// adds an alpha channel.
///
/// # Returns
/// Pixmap handle, or 0 on failure
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
#[no_mangle]
pub unsafe extern "C" fn mp_new_pixmap_from_page(
    ctx: *mut MpContext,
    page: u64,
    ctm: MpMatrix,
    components: c_int,
    alpha: c_int,
) -> u64 {
    let Some(ctx) = context(ctx) else {
        return 0;
    };

    guarded(ctx.error_slot(), "new_pixmap_from_page", 0, || {
        let colorspace = Colorspace::from_code(components).ok_or(Error::InvalidArgument {
            reason: format!("unsupported colorspace with {} components", components),
        })?;
        ctx.try_new_pixmap_from_page(Handle::from_raw(page), ctm.into(), colorspace, alpha != 0)
            .map(Handle::raw)
    })
}

/// Extract structured text. A null `options` uses the defaults.
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
/// - `options` must be a valid pointer, or null
#[no_mangle]
pub unsafe extern "C" fn mp_new_stext_page_from_page(
    ctx: *mut MpContext,
    page: u64,
    options: *const MpTextOptions,
) -> u64 {
    let Some(ctx) = context(ctx) else {
        return 0;
    };
    let options = options
        .as_ref()
        .map_or_else(TextOptions::default, |o| TextOptions::new(o.flags as u32));

    ctx.new_stext_page_from_page(Handle::from_raw(page), options)
        .raw()
}

/// Copy a metadata value into `buf`.
///
/// # Returns
/// Full length of the value, or -1 if it is absent or the call failed
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
/// - `key` must be a valid null-terminated string, or null
/// - `buf` must have `len` writable bytes, or be null
#[no_mangle]
pub unsafe extern "C" fn mp_lookup_metadata(
    ctx: *mut MpContext,
    doc: u64,
    key: *const c_char,
    buf: *mut c_char,
    len: usize,
) -> c_int {
    let Some(ctx) = context(ctx) else {
        return -1;
    };
    let key = c_str(key, "key");

    let value = guarded(ctx.error_slot(), "lookup_metadata", None, || {
        ctx.try_lookup_metadata(Handle::from_raw(doc), key?)
    });
    match value {
        Some(value) => copy_out(&value, buf, len),
        None => -1,
    }
}

/// Page bounds, or the empty rect (`x0 > x1`) on failure.
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
#[no_mangle]
pub unsafe extern "C" fn mp_bound_page(ctx: *mut MpContext, page: u64) -> MpRect {
    let Some(ctx) = context(ctx) else {
        return Rect::EMPTY.into();
    };
    ctx.bound_page(Handle::from_raw(page)).into()
}

/// Box enclosing the page's drawn content, or the empty rect on failure
/// and for a blank page.
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
#[no_mangle]
pub unsafe extern "C" fn mp_bound_content(ctx: *mut MpContext, page: u64) -> MpRect {
    let Some(ctx) = context(ctx) else {
        return Rect::EMPTY.into();
    };
    ctx.bound_content(Handle::from_raw(page)).into()
}

// ============================================================================
// Release
// ============================================================================

macro_rules! drop_fns {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            /// Release a handle. Null or unknown handles are ignored.
            ///
            /// # Safety
            /// - `ctx` must be a valid pointer from `mp_new_context`, or null
            #[no_mangle]
            pub unsafe extern "C" fn $name(ctx: *mut MpContext, handle: u64) {
                if let Some(ctx) = context(ctx) {
                    release(stringify!($method), || ctx.$method(Handle::from_raw(handle)));
                }
            }
        )*
    };
}

drop_fns! {
    mp_drop_document => drop_document,
    mp_drop_page => drop_page,
    mp_drop_outline => drop_outline,
    mp_drop_links => drop_links,
    mp_drop_pixmap => drop_pixmap,
    mp_drop_stext_page => drop_stext_page,
    mp_drop_stream => drop_stream,
}

// ============================================================================
// Pixmap access
// ============================================================================

/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
#[no_mangle]
pub unsafe extern "C" fn mp_pixmap_width(ctx: *mut MpContext, pix: u64) -> c_int {
    let Some(ctx) = context(ctx) else {
        return -1;
    };
    guarded(ctx.error_slot(), "pixmap_width", -1, || {
        pixmap(ctx, pix).map(|p| p.width as c_int)
    })
}

/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
#[no_mangle]
pub unsafe extern "C" fn mp_pixmap_height(ctx: *mut MpContext, pix: u64) -> c_int {
    let Some(ctx) = context(ctx) else {
        return -1;
    };
    guarded(ctx.error_slot(), "pixmap_height", -1, || {
        pixmap(ctx, pix).map(|p| p.height as c_int)
    })
}

/// Borrow the pixel samples of a pixmap, writing their byte length to `len`.
/// The pointer stays valid until the pixmap is dropped.
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
/// - `len` must be a valid writable pointer, or null
#[no_mangle]
pub unsafe extern "C" fn mp_pixmap_samples(ctx: *mut MpContext, pix: u64, len: *mut usize) -> *const u8 {
    let Some(ctx) = context(ctx) else {
        return ptr::null();
    };

    let samples = guarded(ctx.error_slot(), "pixmap_samples", None, || {
        // The table keeps its own Rc, so the buffer outlives this clone
        pixmap(ctx, pix).map(|p| Some((p.samples.as_ptr(), p.samples.len())))
    });
    match samples {
        Some((data, n)) => {
            if !len.is_null() {
                *len = n;
            }
            data
        }
        None => ptr::null(),
    }
}

// ============================================================================
// Error reporting
// ============================================================================

/// Category code of the last failure, `0` if none, or -1 for a null context.
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
#[no_mangle]
pub unsafe extern "C" fn mp_last_error_code(ctx: *const MpContext) -> c_int {
    let Some(ctx) = context(ctx) else {
        return -1;
    };
    ctx.last_error().map_or(0, |record| record.kind.code())
}

/// Copy the last failure's message into `buf`. Writes an empty string when
/// there is none.
///
/// # Returns
/// Full length of the message, or -1 for a null context
///
/// # Safety
/// - `ctx` must be a valid pointer from `mp_new_context`, or null
/// - `buf` must have `len` writable bytes, or be null
#[no_mangle]
pub unsafe extern "C" fn mp_last_error_message(
    ctx: *const MpContext,
    buf: *mut c_char,
    len: usize,
) -> c_int {
    let Some(ctx) = context(ctx) else {
        return -1;
    };
    let message = ctx.last_error().map(|record| record.message).unwrap_or_default();
    copy_out(&message, buf, len)
}
