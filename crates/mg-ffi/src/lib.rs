mod context;
mod error;
mod types;

pub use context::*;
pub use error::*;
pub use types::*;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};

use mg_mapped::OperandFile;

/// Execute a closure that returns an `MGStatus`, catching any panics
/// and converting them into `MGStatus::ErrorInternal`.
///
/// A context holds no state that a panic could leave half-updated, so the
/// closure is asserted unwind safe.
fn catch_panic<F: FnOnce() -> MGStatus>(f: F) -> MGStatus {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(status) => status,
        Err(_) => {
            set_last_error("internal panic".to_string());
            MGStatus::ErrorInternal
        }
    }
}

/// Read a path argument, recording an error if it is null or not UTF-8.
unsafe fn path_arg(ptr: *const c_char, what: &str) -> Result<PathBuf, MGStatus> {
    if ptr.is_null() {
        set_last_error(format!("{} is null", what));
        return Err(MGStatus::ErrorInvalidArgument);
    }
    match unsafe { CStr::from_ptr(ptr) }.to_str() {
        Ok(s) => Ok(PathBuf::from(s)),
        Err(e) => {
            set_last_error(format!("invalid {}: {}", what, e));
            Err(MGStatus::ErrorInvalidArgument)
        }
    }
}

/// Convert a result path to an owned C string.
fn path_to_c(path: &Path) -> Result<CString, MGStatus> {
    let s = match path.to_str() {
        Some(s) => s,
        None => {
            set_last_error(format!("result path is not UTF-8: {}", path.display()));
            return Err(MGStatus::ErrorInternal);
        }
    };
    CString::new(s).map_err(|e| {
        set_last_error(format!("result path encoding error: {}", e));
        MGStatus::ErrorInternal
    })
}

/// Multiply an `n x k` matrix file by a `k x m` matrix file.
///
/// Returns a heap-allocated C string holding the path of the result file,
/// which is created under the system temporary directory with a unique
/// name. Returns null on any failure; `mg_last_error` describes it. The
/// caller must free the returned string with `mg_free_string`.
#[no_mangle]
pub unsafe extern "C" fn mg_compute(
    a_path: *const c_char,
    b_path: *const c_char,
    n: usize,
    k: usize,
    m: usize,
) -> *mut c_char {
    let mut out: *mut c_char = std::ptr::null_mut();
    let out_ptr = &mut out as *mut *mut c_char;
    let status = catch_panic(|| {
        let a = match unsafe { path_arg(a_path, "a_path") } {
            Ok(p) => p,
            Err(status) => return status,
        };
        let b = match unsafe { path_arg(b_path, "b_path") } {
            Ok(p) => p,
            Err(status) => return status,
        };

        let path = match mg_mapped::compute(&a, &b, n, k, m) {
            Ok(p) => p,
            Err(e) => {
                set_last_error(e.to_string());
                return MGStatus::from(&e);
            }
        };
        match path_to_c(&path) {
            Ok(c) => {
                unsafe { *out_ptr = c.into_raw() };
                MGStatus::Ok
            }
            Err(status) => status,
        }
    });

    if status == MGStatus::Ok {
        out
    } else {
        std::ptr::null_mut()
    }
}

/// Create a new multiplication context.
///
/// On success, writes a heap-allocated `MGContext` pointer into `*ctx_out`
/// and returns `MGStatus::Ok`. The caller must later call
/// `mg_context_destroy` to free the context.
#[no_mangle]
pub unsafe extern "C" fn mg_context_create(
    params: MGKernelParams,
    ctx_out: *mut *mut MGContext,
) -> MGStatus {
    catch_panic(|| {
        if ctx_out.is_null() {
            set_last_error("ctx_out is null".to_string());
            return MGStatus::ErrorInvalidArgument;
        }
        let config = match params.to_config() {
            Ok(c) => c,
            Err(e) => {
                set_last_error(format!("invalid kernel params: {}", e));
                return MGStatus::ErrorInvalidArgument;
            }
        };
        let ctx = match MGContext::new(config) {
            Ok(c) => Box::new(c),
            Err(e) => {
                set_last_error(e.to_string());
                return MGStatus::from(&e);
            }
        };
        unsafe {
            *ctx_out = Box::into_raw(ctx);
        }
        MGStatus::Ok
    })
}

/// Destroy a context previously created by `mg_context_create`.
///
/// Passing a null pointer is a no-op and returns `MGStatus::Ok`.
#[no_mangle]
pub unsafe extern "C" fn mg_context_destroy(ctx: *mut MGContext) -> MGStatus {
    if ctx.is_null() {
        return MGStatus::Ok;
    }
    drop(Box::from_raw(ctx));
    MGStatus::Ok
}

/// Direct future results of this context into `dir` instead of the
/// system temporary directory.
#[no_mangle]
pub unsafe extern "C" fn mg_context_set_output_dir(
    ctx: *mut MGContext,
    dir: *const c_char,
) -> MGStatus {
    catch_panic(|| {
        if ctx.is_null() {
            set_last_error("ctx is null".to_string());
            return MGStatus::ErrorInvalidArgument;
        }
        let dir = match unsafe { path_arg(dir, "dir") } {
            Ok(d) => d,
            Err(status) => return status,
        };
        let ctx = unsafe { &mut *ctx };
        ctx.set_output_dir(dir);
        MGStatus::Ok
    })
}

/// Multiply an `a_rows x a_cols` matrix file by a `b_rows x b_cols` matrix
/// file using the context's configuration.
///
/// Fails with `ErrorShapeMismatch` before touching any file if `a_cols`
/// and `b_rows` differ. On success, writes a heap-allocated C string with
/// the result path into `*output`; free it with `mg_free_string`.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn mg_multiply(
    ctx: *const MGContext,
    a_path: *const c_char,
    a_rows: usize,
    a_cols: usize,
    b_path: *const c_char,
    b_rows: usize,
    b_cols: usize,
    output: *mut *mut c_char,
) -> MGStatus {
    catch_panic(|| {
        if ctx.is_null() || output.is_null() {
            set_last_error("null argument".to_string());
            return MGStatus::ErrorInvalidArgument;
        }
        let ctx = unsafe { &*ctx };
        let a = match unsafe { path_arg(a_path, "a_path") } {
            Ok(p) => OperandFile::new(p, a_rows, a_cols),
            Err(status) => return status,
        };
        let b = match unsafe { path_arg(b_path, "b_path") } {
            Ok(p) => OperandFile::new(p, b_rows, b_cols),
            Err(status) => return status,
        };

        let path = match ctx.multiplier.multiply(&a, &b) {
            Ok(p) => p,
            Err(e) => {
                set_last_error(e.to_string());
                return MGStatus::from(&e);
            }
        };
        match path_to_c(&path) {
            Ok(c) => {
                unsafe { *output = c.into_raw() };
                MGStatus::Ok
            }
            Err(status) => status,
        }
    })
}

/// Ask running and future `mg_multiply` calls on this context to stop.
///
/// Calls in progress fail with `ErrorCancelled` at the next block
/// boundary. Use `mg_context_reset` to accept work again.
#[no_mangle]
pub unsafe extern "C" fn mg_context_cancel(ctx: *const MGContext) -> MGStatus {
    if ctx.is_null() {
        set_last_error("ctx is null".to_string());
        return MGStatus::ErrorInvalidArgument;
    }
    (*ctx).cancel.cancel();
    MGStatus::Ok
}

/// Clear a previous cancellation request.
#[no_mangle]
pub unsafe extern "C" fn mg_context_reset(ctx: *const MGContext) -> MGStatus {
    if ctx.is_null() {
        set_last_error("ctx is null".to_string());
        return MGStatus::ErrorInvalidArgument;
    }
    (*ctx).cancel.reset();
    MGStatus::Ok
}

/// Retrieve the last error message.
///
/// Returns a pointer to a C string describing the most recent error on
/// this thread, or null if no error has occurred. The caller must free the
/// returned string with `mg_free_string`.
#[no_mangle]
pub extern "C" fn mg_last_error() -> *mut c_char {
    match error::take_last_error() {
        Some(e) => e.into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Free a string previously returned by `mg_compute`, `mg_multiply` or
/// `mg_last_error`.
#[no_mangle]
pub unsafe extern "C" fn mg_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
