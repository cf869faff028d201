//! Pluggable diagnostics backend.
//!
//! `spec.md` places "any diagnostic printing" out of scope as a thin external
//! collaborator, but the heap checker (C8) still needs somewhere to report a
//! violation. Rather than hard-coding a `print!`/`log` dependency, this module
//! mirrors `slopos_lib::klog`'s backend-registration design: a single
//! optional function pointer, swapped in atomically, that receives
//! pre-formatted arguments for one diagnostic line. A host kernel wires this
//! into its own logger; a hosted test binary can leave it unset, in which
//! case diagnostics are silently dropped.

use core::fmt;
use core::sync::atomic::{AtomicPtr, Ordering};

/// Signature of a diagnostics backend: receives one pre-formatted line.
pub type DiagBackend = fn(fmt::Arguments<'_>);

static BACKEND: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

/// Register the function that receives diagnostic lines.
///
/// Passing a backend again replaces the previous one. There is no way to
/// unregister short of registering a no-op backend.
pub fn register_backend(backend: DiagBackend) {
    BACKEND.store(backend as *mut (), Ordering::Release);
}

/// Emit one diagnostic line to the registered backend, if any.
pub fn emit(args: fmt::Arguments<'_>) {
    let raw = BACKEND.load(Ordering::Acquire);
    if raw.is_null() {
        return;
    }
    // SAFETY: the only values ever stored are `DiagBackend` function pointers
    // cast through `register_backend`.
    let backend: DiagBackend = unsafe { core::mem::transmute(raw) };
    backend(args);
}

/// Emit a diagnostic line, `format!`-style, to the registered backend.
macro_rules! diag {
    ($($arg:tt)*) => {
        $crate::diag::emit(format_args!($($arg)*))
    };
}

pub(crate) use diag;
