//! Marshaling between host arrays and the solver's fixed-size buffers.
//!
//! Solver buffers are only valid for the duration of one callback. Everything
//! here either copies into such a buffer or hands out a borrowed view of one;
//! nothing keeps a reference past the call.

use ndarray::ArrayView1;

use crate::error::{BridgeError, BridgeResult};
use crate::host::{Element, HostArray};

/// Read-only view over existing contiguous memory, without copying.
///
/// Callers that need the data past the current callback must call
/// `.to_owned()` on the view.
pub fn export_view<T: Element>(source: &[T]) -> ArrayView1<'_, T> {
    ArrayView1::from(source)
}

/// Copy a host array into a solver buffer.
///
/// Fails with [`BridgeError::TypeMismatch`] when the element types differ and
/// with [`BridgeError::Layout`] when the source is not contiguous row-major. In
/// both cases the destination is left untouched. Otherwise copies
/// `min(source.len(), destination.len())` elements and returns that count; a
/// source longer than the destination is truncated, not rejected.
pub fn import_copy<T: Element>(destination: &mut [T], source: &HostArray) -> BridgeResult<usize> {
    let typed = T::downcast(source).ok_or(BridgeError::TypeMismatch {
        expected: T::DTYPE,
        found: source.dtype(),
    })?;

    // as_slice only succeeds for standard (C) layout
    let data = typed.as_slice().ok_or(BridgeError::Layout)?;

    let count = data.len().min(destination.len());
    destination[..count].copy_from_slice(&data[..count]);

    Ok(count)
}

/// [`import_copy`] that also requires the destination to be filled completely.
///
/// `what` names the source in the [`BridgeError::LengthMismatch`] raised when
/// the source is shorter than the destination.
pub fn import_exact<T: Element>(
    what: &'static str,
    destination: &mut [T],
    source: &HostArray,
) -> BridgeResult<()> {
    let expected = destination.len();
    let found = import_copy(destination, source)?;
    if found != expected {
        return Err(BridgeError::LengthMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}
