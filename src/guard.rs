//! Guarded execution: run a library call, trap its failure, return a sentinel

use crate::error::{Error, ErrorKind, Result};
use serde::Serialize;
use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

/// Detail of the most recent failure trapped by a guarded call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// Name of the adapted operation that failed
    pub operation: &'static str,
    pub kind: ErrorKind,
    pub message: String,
}

/// Out-of-band slot holding the last trapped failure.
///
/// Successful calls leave it untouched.
#[derive(Debug, Default)]
pub struct LastError {
    slot: RefCell<Option<ErrorRecord>>,
}

impl LastError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, operation: &'static str, error: &Error) {
        *self.slot.borrow_mut() = Some(ErrorRecord {
            operation,
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    pub fn get(&self) -> Option<ErrorRecord> {
        self.slot.borrow().clone()
    }

    pub fn clear(&self) {
        self.slot.borrow_mut().take();
    }
}

/// Run `call`. Its value passes through on success; on an error or a panic
/// the failure is recorded in `slot` and `sentinel` is returned instead.
pub fn guarded<T, F>(slot: &LastError, operation: &'static str, sentinel: T, call: F) -> T
where
    F: FnOnce() -> Result<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => value,
        Ok(Err(error)) => {
            tracing::debug!(op = operation, error = %error, "call failed, returning sentinel");
            slot.record(operation, &error);
            sentinel
        }
        Err(payload) => {
            let error = Error::Panic {
                message: panic_message(payload.as_ref()),
            };
            tracing::warn!(op = operation, error = %error, "call panicked, returning sentinel");
            slot.record(operation, &error);
            sentinel
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_passes_through() {
        let slot = LastError::new();
        let value = guarded(&slot, "count_pages", -1, || Ok(12));
        assert_eq!(value, 12);
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_error_becomes_sentinel() {
        let slot = LastError::new();
        let value = guarded(&slot, "load_page", None::<u32>, || {
            Err(Error::PageOutOfBounds { page: 5, total: 2 })
        });
        assert_eq!(value, None);

        let record = slot.get().unwrap();
        assert_eq!(record.operation, "load_page");
        assert_eq!(record.kind, ErrorKind::Range);
        assert_eq!(record.message, "Page 5 out of bounds (total: 2)");
    }

    #[test]
    fn test_panic_becomes_sentinel() {
        let slot = LastError::new();
        let value: i32 = guarded(&slot, "count_pages", -1, || panic!("library blew up"));
        assert_eq!(value, -1);

        let record = slot.get().unwrap();
        assert_eq!(record.kind, ErrorKind::Panic);
        assert!(record.message.contains("library blew up"));
    }

    #[test]
    fn test_success_keeps_previous_error() {
        let slot = LastError::new();
        guarded(&slot, "open_document", 0u64, || {
            Err(Error::PdfNotFound {
                path: "/missing.pdf".to_string(),
            })
        });
        guarded(&slot, "count_pages", -1, || Ok(3));
        assert_eq!(slot.get().unwrap().operation, "open_document");

        slot.clear();
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_formatted_panic_message() {
        let slot = LastError::new();
        let _: i32 = guarded(&slot, "load_links", -1, || panic!("index {} too large", 9));
        assert_eq!(slot.get().unwrap().message, "Call panicked: index 9 too large");
    }
}
