//! Presentation surface the pipeline reports to

use std::fmt;

use crate::domain::analysis::AnalysisResult;

/// Close callback handed to the presenter together with an analysis.
pub struct DismissHandle {
    on_dismiss: Box<dyn FnOnce() + Send>,
}

impl DismissHandle {
    pub fn new(on_dismiss: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_dismiss: Box::new(on_dismiss),
        }
    }

    /// Invoke the callback. Consumes the handle so it can fire only once.
    pub fn dismiss(self) {
        (self.on_dismiss)();
    }
}

impl fmt::Debug for DismissHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DismissHandle").finish_non_exhaustive()
    }
}

/// Receives loading signals and final results.
pub trait ResultPresenter: Send + Sync {
    fn show_loading(&self);

    fn hide_loading(&self);

    fn show_analysis(&self, analysis: &AnalysisResult, on_close: DismissHandle);

    /// Explicit error state; `analysis` is a zeroed placeholder record.
    fn show_error(&self, message: &str, analysis: &AnalysisResult);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dismiss_runs_callback_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle = DismissHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handle.dismiss();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
