//! Application layer
//!
//! Composes the infrastructure pieces into the per-page-load acquisition
//! lifecycle and defines the presentation seam it reports to.

pub mod acquisition_orchestrator;
pub mod page_context;
pub mod presentation;

pub use acquisition_orchestrator::{
    AcquisitionError, AcquisitionOrchestrator, AcquisitionOutcome, AcquisitionSettings, AcquisitionState,
    ReviewSource, RunOutcome,
};
pub use page_context::PageContext;
pub use presentation::{DismissHandle, ResultPresenter};
