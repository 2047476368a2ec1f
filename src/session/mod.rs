//! Document session
//!
//! One open document's runtime state: load progress, decoded handle, page,
//! zoom and render generation.

mod blob;
mod machine;
mod state;

pub use blob::LocalBlob;
pub use machine::DocumentSession;
pub use state::{
    CandidateEvent, DisplayedSurface, LoadState, RenderRequest, ResolvedInfo, ViewState,
};
