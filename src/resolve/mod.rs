//! URL resolution chain
//!
//! Turns a nominal [`DocumentReference`](crate::document::DocumentReference)
//! into an ordered, finite sequence of candidate URLs:
//!
//! 1. the reference's URL as given (entry ids go through the proxy endpoint);
//! 2. the alternate base path, when one is configured;
//! 3. the media-root copy of a project file;
//! 4. the direct-content endpoint, when a probe of candidate 1 does not
//!    declare a PDF;
//! 5. the raw bytes through the blob endpoint.

mod chain;
mod rules;

pub use chain::{Candidate, CandidateKind, ResolutionChain};
pub use rules::ResolutionRules;
