//! "Open in new window" escape hatch
//!
//! Bypasses the whole engine: the target is handed to something outside it.

use std::io;

/// Opens a document location outside the embedded viewer
pub trait ExternalOpener: Send + Sync {
    fn open(&self, target: &str) -> io::Result<()>;
}

/// Opens targets with the platform's default handler
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl ExternalOpener for SystemOpener {
    fn open(&self, target: &str) -> io::Result<()> {
        tracing::info!(location = %target, "Opening document externally");
        open::that_detached(target)
    }
}

/// Leaves opening to the UI shell, which receives the target URL
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellOpener;

impl ExternalOpener for ShellOpener {
    fn open(&self, target: &str) -> io::Result<()> {
        tracing::debug!(location = %target, "External open delegated to shell");
        Ok(())
    }
}
