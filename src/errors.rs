//! Error Types
//!
//! This module defines the error types used throughout the renderer.
//!
//! # Overview
//!
//! The main error type [`RenderError`] covers the failure modes that are
//! surfaced to the caller:
//! - Program compile / link / validate failures
//! - Shader template synthesis failures
//!
//! Everything else that is "not ready yet" (missing render targets, empty
//! pick results) degrades to a skipped sub-pass, and removing an unknown
//! object is logged and ignored.
//!
//! # Usage
//!
//! Fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, RenderError>`.
//!
//! ```rust,ignore
//! use myth_retained::errors::{RenderError, Result};
//!
//! fn compile(renderer: &mut Renderer, device: &mut dyn GpuDevice) -> Result<()> {
//!     renderer.build_object(device, ObjectId(7), &slots)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::renderer::program::ProgramStage;

/// The main error type for the renderer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    // ========================================================================
    // Program Errors
    // ========================================================================
    /// One variant of a program failed to compile, link or validate.
    ///
    /// The render object that requested the program has been removed from
    /// the registry; other objects are unaffected.
    #[error("Failed to build {stage} program for state hash '{hash}':\n{log}")]
    ProgramBuild {
        /// Composed state hash the program was requested for
        hash: String,
        /// Program variant that failed
        stage: ProgramStage,
        /// Compiler / linker log reported by the device
        log: String,
    },

    /// The shader synthesizer could not produce source for a configuration.
    #[error("Shader template error: {0}")]
    ShaderTemplate(String),
}

impl RenderError {
    /// Returns the compiler log when this is a program build failure.
    #[must_use]
    pub fn build_log(&self) -> Option<&str> {
        match self {
            Self::ProgramBuild { log, .. } => Some(log),
            _ => None,
        }
    }
}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        RenderError::ShaderTemplate(err.to_string())
    }
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;
