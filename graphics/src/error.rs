//! Graphics error types.

use thiserror::Error;

/// Broad category of a [`GraphicsError`].
///
/// Everything except [`ErrorKind::Pipeline`] indicates a caller bug; the
/// layer never retries or masks these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The device was accessed before it was set up.
    Initialization,
    /// A slice, mip view, region or write fell outside its parent's bounds.
    Range,
    /// A released resource or a closed pass was used.
    ResourceState,
    /// A resource was requested with invalid parameters.
    Argument,
    /// An invalid compiled pipeline was bound.
    Pipeline,
}

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    /// No device has been registered yet.
    #[error("device not initialized: {0}")]
    NotInitialized(String),
    /// An offset/length pair, mip range or region is out of bounds.
    #[error("out of range: {0}")]
    OutOfRange(String),
    /// A released resource was used or released twice.
    #[error("resource already released: {0}")]
    ResourceReleased(String),
    /// An operation is not valid in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// An invalid parameter was provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A compiled pipeline that failed to build was used for drawing.
    #[error("pipeline {0} is not valid")]
    PipelineInvalid(String),
    /// A render pass is already open on one of the attachments.
    #[error("attachment {0} is already used by an open render pass")]
    AttachmentInUse(String),
}

impl GraphicsError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized(_) => ErrorKind::Initialization,
            Self::OutOfRange(_) => ErrorKind::Range,
            Self::ResourceReleased(_) | Self::InvalidState(_) | Self::AttachmentInUse(_) => {
                ErrorKind::ResourceState
            }
            Self::InvalidArgument(_) => ErrorKind::Argument,
            Self::PipelineInvalid(_) => ErrorKind::Pipeline,
        }
    }
}

/// Result alias used throughout the crate.
pub type GraphicsResult<T> = Result<T, GraphicsError>;
