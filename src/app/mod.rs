pub mod camera;
pub mod input;
pub mod state;
pub mod windowing;

use std::fmt;

/// App-level error type. Renderer internals use boxed errors; by the time a
/// failure reaches the event-loop boundary this is all that is left to say.
#[derive(Debug)]
pub enum AppError {
    EventLoop(winit::error::EventLoopError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::EventLoop(e) => write!(f, "event loop error: {e}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::EventLoop(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for AppError {
    fn from(e: winit::error::EventLoopError) -> Self {
        AppError::EventLoop(e)
    }
}

pub type AppResult<T> = Result<T, AppError>;
