use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("read out of bounds: offset={offset}, size={size}, len={len}")]
    #[diagnostic(code(common::out_of_bounds))]
    OutOfBounds {
        offset: usize,
        size: usize,
        len: usize,
    },
}
