use crate::PixelFormat;
use common::error::CursorError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Cursor(#[from] CursorError),

    #[error("unsupported texture format: 0x{tag:02X}")]
    #[diagnostic(
        code(gxtex::unsupported_format),
        help("known tags: 0x03 I4, 0x04 I8, 0x06 IA8, 0x07 RGB565, 0x08 RGB5A3, 0x0A CMPR")
    )]
    UnsupportedFormat { tag: u8 },

    #[error("{format} payload truncated: required={required}, available={available}")]
    #[diagnostic(code(gxtex::truncated_payload))]
    TruncatedPayload {
        format: PixelFormat,
        required: usize,
        available: usize,
    },

    #[error("integer overflow")]
    #[diagnostic(code(gxtex::integer_overflow))]
    IntegerOverflow,
}
