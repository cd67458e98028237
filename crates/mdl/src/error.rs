use common::error::CursorError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("model file reading error")]
    #[diagnostic(code(mdl::io_error))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cursor(#[from] CursorError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Texture(#[from] gxtex::error::Error),

    #[error("invalid model magic: 0x{got:08X}")]
    #[diagnostic(code(mdl::invalid_magic), help("expected 0x04B40000"))]
    InvalidMagic { got: u32 },

    #[error("{label} table out of bounds: offset=0x{offset:08X}, count={count}, stride={stride}, file={file_len}")]
    #[diagnostic(code(mdl::table_out_of_bounds))]
    TableOutOfBounds {
        label: &'static str,
        offset: u32,
        count: u16,
        stride: usize,
        file_len: usize,
    },

    #[error("texture index out of range: index={index}, count={count}")]
    #[diagnostic(
        code(mdl::index_out_of_range),
        help("the last texture needs an explicit end-of-region marker")
    )]
    IndexOutOfRange { index: usize, count: usize },

    #[error("invalid resource span: start={start}, end={end}, file={file_len}")]
    #[diagnostic(code(mdl::invalid_span))]
    InvalidSpan {
        start: usize,
        end: usize,
        file_len: usize,
    },

    #[error("integer overflow")]
    #[diagnostic(code(mdl::integer_overflow))]
    IntegerOverflow,
}
