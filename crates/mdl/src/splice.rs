use crate::error::Error;
use crate::Result;
use core::ops::Range;

/// Byte span occupied by resource `target`.
///
/// A resource ends where the next one starts. The last resource ends at
/// `region_end`, which has to be supplied by the caller because the table
/// itself carries no end marker.
pub fn resource_span(
    offsets: &[u32],
    region_end: Option<usize>,
    target: usize,
) -> Result<Range<usize>> {
    let out_of_range = || Error::IndexOutOfRange {
        index: target,
        count: offsets.len(),
    };
    let start = offsets.get(target).ok_or_else(out_of_range)?;
    let end = match offsets.get(target.saturating_add(1)) {
        Some(next) => usize::try_from(*next).map_err(|_| Error::IntegerOverflow)?,
        None => region_end.ok_or_else(out_of_range)?,
    };
    let start = usize::try_from(*start).map_err(|_| Error::IntegerOverflow)?;
    Ok(start..end)
}

/// Replaces the span of resource `target` with `replacement`.
///
/// Nothing outside the span is touched: offset tables are not patched when
/// the replacement has a different length.
pub fn inject_resource(
    original: &[u8],
    offsets: &[u32],
    region_end: Option<usize>,
    target: usize,
    replacement: &[u8],
) -> Result<Vec<u8>> {
    let span = resource_span(offsets, region_end, target)?;
    if span.start > span.end || span.end > original.len() {
        return Err(Error::InvalidSpan {
            start: span.start,
            end: span.end,
            file_len: original.len(),
        });
    }

    let mut out = Vec::with_capacity(original.len() - span.len() + replacement.len());
    out.extend_from_slice(&original[..span.start]);
    out.extend_from_slice(replacement);
    out.extend_from_slice(&original[span.end..]);

    log::debug!(
        "spliced resource {target}: span 0x{:X}..0x{:X} ({} bytes) -> {} bytes",
        span.start,
        span.end,
        span.len(),
        replacement.len()
    );
    Ok(out)
}
