//! GX texture sub-headers and tiled pixel formats.
//!
//! Every supported format stores its pixels in 32-byte tiles. Tiles are laid
//! out row-major across the image; edge tiles are always stored whole and
//! the pixels that fall outside the image are decoded and dropped.

pub mod error;

use crate::error::Error;
use common::ByteCursor;
use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Size of the per-texture sub-header preceding the tiled payload.
pub const TEXTURE_HEADER_SIZE: usize = 32;
/// Bytes occupied by one tile, whatever the format.
pub const TILE_BYTES: usize = 32;

const TEXTURE_HEADER_RESERVED: usize = 26;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    I4,
    I8,
    Ia8,
    Rgb565,
    Rgb5a3,
    Cmpr,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 6] = [
        Self::I4,
        Self::I8,
        Self::Ia8,
        Self::Rgb565,
        Self::Rgb5a3,
        Self::Cmpr,
    ];

    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x03 => Some(Self::I4),
            0x04 => Some(Self::I8),
            0x06 => Some(Self::Ia8),
            0x07 => Some(Self::Rgb565),
            0x08 => Some(Self::Rgb5a3),
            0x0A => Some(Self::Cmpr),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Self::I4 => 0x03,
            Self::I8 => 0x04,
            Self::Ia8 => 0x06,
            Self::Rgb565 => 0x07,
            Self::Rgb5a3 => 0x08,
            Self::Cmpr => 0x0A,
        }
    }

    /// Tile width and height in pixels.
    pub fn tile_size(self) -> (u32, u32) {
        match self {
            Self::I4 | Self::Cmpr => (8, 8),
            Self::I8 => (8, 4),
            Self::Ia8 | Self::Rgb565 | Self::Rgb5a3 => (4, 4),
        }
    }

    pub fn bits_per_pixel(self) -> u32 {
        match self {
            Self::I4 | Self::Cmpr => 4,
            Self::I8 => 8,
            Self::Ia8 | Self::Rgb565 | Self::Rgb5a3 => 16,
        }
    }

    /// Format name understood by the native texture encoder (`-<name>`).
    pub fn name(self) -> &'static str {
        match self {
            Self::I4 => "I4",
            Self::I8 => "I8",
            Self::Ia8 => "IA8",
            Self::Rgb565 => "565",
            Self::Rgb5a3 => "5A3",
            Self::Cmpr => "cmpr",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::I4 => "I4",
            Self::I8 => "I8",
            Self::Ia8 => "IA8",
            Self::Rgb565 => "RGB565",
            Self::Rgb5a3 => "RGB5A3",
            Self::Cmpr => "CMPR",
        };
        write!(f, "{label}")
    }
}

/// Fixed 32-byte texture sub-header: format tag, padding, width, height,
/// then a reserved region that is skipped without inspection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextureHeader {
    pub format: PixelFormat,
    pub width: u16,
    pub height: u16,
}

impl TextureHeader {
    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let tag = cursor.read_u8()?;
        cursor.skip(1)?;
        let width = cursor.read_u16()?;
        let height = cursor.read_u16()?;
        cursor.skip(TEXTURE_HEADER_RESERVED)?;

        let format = PixelFormat::from_raw(tag).ok_or(Error::UnsupportedFormat { tag })?;
        Ok(Self {
            format,
            width,
            height,
        })
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::read(&mut ByteCursor::new(bytes))
    }

    pub fn encode(&self) -> [u8; TEXTURE_HEADER_SIZE] {
        let mut out = [0u8; TEXTURE_HEADER_SIZE];
        out[0] = self.format.raw();
        out[2..4].copy_from_slice(&self.width.to_be_bytes());
        out[4..6].copy_from_slice(&self.height.to_be_bytes());
        out
    }

    pub fn payload_size(&self) -> Result<usize> {
        payload_size(self.format, u32::from(self.width), u32::from(self.height))
    }

    /// Sub-header plus payload.
    pub fn resource_size(&self) -> Result<usize> {
        self.payload_size()?
            .checked_add(TEXTURE_HEADER_SIZE)
            .ok_or(Error::IntegerOverflow)
    }
}

/// Row-major RGBA8 raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

impl DecodedImage {
    fn blank(width: u32, height: u32) -> Result<Self> {
        let len = u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|n| n.checked_mul(4))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(Error::IntegerOverflow)?;
        Ok(Self {
            width,
            height,
            rgba8: vec![0u8; len],
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let off = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba8.get(off..off + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    fn put(&mut self, x: u32, y: u32, px: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let off = (y as usize * self.width as usize + x as usize) * 4;
        self.rgba8[off..off + 4].copy_from_slice(&px);
    }
}

/// Payload length implied by the format and dimensions.
pub fn payload_size(format: PixelFormat, width: u32, height: u32) -> Result<usize> {
    let (tile_w, tile_h) = format.tile_size();
    let tiles = u64::from(width.div_ceil(tile_w)) * u64::from(height.div_ceil(tile_h));
    tiles
        .checked_mul(TILE_BYTES as u64)
        .and_then(|size| usize::try_from(size).ok())
        .ok_or(Error::IntegerOverflow)
}

/// Decodes a tiled payload into a `width × height` RGBA8 raster.
///
/// Bytes past the computed payload size are ignored.
pub fn decode(
    format: PixelFormat,
    payload: &[u8],
    width: u32,
    height: u32,
) -> Result<DecodedImage> {
    let required = payload_size(format, width, height)?;
    if payload.len() < required {
        return Err(Error::TruncatedPayload {
            format,
            required,
            available: payload.len(),
        });
    }

    let mut image = DecodedImage::blank(width, height)?;
    let mut cursor = ByteCursor::new(&payload[..required]);
    let (tile_w, tile_h) = format.tile_size();

    for tile_y in (0..height).step_by(tile_h as usize) {
        for tile_x in (0..width).step_by(tile_w as usize) {
            match format {
                PixelFormat::I4 => decode_i4_tile(&mut cursor, &mut image, tile_x, tile_y)?,
                PixelFormat::I8 => {
                    decode_tile(&mut cursor, &mut image, tile_x, tile_y, format, read_i8)?
                }
                PixelFormat::Ia8 => {
                    decode_tile(&mut cursor, &mut image, tile_x, tile_y, format, read_ia8)?
                }
                PixelFormat::Rgb565 => {
                    decode_tile(&mut cursor, &mut image, tile_x, tile_y, format, read_rgb565)?
                }
                PixelFormat::Rgb5a3 => {
                    decode_tile(&mut cursor, &mut image, tile_x, tile_y, format, read_rgb5a3)?
                }
                PixelFormat::Cmpr => decode_cmpr_tile(&mut cursor, &mut image, tile_x, tile_y)?,
            }
        }
    }

    Ok(image)
}

type SampleReader = fn(&mut ByteCursor<'_>) -> Result<[u8; 4]>;

fn decode_tile(
    cursor: &mut ByteCursor<'_>,
    image: &mut DecodedImage,
    tile_x: u32,
    tile_y: u32,
    format: PixelFormat,
    read: SampleReader,
) -> Result<()> {
    let (tile_w, tile_h) = format.tile_size();
    for y in 0..tile_h {
        for x in 0..tile_w {
            let px = read(cursor)?;
            image.put(tile_x + x, tile_y + y, px);
        }
    }
    Ok(())
}

fn decode_i4_tile(
    cursor: &mut ByteCursor<'_>,
    image: &mut DecodedImage,
    tile_x: u32,
    tile_y: u32,
) -> Result<()> {
    for y in 0..8 {
        for x in (0..8).step_by(2) {
            let byte = cursor.read_u8()?;
            image.put(tile_x + x, tile_y + y, grey(expand4(byte >> 4)));
            image.put(tile_x + x + 1, tile_y + y, grey(expand4(byte & 0x0F)));
        }
    }
    Ok(())
}

// Sub-blocks of a CMPR tile: top-left, top-right, bottom-left, bottom-right.
const CMPR_SUB_BLOCKS: [(u32, u32); 4] = [(0, 0), (4, 0), (0, 4), (4, 4)];

fn decode_cmpr_tile(
    cursor: &mut ByteCursor<'_>,
    image: &mut DecodedImage,
    tile_x: u32,
    tile_y: u32,
) -> Result<()> {
    for (sub_x, sub_y) in CMPR_SUB_BLOCKS {
        let block = decode_cmpr_block(cursor)?;
        for (i, px) in block.iter().enumerate() {
            let i = i as u32;
            image.put(tile_x + sub_x + i % 4, tile_y + sub_y + i / 4, *px);
        }
    }
    Ok(())
}

/// One 8-byte block: two RGB565 endpoints, then one index byte per row with
/// the leftmost pixel in the high bits.
fn decode_cmpr_block(cursor: &mut ByteCursor<'_>) -> Result<[[u8; 4]; 16]> {
    let raw0 = cursor.read_u16()?;
    let raw1 = cursor.read_u16()?;
    let c0 = decode_rgb565(raw0);
    let c1 = decode_rgb565(raw1);

    let palette = if raw0 > raw1 {
        [
            c0,
            c1,
            blend(c0, c1, 2, 1, 3),
            blend(c0, c1, 1, 2, 3),
        ]
    } else {
        [c0, c1, blend(c0, c1, 1, 1, 2), [0, 0, 0, 0]]
    };

    let mut out = [[0u8; 4]; 16];
    for row in 0..4 {
        let bits = cursor.read_u8()?;
        for col in 0..4 {
            let index = (bits >> (6 - col * 2)) & 0x03;
            out[row * 4 + col] = palette[usize::from(index)];
        }
    }
    Ok(out)
}

fn blend(a: [u8; 4], b: [u8; 4], wa: u16, wb: u16, div: u16) -> [u8; 4] {
    let mix = |x: u8, y: u8| ((u16::from(x) * wa + u16::from(y) * wb) / div) as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2]), 255]
}

fn read_i8(cursor: &mut ByteCursor<'_>) -> Result<[u8; 4]> {
    Ok(grey(cursor.read_u8()?))
}

fn read_ia8(cursor: &mut ByteCursor<'_>) -> Result<[u8; 4]> {
    let i = cursor.read_u8()?;
    let a = cursor.read_u8()?;
    Ok([i, i, i, a])
}

fn read_rgb565(cursor: &mut ByteCursor<'_>) -> Result<[u8; 4]> {
    Ok(decode_rgb565(cursor.read_u16()?))
}

fn read_rgb5a3(cursor: &mut ByteCursor<'_>) -> Result<[u8; 4]> {
    Ok(decode_rgb5a3(cursor.read_u16()?))
}

fn grey(v: u8) -> [u8; 4] {
    [v, v, v, 255]
}

fn expand3(v: u16) -> u8 {
    ((v << 5) | (v << 2) | (v >> 1)) as u8
}

fn expand4(v: u8) -> u8 {
    v * 17
}

fn expand5(v: u16) -> u8 {
    ((v << 3) | (v >> 2)) as u8
}

fn expand6(v: u16) -> u8 {
    ((v << 2) | (v >> 4)) as u8
}

fn decode_rgb565(word: u16) -> [u8; 4] {
    let r = expand5((word >> 11) & 0x1F);
    let g = expand6((word >> 5) & 0x3F);
    let b = expand5(word & 0x1F);
    [r, g, b, 255]
}

fn decode_rgb5a3(word: u16) -> [u8; 4] {
    if word & 0x8000 != 0 {
        let r = expand5((word >> 10) & 0x1F);
        let g = expand5((word >> 5) & 0x1F);
        let b = expand5(word & 0x1F);
        [r, g, b, 255]
    } else {
        let a = expand3((word >> 12) & 0x07);
        let r = expand4(((word >> 8) & 0x0F) as u8);
        let g = expand4(((word >> 4) & 0x0F) as u8);
        let b = expand4((word & 0x0F) as u8);
        [r, g, b, a]
    }
}
