//! Reader for big-endian `.mdl` model containers.
//!
//! The header at offset 0 holds counts and absolute offsets for every
//! resource table. Textures are located through a table of absolute `u32`
//! offsets; each texture is a 32-byte sub-header followed by a tiled GX
//! payload whose length follows from its format and dimensions.

pub mod error;
pub mod header;
pub mod records;
pub mod splice;

use crate::error::Error;
use crate::records::*;
use common::ByteCursor;
use core::ops::Range;
use gxtex::{DecodedImage, TextureHeader, TEXTURE_HEADER_SIZE};
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub use crate::header::{Header, HEADER_SIZE, MDL_MAGIC};
pub use crate::splice::{inject_resource, resource_span};

pub type Result<T> = core::result::Result<T, Error>;

/// Reads the texture location table: exactly `header.num_textures` offsets.
pub fn list_texture_offsets(bytes: &[u8], header: &Header) -> Result<Vec<u32>> {
    let offsets = read_table(
        bytes,
        "texture location",
        header.texture_location_offset,
        header.num_textures,
        4,
        |r| Ok(r.read_u32()?),
    )?;

    if offsets.windows(2).any(|pair| pair[0] > pair[1]) {
        log::warn!("texture offsets are not in ascending file order: {offsets:X?}");
    }
    Ok(offsets)
}

/// Reads the sub-header of the texture at `offset`.
pub fn read_texture_header(bytes: &[u8], offset: u32) -> Result<TextureHeader> {
    let offset = usize::try_from(offset).map_err(|_| Error::IntegerOverflow)?;
    let mut r = ByteCursor::at(bytes, offset)?;
    Ok(TextureHeader::read(&mut r)?)
}

/// Located texture: sub-header plus its exact payload bytes.
#[derive(Copy, Clone, Debug)]
pub struct TextureRef<'a> {
    pub index: usize,
    pub offset: u32,
    pub header: TextureHeader,
    pub payload: &'a [u8],
}

impl TextureRef<'_> {
    pub fn decode(&self) -> Result<DecodedImage> {
        Ok(gxtex::decode(
            self.header.format,
            self.payload,
            u32::from(self.header.width),
            u32::from(self.header.height),
        )?)
    }
}

#[derive(Debug)]
pub struct Model {
    bytes: Arc<[u8]>,
    pub header: Header,
    pub nodes: Vec<Node>,
    pub materials: Vec<Material>,
    pub texobjs: Vec<TexObj>,
    pub shapes: Vec<Shape>,
    pub shape_packets: Vec<ShapePacket>,
    pub draw_elements: Vec<DrawElement>,
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<Color>,
    pub texcoords: Vec<[f32; 2]>,
    pub joint_matrices: Vec<Matrix3x4>,
    texture_offsets: Vec<u32>,
}

impl Model {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        Self::open_bytes(Arc::from(bytes.into_boxed_slice()))
    }

    pub fn open_bytes(bytes: Arc<[u8]>) -> Result<Self> {
        let header = Header::decode(&bytes)?;
        let b = &bytes[..];
        let h = &header;

        let nodes = read_table(b, "node", h.node_offset, h.num_nodes, NODE_SIZE, read_node)?;
        let materials = read_table(
            b,
            "material",
            h.material_offset,
            h.num_materials,
            MATERIAL_SIZE,
            read_material,
        )?;
        let texobjs = read_table(
            b,
            "texobj",
            h.texobj_offset,
            h.num_texobjs,
            TEXOBJ_SIZE,
            read_texobj,
        )?;
        let shapes = read_table(b, "shape", h.shape_offset, h.num_shapes, SHAPE_SIZE, read_shape)?;
        let shape_packets = read_table(
            b,
            "shape packet",
            h.shape_packet_offset,
            h.num_shape_packets,
            SHAPE_PACKET_SIZE,
            read_shape_packet,
        )?;
        let draw_elements = read_table(
            b,
            "draw element",
            h.draw_element_offset,
            h.num_draw_elements,
            DRAW_ELEMENT_SIZE,
            read_draw_element,
        )?;
        let vertices = read_table(
            b,
            "vertex",
            h.vertex_offset,
            h.num_vertices,
            VECTOR_SIZE,
            read_vector,
        )?;
        let normals = read_table(
            b,
            "normal",
            h.normal_offset,
            h.num_normals,
            VECTOR_SIZE,
            read_vector,
        )?;
        let colors = read_table(b, "color", h.color_offset, h.num_colors, COLOR_SIZE, read_color)?;
        let texcoords = read_table(
            b,
            "texcoord",
            h.texcoord_offset,
            h.num_texcoords,
            TEXCOORD_SIZE,
            read_texcoord,
        )?;
        let joint_matrices = read_table(
            b,
            "matrix",
            h.matrix_offset,
            h.num_joints,
            MATRIX_SIZE,
            read_matrix,
        )?;

        let texture_offsets = list_texture_offsets(b, h)?;
        for (index, offset) in texture_offsets.iter().enumerate() {
            log::debug!("texture {index} located at 0x{offset:08X}");
        }

        Ok(Self {
            bytes,
            header,
            nodes,
            materials,
            texobjs,
            shapes,
            shape_packets,
            draw_elements,
            vertices,
            normals,
            colors,
            texcoords,
            joint_matrices,
            texture_offsets,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn texture_count(&self) -> usize {
        self.texture_offsets.len()
    }

    pub fn texture_offsets(&self) -> &[u32] {
        &self.texture_offsets
    }

    pub fn texture(&self, index: usize) -> Result<TextureRef<'_>> {
        let offset = *self
            .texture_offsets
            .get(index)
            .ok_or(Error::IndexOutOfRange {
                index,
                count: self.texture_count(),
            })?;
        let header = read_texture_header(&self.bytes, offset)?;

        let start = usize::try_from(offset)
            .ok()
            .and_then(|off| off.checked_add(TEXTURE_HEADER_SIZE))
            .ok_or(Error::IntegerOverflow)?;
        let required = header.payload_size()?;
        let available = self.bytes.len().saturating_sub(start);
        if available < required {
            return Err(gxtex::error::Error::TruncatedPayload {
                format: header.format,
                required,
                available,
            }
            .into());
        }

        Ok(TextureRef {
            index,
            offset,
            header,
            payload: &self.bytes[start..start + required],
        })
    }

    pub fn decode_texture(&self, index: usize) -> Result<DecodedImage> {
        self.texture(index)?.decode()
    }

    /// Decodes every texture, reporting each outcome by index.
    pub fn decode_all(&self) -> Vec<(usize, Result<DecodedImage>)> {
        (0..self.texture_count())
            .map(|index| (index, self.decode_texture(index)))
            .collect()
    }

    /// End of the last texture resource: its offset plus sub-header and
    /// computed payload size. `None` when the model has no textures.
    pub fn texture_region_end(&self) -> Result<Option<usize>> {
        let Some(&last) = self.texture_offsets.last() else {
            return Ok(None);
        };
        let header = read_texture_header(&self.bytes, last)?;
        let end = usize::try_from(last)
            .ok()
            .and_then(|off| off.checked_add(header.resource_size().ok()?))
            .ok_or(Error::IntegerOverflow)?;
        Ok(Some(end))
    }

    pub fn texture_span(&self, index: usize) -> Result<Range<usize>> {
        resource_span(&self.texture_offsets, self.span_end_marker(index)?, index)
    }

    /// End marker for the span of texture `index`. Only the last texture
    /// needs one; every other span ends at the next offset.
    fn span_end_marker(&self, index: usize) -> Result<Option<usize>> {
        if index.checked_add(1) == Some(self.texture_count()) {
            self.texture_region_end()
        } else {
            Ok(None)
        }
    }

    /// Builds a new file with texture `index` replaced by `blob`.
    ///
    /// `blob` is the encoder's output (sub-header plus payload) and is spliced
    /// verbatim. Its sub-header is only inspected for mismatch warnings.
    pub fn inject_texture(&self, index: usize, blob: &[u8]) -> Result<Vec<u8>> {
        let current = self.texture(index)?;
        match TextureHeader::parse(blob) {
            Ok(replacement) if replacement != current.header => log::warn!(
                "replacement for texture {index} is {} {}x{}, original is {} {}x{}",
                replacement.format,
                replacement.width,
                replacement.height,
                current.header.format,
                current.header.width,
                current.header.height
            ),
            Ok(_) => {}
            Err(err) => {
                log::warn!("replacement for texture {index} has no readable sub-header: {err}")
            }
        }

        let span = self.texture_span(index)?;
        if span.len() != blob.len() {
            log::warn!(
                "texture {index} changes size from {} to {} bytes; later offsets are not adjusted",
                span.len(),
                blob.len()
            );
        }

        inject_resource(
            &self.bytes,
            &self.texture_offsets,
            self.span_end_marker(index)?,
            index,
            blob,
        )
    }
}

#[cfg(test)]
mod tests;
