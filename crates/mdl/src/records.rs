//! Geometry, material and scene tables. These are decoded field by field so
//! their spans are validated, but their contents are not interpreted.

use crate::error::Error;
use crate::Result;
use common::ByteCursor;

pub const NODE_SIZE: usize = 16;
pub const MATERIAL_SIZE: usize = 288;
pub const TEV_STAGE_SIZE: usize = 32;
pub const TEXOBJ_SIZE: usize = 8;
pub const SHAPE_SIZE: usize = 8;
pub const SHAPE_PACKET_SIZE: usize = 32;
pub const DRAW_ELEMENT_SIZE: usize = 4;
pub const VECTOR_SIZE: usize = 12;
pub const TEXCOORD_SIZE: usize = 8;
pub const COLOR_SIZE: usize = 4;
pub const MATRIX_SIZE: usize = 48;

const MATERIAL_TEV_STAGES: usize = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub unknown: [u16; 6],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TevStage {
    pub unknown0: u16,
    pub texobj_index: u16,
    pub unknown1: [f32; 7],
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub color: Color,
    pub unknown1: u16,
    pub unknown2: u8,
    pub num_tev_stages: u8,
    pub unknown4: u8,
    pub tev_stages: [TevStage; MATERIAL_TEV_STAGES],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TexObj {
    pub texture_index: u16,
    pub unknown: [u8; 3],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    pub unknown: [u8; 4],
    pub num_packets: u16,
    pub first_packet: u16,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShapePacket {
    pub data_offset: u32,
    pub data_size: u32,
    pub unknown0: u16,
    pub num_matrix_indices: u16,
    pub matrix_indices: [u16; 10],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DrawElement {
    pub material_index: u16,
    pub shape_index: u16,
}

/// Row-major 3×4 affine matrix.
pub type Matrix3x4 = [[f32; 4]; 3];

/// Reads `count` records of `stride` bytes at `offset` after checking that
/// the whole table lies inside `bytes`. Empty tables are not checked.
pub(crate) fn read_table<T>(
    bytes: &[u8],
    label: &'static str,
    offset: u32,
    count: u16,
    stride: usize,
    read: impl Fn(&mut ByteCursor<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let start = usize::try_from(offset).map_err(|_| Error::IntegerOverflow)?;
    let end = usize::from(count)
        .checked_mul(stride)
        .and_then(|len| len.checked_add(start))
        .ok_or(Error::IntegerOverflow)?;
    if end > bytes.len() {
        return Err(Error::TableOutOfBounds {
            label,
            offset,
            count,
            stride,
            file_len: bytes.len(),
        });
    }

    let mut r = ByteCursor::at(bytes, start)?;
    (0..count).map(|_| read(&mut r)).collect()
}

pub(crate) fn read_node(r: &mut ByteCursor<'_>) -> Result<Node> {
    let mut unknown = [0u16; 6];
    for value in &mut unknown {
        *value = r.read_u16()?;
    }
    r.skip(4)?;
    Ok(Node { unknown })
}

pub(crate) fn read_color(cursor: &mut ByteCursor<'_>) -> Result<Color> {
    let [r, g, b, a] = cursor.read_array::<4>()?;
    Ok(Color { r, g, b, a })
}

fn read_tev_stage(r: &mut ByteCursor<'_>) -> Result<TevStage> {
    let unknown0 = r.read_u16()?;
    let texobj_index = r.read_u16()?;
    let mut unknown1 = [0f32; 7];
    for value in &mut unknown1 {
        *value = r.read_f32()?;
    }
    Ok(TevStage {
        unknown0,
        texobj_index,
        unknown1,
    })
}

pub(crate) fn read_material(r: &mut ByteCursor<'_>) -> Result<Material> {
    let color = read_color(r)?;
    let unknown1 = r.read_u16()?;
    let unknown2 = r.read_u8()?;
    let num_tev_stages = r.read_u8()?;
    let unknown4 = r.read_u8()?;
    r.skip(23)?;

    let mut tev_stages = [TevStage::default(); MATERIAL_TEV_STAGES];
    for stage in &mut tev_stages {
        *stage = read_tev_stage(r)?;
    }

    Ok(Material {
        color,
        unknown1,
        unknown2,
        num_tev_stages,
        unknown4,
        tev_stages,
    })
}

pub(crate) fn read_texobj(r: &mut ByteCursor<'_>) -> Result<TexObj> {
    let texture_index = r.read_u16()?;
    r.skip(2)?;
    let unknown = r.read_array::<3>()?;
    r.skip(1)?;
    Ok(TexObj {
        texture_index,
        unknown,
    })
}

pub(crate) fn read_shape(r: &mut ByteCursor<'_>) -> Result<Shape> {
    Ok(Shape {
        unknown: r.read_array::<4>()?,
        num_packets: r.read_u16()?,
        first_packet: r.read_u16()?,
    })
}

pub(crate) fn read_shape_packet(r: &mut ByteCursor<'_>) -> Result<ShapePacket> {
    let data_offset = r.read_u32()?;
    let data_size = r.read_u32()?;
    let unknown0 = r.read_u16()?;
    let num_matrix_indices = r.read_u16()?;
    let mut matrix_indices = [0u16; 10];
    for value in &mut matrix_indices {
        *value = r.read_u16()?;
    }
    Ok(ShapePacket {
        data_offset,
        data_size,
        unknown0,
        num_matrix_indices,
        matrix_indices,
    })
}

pub(crate) fn read_draw_element(r: &mut ByteCursor<'_>) -> Result<DrawElement> {
    Ok(DrawElement {
        material_index: r.read_u16()?,
        shape_index: r.read_u16()?,
    })
}

pub(crate) fn read_vector(r: &mut ByteCursor<'_>) -> Result<[f32; 3]> {
    Ok([r.read_f32()?, r.read_f32()?, r.read_f32()?])
}

pub(crate) fn read_texcoord(r: &mut ByteCursor<'_>) -> Result<[f32; 2]> {
    Ok([r.read_f32()?, r.read_f32()?])
}

pub(crate) fn read_matrix(r: &mut ByteCursor<'_>) -> Result<Matrix3x4> {
    let mut m = [[0f32; 4]; 3];
    for row in &mut m {
        for value in row {
            *value = r.read_f32()?;
        }
    }
    Ok(m)
}
