use crate::error::Error;
use crate::Result;
use byteorder::{BigEndian, ByteOrder};
use common::ByteCursor;

/// Magic value at offset 0 of every model file.
pub const MDL_MAGIC: u32 = 0x04B4_0000;
/// Size of the fixed file header.
pub const HEADER_SIZE: usize = 0x80;

/// File header. Counts and absolute offsets of every resource table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub num_faces: u16,
    pub num_nodes: u16,
    pub num_shape_packets: u16,
    pub num_weighted_matrices: u16,
    pub num_joints: u16,
    pub num_vertices: u16,
    pub num_normals: u16,
    pub num_colors: u16,
    pub num_texcoords: u16,
    pub num_textures: u16,
    pub num_texobjs: u16,
    pub num_draw_elements: u16,
    pub num_materials: u16,
    pub num_shapes: u16,

    pub node_offset: u32,
    pub shape_packet_offset: u32,
    pub matrix_offset: u32,
    pub weight_offset: u32,
    pub joint_index_offset: u32,
    pub num_weights_offset: u32,
    pub vertex_offset: u32,
    pub normal_offset: u32,
    pub color_offset: u32,
    pub texcoord_offset: u32,
    pub texture_location_offset: u32,
    pub material_offset: u32,
    pub texobj_offset: u32,
    pub shape_offset: u32,
    pub draw_element_offset: u32,
}

impl Header {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteCursor::new(bytes);

        let magic = r.read_u32()?;
        if magic != MDL_MAGIC {
            return Err(Error::InvalidMagic { got: magic });
        }

        let num_faces = r.read_u16()?;
        r.skip(2)?;
        let num_nodes = r.read_u16()?;
        let num_shape_packets = r.read_u16()?;
        let num_weighted_matrices = r.read_u16()?;
        let num_joints = r.read_u16()?;
        let num_vertices = r.read_u16()?;
        let num_normals = r.read_u16()?;
        let num_colors = r.read_u16()?;
        let num_texcoords = r.read_u16()?;
        r.skip(8)?;
        let num_textures = r.read_u16()?;
        r.skip(2)?;
        let num_texobjs = r.read_u16()?;
        let num_draw_elements = r.read_u16()?;
        let num_materials = r.read_u16()?;
        let num_shapes = r.read_u16()?;
        r.skip(4)?;

        let node_offset = r.read_u32()?;
        let shape_packet_offset = r.read_u32()?;
        let matrix_offset = r.read_u32()?;
        let weight_offset = r.read_u32()?;
        let joint_index_offset = r.read_u32()?;
        let num_weights_offset = r.read_u32()?;
        let vertex_offset = r.read_u32()?;
        let normal_offset = r.read_u32()?;
        let color_offset = r.read_u32()?;
        let texcoord_offset = r.read_u32()?;
        r.skip(8)?;
        let texture_location_offset = r.read_u32()?;
        r.skip(4)?;
        let material_offset = r.read_u32()?;
        let texobj_offset = r.read_u32()?;
        let shape_offset = r.read_u32()?;
        let draw_element_offset = r.read_u32()?;
        r.skip(8)?;

        Ok(Self {
            num_faces,
            num_nodes,
            num_shape_packets,
            num_weighted_matrices,
            num_joints,
            num_vertices,
            num_normals,
            num_colors,
            num_texcoords,
            num_textures,
            num_texobjs,
            num_draw_elements,
            num_materials,
            num_shapes,
            node_offset,
            shape_packet_offset,
            matrix_offset,
            weight_offset,
            joint_index_offset,
            num_weights_offset,
            vertex_offset,
            normal_offset,
            color_offset,
            texcoord_offset,
            texture_location_offset,
            material_offset,
            texobj_offset,
            shape_offset,
            draw_element_offset,
        })
    }

    /// Serialises the header; padding regions are written as zeros.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        BigEndian::write_u32(&mut out[0x00..], MDL_MAGIC);
        BigEndian::write_u16(&mut out[0x04..], self.num_faces);

        let counts = [
            self.num_nodes,
            self.num_shape_packets,
            self.num_weighted_matrices,
            self.num_joints,
            self.num_vertices,
            self.num_normals,
            self.num_colors,
            self.num_texcoords,
        ];
        for (i, value) in counts.into_iter().enumerate() {
            BigEndian::write_u16(&mut out[0x08 + i * 2..], value);
        }

        BigEndian::write_u16(&mut out[0x20..], self.num_textures);

        let counts = [
            self.num_texobjs,
            self.num_draw_elements,
            self.num_materials,
            self.num_shapes,
        ];
        for (i, value) in counts.into_iter().enumerate() {
            BigEndian::write_u16(&mut out[0x24 + i * 2..], value);
        }

        let offsets = [
            self.node_offset,
            self.shape_packet_offset,
            self.matrix_offset,
            self.weight_offset,
            self.joint_index_offset,
            self.num_weights_offset,
            self.vertex_offset,
            self.normal_offset,
            self.color_offset,
            self.texcoord_offset,
        ];
        for (i, value) in offsets.into_iter().enumerate() {
            BigEndian::write_u32(&mut out[0x30 + i * 4..], value);
        }

        BigEndian::write_u32(&mut out[0x60..], self.texture_location_offset);

        let offsets = [
            self.material_offset,
            self.texobj_offset,
            self.shape_offset,
            self.draw_element_offset,
        ];
        for (i, value) in offsets.into_iter().enumerate() {
            BigEndian::write_u32(&mut out[0x68 + i * 4..], value);
        }

        out
    }
}
