use super::*;
use common::collect_files_recursive;
use gxtex::PixelFormat;
use proptest::prelude::*;
use std::path::PathBuf;

fn mdl_test_files() -> Vec<PathBuf> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("testdata");
    let mut files = Vec::new();
    collect_files_recursive(&root, &mut files);
    files.sort();
    files
        .into_iter()
        .filter(|path| {
            fs::read(path)
                .map(|bytes| bytes.get(0..4) == Some(&MDL_MAGIC.to_be_bytes()[..]))
                .unwrap_or(false)
        })
        .collect()
}

fn tex(format: PixelFormat, width: u16, height: u16) -> TextureHeader {
    TextureHeader {
        format,
        width,
        height,
    }
}

fn to_arc(bytes: Vec<u8>) -> Arc<[u8]> {
    Arc::from(bytes.into_boxed_slice())
}

/// Header, one texobj per texture, one draw element, the texture location
/// table, then 32-byte aligned texture resources followed by `trailer`.
fn build_model(textures: &[(TextureHeader, Vec<u8>)], trailer: &[u8]) -> Vec<u8> {
    let count = u16::try_from(textures.len()).expect("texture count overflow in test");
    let mut header = Header {
        num_textures: count,
        num_texobjs: count,
        num_draw_elements: 1,
        ..Header::default()
    };
    let pos = |body: &Vec<u8>| u32::try_from(HEADER_SIZE + body.len()).expect("offset overflow");

    let mut body = Vec::new();
    header.texobj_offset = pos(&body);
    for index in 0..count {
        body.extend_from_slice(&index.to_be_bytes());
        body.extend_from_slice(&[0, 0]); // padding
        body.extend_from_slice(&[1, 2, 0]);
        body.push(0); // padding
    }

    header.draw_element_offset = pos(&body);
    body.extend_from_slice(&7u16.to_be_bytes());
    body.extend_from_slice(&3u16.to_be_bytes());

    header.texture_location_offset = pos(&body);
    let table_at = body.len();
    body.resize(body.len() + textures.len() * 4, 0);
    while (HEADER_SIZE + body.len()) % 32 != 0 {
        body.push(0);
    }

    for (index, (texture, payload)) in textures.iter().enumerate() {
        let offset = pos(&body);
        body[table_at + index * 4..table_at + index * 4 + 4].copy_from_slice(&offset.to_be_bytes());
        body.extend_from_slice(&texture.encode());
        body.extend_from_slice(payload);
    }
    body.extend_from_slice(trailer);

    let mut out = header.encode().to_vec();
    out.extend_from_slice(&body);
    out
}

fn two_texture_model(trailer: &[u8]) -> Vec<u8> {
    build_model(
        &[
            (tex(PixelFormat::I8, 8, 4), vec![0x40; 32]),
            (tex(PixelFormat::Rgb565, 4, 4), 0xF800u16.to_be_bytes().repeat(16)),
        ],
        trailer,
    )
}

fn sample_header() -> Header {
    Header {
        num_faces: 1,
        num_nodes: 2,
        num_shape_packets: 3,
        num_weighted_matrices: 4,
        num_joints: 5,
        num_vertices: 6,
        num_normals: 7,
        num_colors: 8,
        num_texcoords: 9,
        num_textures: 10,
        num_texobjs: 11,
        num_draw_elements: 12,
        num_materials: 13,
        num_shapes: 14,
        node_offset: 0x100,
        shape_packet_offset: 0x200,
        matrix_offset: 0x300,
        weight_offset: 0x400,
        joint_index_offset: 0x500,
        num_weights_offset: 0x600,
        vertex_offset: 0x700,
        normal_offset: 0x800,
        color_offset: 0x900,
        texcoord_offset: 0xA00,
        texture_location_offset: 0xB00,
        material_offset: 0xC00,
        texobj_offset: 0xD00,
        shape_offset: 0xE00,
        draw_element_offset: 0xF00,
    }
}

#[test]
fn mdl_parse_all_test_models() {
    let files = mdl_test_files();
    if files.is_empty() {
        eprintln!("skipping mdl_parse_all_test_models: no model files in testdata");
        return;
    }

    for path in files {
        let model = Model::open_path(&path)
            .unwrap_or_else(|err| panic!("failed to open {}: {err}", path.display()));
        assert_eq!(
            model.texture_count(),
            usize::from(model.header.num_textures),
            "texture count mismatch in {}",
            path.display()
        );
        for (index, result) in model.decode_all() {
            let image = result.unwrap_or_else(|err| {
                panic!("failed to decode texture {index} in {}: {err}", path.display())
            });
            assert_eq!(
                image.rgba8.len(),
                (image.width * image.height * 4) as usize,
                "raster size mismatch for texture {index} in {}",
                path.display()
            );
        }
    }
}

#[test]
fn header_encode_decode_round_trip() {
    let header = sample_header();
    let encoded = header.encode();
    assert_eq!(&encoded[0..4], &[0x04, 0xB4, 0x00, 0x00]);
    assert_eq!(&encoded[0x20..0x22], &[0x00, 0x0A]);
    assert_eq!(&encoded[0x60..0x64], &[0x00, 0x00, 0x0B, 0x00]);
    assert_eq!(Header::decode(&encoded).expect("failed to decode header"), header);
}

#[test]
fn header_padding_is_skipped_not_validated() {
    let header = sample_header();
    let mut encoded = header.encode();
    for range in [
        0x06..0x08,
        0x18..0x20,
        0x22..0x24,
        0x2C..0x30,
        0x58..0x60,
        0x64..0x68,
        0x78..0x80,
    ] {
        encoded[range].fill(0xFF);
    }
    assert_eq!(Header::decode(&encoded).expect("failed to decode header"), header);
}

#[test]
fn header_rejects_bad_magic_and_short_input() {
    let mut encoded = sample_header().encode();
    encoded[0..4].copy_from_slice(&0x1234_5678u32.to_be_bytes());
    assert!(matches!(
        Header::decode(&encoded),
        Err(Error::InvalidMagic { got: 0x1234_5678 })
    ));

    let encoded = sample_header().encode();
    assert!(matches!(
        Header::decode(&encoded[..HEADER_SIZE - 1]),
        Err(Error::Cursor(_))
    ));
    assert!(matches!(Header::decode(&[]), Err(Error::Cursor(_))));
}

#[test]
fn list_texture_offsets_follows_header() {
    let bytes = two_texture_model(&[]);
    let header = Header::decode(&bytes).expect("failed to decode header");
    let offsets = list_texture_offsets(&bytes, &header).expect("failed to list offsets");
    assert_eq!(offsets, vec![160, 224]);
    assert_eq!(offsets.len(), usize::from(header.num_textures));
}

#[test]
fn list_texture_offsets_keeps_table_order() {
    let mut bytes = two_texture_model(&[]);
    let header = Header::decode(&bytes).expect("failed to decode header");
    let table = header.texture_location_offset as usize;
    bytes[table..table + 4].copy_from_slice(&224u32.to_be_bytes());
    bytes[table + 4..table + 8].copy_from_slice(&160u32.to_be_bytes());

    let offsets = list_texture_offsets(&bytes, &header).expect("failed to list offsets");
    assert_eq!(offsets, vec![224, 160]);

    let model = Model::open_bytes(to_arc(bytes)).expect("failed to parse model");
    assert_eq!(model.texture_offsets(), &[224, 160]);
    let first = model.texture(0).expect("failed to locate texture 0");
    assert_eq!(first.header, tex(PixelFormat::Rgb565, 4, 4));
}

#[test]
fn list_texture_offsets_rejects_table_past_end() {
    let bytes = two_texture_model(&[]);
    let mut header = Header::decode(&bytes).expect("failed to decode header");
    header.texture_location_offset = u32::try_from(bytes.len() - 4).expect("offset overflow");
    assert!(matches!(
        list_texture_offsets(&bytes, &header),
        Err(Error::TableOutOfBounds {
            label: "texture location",
            count: 2,
            ..
        })
    ));
}

#[test]
fn read_texture_header_reports_unknown_format() {
    let mut bytes = two_texture_model(&[]);
    bytes[160] = 0x0E;
    assert!(matches!(
        read_texture_header(&bytes, 160),
        Err(Error::Texture(gxtex::error::Error::UnsupportedFormat { tag: 0x0E }))
    ));
    let header = read_texture_header(&bytes, 224).expect("failed to read sub-header");
    assert_eq!(header, tex(PixelFormat::Rgb565, 4, 4));
}

#[test]
fn model_locates_and_decodes_textures() {
    let model = Model::open_bytes(to_arc(two_texture_model(&[]))).expect("failed to parse model");
    assert_eq!(model.texture_count(), 2);
    assert_eq!(model.texobjs.len(), 2);
    assert_eq!(model.texobjs[1].texture_index, 1);
    assert_eq!(model.texobjs[1].unknown, [1, 2, 0]);
    assert_eq!(
        model.draw_elements,
        vec![DrawElement {
            material_index: 7,
            shape_index: 3
        }]
    );

    let first = model.texture(0).expect("failed to locate texture 0");
    assert_eq!(first.offset, 160);
    assert_eq!(first.header, tex(PixelFormat::I8, 8, 4));
    assert_eq!(first.payload.len(), 32);

    let results = model.decode_all();
    assert_eq!(results.len(), 2);
    let grey = results[0].1.as_ref().expect("failed to decode texture 0");
    assert_eq!(grey.pixel(7, 3), Some([0x40, 0x40, 0x40, 255]));
    let red = results[1].1.as_ref().expect("failed to decode texture 1");
    assert_eq!((red.width, red.height), (4, 4));
    assert!(red.rgba8.chunks(4).all(|px| px == [255, 0, 0, 255]));
}

#[test]
fn decode_all_reports_each_failure_by_index() {
    let mut bytes = two_texture_model(&[]);
    bytes[160] = 0x05;
    let model = Model::open_bytes(to_arc(bytes)).expect("failed to parse model");
    let results = model.decode_all();
    assert!(matches!(
        results[0],
        (0, Err(Error::Texture(gxtex::error::Error::UnsupportedFormat { tag: 0x05 })))
    ));
    assert!(matches!(results[1], (1, Ok(_))));
    assert!(matches!(
        model.decode_texture(2),
        Err(Error::IndexOutOfRange { index: 2, count: 2 })
    ));
}

#[test]
fn truncated_texture_payload_is_reported() {
    let mut bytes = two_texture_model(&[]);
    bytes.truncate(bytes.len() - 1);
    let model = Model::open_bytes(to_arc(bytes)).expect("failed to parse model");
    assert!(matches!(
        model.decode_texture(1),
        Err(Error::Texture(gxtex::error::Error::TruncatedPayload {
            required: 32,
            available: 31,
            ..
        }))
    ));
}

#[test]
fn texture_region_end_uses_last_sub_header() {
    let model = Model::open_bytes(to_arc(two_texture_model(&[0xEE; 16]))).expect("parse");
    assert_eq!(model.texture_region_end().expect("region end"), Some(288));
    assert_eq!(model.texture_span(0).expect("span 0"), 160..224);
    assert_eq!(model.texture_span(1).expect("span 1"), 224..288);

    let empty = Model::open_bytes(to_arc(build_model(&[], &[]))).expect("parse empty");
    assert_eq!(empty.texture_region_end().expect("region end"), None);
}

#[test]
fn inject_same_size_texture_round_trips() {
    let model = Model::open_bytes(to_arc(two_texture_model(&[0xEE; 16]))).expect("parse");
    let mut blob = tex(PixelFormat::I8, 8, 4).encode().to_vec();
    blob.extend_from_slice(&[0xFF; 32]);

    let patched = model.inject_texture(0, &blob).expect("failed to inject");
    assert_eq!(patched.len(), model.bytes().len());

    let reparsed = Model::open_bytes(to_arc(patched)).expect("failed to reparse");
    let image = reparsed.decode_texture(0).expect("failed to decode patched texture");
    assert!(image.rgba8.chunks(4).all(|px| px == [0xFF, 0xFF, 0xFF, 255]));
    assert_eq!(
        reparsed.decode_texture(1).expect("untouched texture"),
        model.decode_texture(1).expect("original texture")
    );
}

#[test]
fn inject_ignores_unreadable_last_texture() {
    let mut bytes = two_texture_model(&[]);
    bytes[224] = 0x05;
    let model = Model::open_bytes(to_arc(bytes)).expect("failed to parse model");
    assert!(model.texture_region_end().is_err());
    assert_eq!(model.texture_span(0).expect("span 0"), 160..224);

    let mut blob = tex(PixelFormat::I8, 8, 4).encode().to_vec();
    blob.extend_from_slice(&[0xFF; 32]);
    let patched = model.inject_texture(0, &blob).expect("failed to inject texture 0");
    assert_eq!(patched.len(), model.bytes().len());
    assert_eq!(&patched[160..224], &blob[..]);
    assert_eq!(&patched[224..], &model.bytes()[224..]);

    assert!(matches!(
        model.inject_texture(1, &blob),
        Err(Error::Texture(gxtex::error::Error::UnsupportedFormat { tag: 0x05 }))
    ));
}

#[test]
fn inject_last_texture_keeps_trailing_bytes() {
    let trailer = [0xEEu8; 16];
    let model = Model::open_bytes(to_arc(two_texture_model(&trailer))).expect("parse");
    let blob = vec![0xAB; 100];

    let patched = model.inject_texture(1, &blob).expect("failed to inject");
    let original = model.bytes();
    assert_eq!(patched.len(), 224 + blob.len() + (original.len() - 288));
    assert_eq!(&patched[..224], &original[..224]);
    assert_eq!(&patched[224..324], &blob[..]);
    assert_eq!(&patched[324..], &trailer[..]);
}

#[test]
fn inject_resource_needs_end_marker_for_last_entry() {
    let original = vec![0u8; 64];
    let offsets = [16u32, 32];
    assert!(matches!(
        inject_resource(&original, &offsets, None, 1, &[1, 2, 3]),
        Err(Error::IndexOutOfRange { index: 1, count: 2 })
    ));
    assert!(matches!(
        inject_resource(&original, &offsets, Some(48), 2, &[1, 2, 3]),
        Err(Error::IndexOutOfRange { index: 2, count: 2 })
    ));
    let patched = inject_resource(&original, &offsets, Some(48), 1, &[1, 2, 3]).expect("inject");
    assert_eq!(patched.len(), 32 + 3 + 16);
}

#[test]
fn inject_resource_rejects_invalid_spans() {
    let original = vec![0u8; 64];
    assert!(matches!(
        inject_resource(&original, &[40, 20], None, 0, &[]),
        Err(Error::InvalidSpan { start: 40, end: 20, .. })
    ));
    assert!(matches!(
        inject_resource(&original, &[40], Some(65), 0, &[]),
        Err(Error::InvalidSpan { end: 65, file_len: 64, .. })
    ));
}

#[test]
fn material_table_is_decoded() {
    let mut material = vec![10, 20, 30, 40];
    material.extend_from_slice(&1u16.to_be_bytes());
    material.extend_from_slice(&[2, 1, 0]);
    material.extend_from_slice(&[0; 23]);
    material.extend_from_slice(&0x200u16.to_be_bytes());
    material.extend_from_slice(&5u16.to_be_bytes());
    for i in 0..7u8 {
        material.extend_from_slice(&f32::from(i).to_be_bytes());
    }
    material.resize(records::MATERIAL_SIZE, 0);

    let header = Header {
        num_materials: 1,
        material_offset: u32::try_from(HEADER_SIZE).expect("offset"),
        ..Header::default()
    };
    let mut bytes = header.encode().to_vec();
    bytes.extend_from_slice(&material);

    let model = Model::open_bytes(to_arc(bytes)).expect("failed to parse model");
    assert_eq!(model.texture_count(), 0);
    let parsed = &model.materials[0];
    assert_eq!(
        parsed.color,
        Color {
            r: 10,
            g: 20,
            b: 30,
            a: 40
        }
    );
    assert_eq!(parsed.num_tev_stages, 1);
    assert_eq!(parsed.tev_stages[0].unknown0, 0x200);
    assert_eq!(parsed.tev_stages[0].texobj_index, 5);
    assert_eq!(parsed.tev_stages[0].unknown1[6], 6.0);
    assert_eq!(parsed.tev_stages[7], TevStage::default());
}

#[test]
fn record_table_past_end_is_rejected() {
    let header = Header {
        num_vertices: 2,
        vertex_offset: u32::try_from(HEADER_SIZE).expect("offset"),
        ..Header::default()
    };
    let mut bytes = header.encode().to_vec();
    bytes.extend_from_slice(&[0; VECTOR_SIZE]);
    assert!(matches!(
        Model::open_bytes(to_arc(bytes)),
        Err(Error::TableOutOfBounds {
            label: "vertex",
            count: 2,
            stride: 12,
            ..
        })
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn header_round_trips_through_encode(
        tail in proptest::collection::vec(any::<u8>(), HEADER_SIZE - 4),
    ) {
        let mut raw = MDL_MAGIC.to_be_bytes().to_vec();
        raw.extend_from_slice(&tail);
        let header = Header::decode(&raw).unwrap();
        let encoded = header.encode();
        prop_assert_eq!(Header::decode(&encoded).unwrap(), header.clone());
        prop_assert_eq!(Header::decode(&encoded).unwrap().encode(), encoded);
    }

    #[test]
    fn open_bytes_is_panic_free_on_random_bytes(
        data in proptest::collection::vec(any::<u8>(), 0..1024),
    ) {
        let mut raw = MDL_MAGIC.to_be_bytes().to_vec();
        raw.extend_from_slice(&data);
        if let Ok(model) = Model::open_bytes(to_arc(raw)) {
            let _ = model.decode_all();
            let _ = model.texture_region_end();
        }
    }

    #[test]
    fn inject_preserves_length_invariant(
        original in proptest::collection::vec(any::<u8>(), 0..256),
        a in any::<u16>(),
        b in any::<u16>(),
        blob in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let len = original.len();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let start = usize::from(lo) % (len + 1);
        let end = start + usize::from(hi) % (len - start + 1);
        let offsets = [u32::try_from(start).unwrap()];

        let patched = inject_resource(&original, &offsets, Some(end), 0, &blob).unwrap();
        prop_assert_eq!(patched.len(), start + blob.len() + (len - end));
        prop_assert_eq!(&patched[..start], &original[..start]);
        prop_assert_eq!(&patched[start..start + blob.len()], &blob[..]);
        prop_assert_eq!(&patched[start + blob.len()..], &original[end..]);
    }
}
