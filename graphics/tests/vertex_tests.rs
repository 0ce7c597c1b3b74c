//! Integration tests for vertex formats, primitive assembly and pipelines.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use rstest::rstest;

use amber_graphics::{
    DrawMode, GpuBufferSlice, IndexType, RenderPipeline, ShaderType, UniformDescription,
    VertexFormat, VertexFormatElement,
};
use common::TestContext;

#[rstest]
#[case::position(VertexFormat::position(), 12)]
#[case::position_color(VertexFormat::position_color(), 16)]
#[case::position_tex(VertexFormat::position_tex(), 20)]
#[case::position_tex_color(VertexFormat::position_tex_color(), 24)]
#[case::position_color_normal(VertexFormat::position_color_normal(), 20)]
fn test_standard_format_sizes(#[case] format: VertexFormat, #[case] size: u32) {
    assert_eq!(format.vertex_size(), size);
    assert_eq!(format.offset(VertexFormatElement::POSITION), Some(0));
}

#[rstest]
#[case::triangles(DrawMode::Triangles, 300, 300)]
#[case::quads(DrawMode::Quads, 8, 12)]
#[case::lines(DrawMode::Lines, 16, 24)]
#[case::line_strip(DrawMode::LineStrip, 10, 10)]
#[case::triangle_fan(DrawMode::TriangleFan, 7, 7)]
fn test_index_counts(#[case] mode: DrawMode, #[case] vertices: u32, #[case] indices: u32) {
    assert_eq!(mode.index_count(vertices), indices);
}

#[rstest]
#[case::lines(DrawMode::Lines, 2, 2, false)]
#[case::line_strip(DrawMode::LineStrip, 2, 1, true)]
#[case::debug_lines(DrawMode::DebugLines, 2, 2, false)]
#[case::debug_line_strip(DrawMode::DebugLineStrip, 2, 1, true)]
#[case::triangles(DrawMode::Triangles, 3, 3, false)]
#[case::triangle_strip(DrawMode::TriangleStrip, 3, 1, true)]
#[case::triangle_fan(DrawMode::TriangleFan, 3, 1, true)]
#[case::quads(DrawMode::Quads, 4, 4, false)]
fn test_primitive_vertex_counts(
    #[case] mode: DrawMode,
    #[case] first: u32,
    #[case] additional: u32,
    #[case] shared: bool,
) {
    assert_eq!(mode.first_vertex_count(), first);
    assert_eq!(mode.additional_vertex_count(), additional);
    assert_eq!(mode.share_vertices(), shared);
}

#[rstest]
#[case::short_max(65535, IndexType::Short)]
#[case::first_int(65536, IndexType::Int)]
#[case::zero(0, IndexType::Short)]
fn test_smallest_index_type(#[case] max_index: u32, #[case] expected: IndexType) {
    assert_eq!(IndexType::smallest_for(max_index), expected);
}

#[test]
fn test_formats_hash_structurally() {
    let built = VertexFormat::builder()
        .add("Position", VertexFormatElement::POSITION)
        .add("Color", VertexFormatElement::COLOR)
        .build()
        .unwrap();
    let mut set = HashSet::new();
    set.insert(VertexFormat::position_color());
    assert!(set.contains(&built));
    assert!(!set.contains(&VertexFormat::position_tex()));
    assert_eq!(built.to_string(), "VertexFormat[Position, Color]");
}

#[test]
fn test_immediate_buffer_reuse() {
    let ctx = TestContext::default();
    let format = VertexFormat::position();

    let first = format
        .upload_immediate_vertex_buffer(&ctx.manager, &[1; 48])
        .unwrap();
    assert_eq!(first.length(), 48);
    let first_id = first.buffer_id();

    // Smaller data is written in place.
    let second = format
        .upload_immediate_vertex_buffer(&ctx.manager, &[2; 24])
        .unwrap();
    assert_eq!(second.buffer_id(), first_id);
    assert_eq!(second.length(), 24);

    // Larger data replaces the buffer, invalidating old slices.
    let third = format
        .upload_immediate_vertex_buffer(&ctx.manager, &[3; 96])
        .unwrap();
    assert_ne!(third.buffer_id(), first_id);
    assert!(!first.is_valid());
    assert_eq!(ctx.device.buffer_count(), 1);

    let indices: GpuBufferSlice = format
        .upload_immediate_index_buffer(&ctx.manager, &[0; 12])
        .unwrap();
    assert_eq!(ctx.device.buffer_count(), 2);

    format.release_immediate_buffers();
    assert!(!indices.is_valid());
    assert_eq!(ctx.device.buffer_count(), 0);
}

#[test]
fn test_generated_quad_indices_drive_draws() {
    let ctx = TestContext::default();
    let bytes = DrawMode::Quads
        .generate_indices(8, IndexType::Short)
        .unwrap();
    let indices: Vec<u16> = bytemuck::pod_collect_to_vec(&bytes);
    assert_eq!(indices, vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);

    let slice = VertexFormat::position()
        .upload_immediate_index_buffer(&ctx.manager, &bytes)
        .unwrap();
    assert_eq!(slice.length(), 24);
}

#[test]
fn test_pipeline_source_override() {
    let ctx = TestContext::default();
    let pipeline = RenderPipeline::new(
        "tests/override",
        Arc::new(VertexFormat::position_color()),
        DrawMode::Triangles,
    )
    .with_uniform(UniformDescription::block("Projection"))
    .with_shader_source(ShaderType::Vertex, "void main() {}")
    .with_shader_source(ShaderType::Fragment, "void main() {}");

    let inline = ctx.device.precompile_pipeline(&pipeline);
    assert!(inline.is_valid());
    assert!(!inline.contains_uniform("Projection"));

    let sources = |id: &str, stage: ShaderType| {
        Some(format!("// {id}{}\nuniform Projection;", stage.extension()))
    };
    let overridden = ctx
        .device
        .precompile_pipeline_with_source(&pipeline, &sources);
    assert!(overridden.contains_uniform("Projection"));
    assert!(Arc::ptr_eq(&ctx.device.precompile_pipeline(&pipeline), &overridden));
    assert_eq!(ctx.device.cached_pipeline_count(), 1);
}
