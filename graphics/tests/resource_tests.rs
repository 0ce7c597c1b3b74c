//! Integration tests for buffers, fences and ring buffers.
//!
//! # Test Categories
//!
//! - **Slice Tests**: Range checks and invalidation of buffer slices
//! - **Release Tests**: Use-after-release is reported, never silently ignored
//! - **Fence Tests**: Blocking, timeouts and cross-thread signaling
//! - **Ring Buffer Tests**: Slot rotation and fence protection

mod common;

use std::thread;
use std::time::{Duration, Instant};

use rstest::rstest;

use amber_graphics::{
    BufferType, BufferUsage, ErrorKind, FenceMode, GraphicsError, MappableRingBuffer,
    TextureFormat,
};
use common::{TestContext, generate_test_pattern};

// ============================================================================
// Slice Tests
// ============================================================================

#[test]
fn test_slice_bounds_are_exact() {
    let ctx = TestContext::default();
    let buffer = ctx.create_buffer(BufferType::Vertices, BufferUsage::StaticWrite, 128);

    // Ending exactly at the bound is allowed.
    let tail = buffer.slice(64, 64).unwrap();
    assert_eq!(tail.offset(), 64);
    assert!(tail.slice(0, 64).is_ok());

    assert!(buffer.slice(64, 65).is_err());
    assert!(tail.slice(1, 64).is_err());
    assert!(buffer.slice(u64::MAX, 2).is_err());
}

#[test]
fn test_nested_slice_writes_land_in_parent() {
    let ctx = TestContext::default();
    let buffer = ctx.create_buffer(BufferType::Uniform, BufferUsage::DynamicWrite, 32);
    let encoder = ctx.device.create_command_encoder();

    let inner = buffer.slice(8, 16).unwrap().slice(4, 4).unwrap();
    encoder.write_to_slice(&inner, &[9, 9, 9, 9]).unwrap();

    let contents = ctx.backend.buffer_contents(buffer.id()).unwrap();
    assert_eq!(&contents[12..16], &[9, 9, 9, 9]);
    assert!(contents[..12].iter().all(|b| *b == 0));
}

// ============================================================================
// Release Tests
// ============================================================================

#[test]
fn test_use_after_release() {
    let ctx = TestContext::default();
    let mut buffer = ctx.create_buffer(BufferType::Vertices, BufferUsage::StaticWrite, 64);
    let slice = buffer.slice_all();
    let encoder = ctx.device.create_command_encoder();

    buffer.close().unwrap();
    assert_eq!(ctx.backend.buffer_count(), 0);
    assert!(!slice.is_valid());

    let err = encoder.write_to_buffer(&buffer, &[0; 4], 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceState);
    assert!(matches!(
        encoder.write_to_slice(&slice, &[0; 4]),
        Err(GraphicsError::ResourceReleased(_))
    ));
    assert!(buffer.close().is_err());
}

#[test]
fn test_texture_release_invalidates_views() {
    let ctx = TestContext::default();
    let mut texture = ctx.create_texture("albedo", TextureFormat::Rgba8, 4, 4);
    let view = texture.create_view().unwrap();
    assert_eq!(view.texture_label().as_deref(), Some("albedo"));

    texture.close().unwrap();
    assert!(!view.is_valid());
    assert_eq!(view.width(0), 0);
    assert_eq!(ctx.device.texture_count(), 0);
    assert!(texture.create_view().is_err());
}

#[test]
fn test_read_view_close() {
    let ctx = TestContext::default();
    let buffer = ctx.create_readback_buffer(8);
    let encoder = ctx.device.create_command_encoder();

    let mut view = encoder.read_buffer(&buffer).unwrap();
    assert_eq!(view.data().unwrap(), &[0; 8]);
    assert_eq!(view.cast::<u32>().unwrap(), vec![0, 0]);
    view.close().unwrap();
    assert!(view.data().is_err());
    assert!(view.close().is_err());
}

// ============================================================================
// Fence Tests
// ============================================================================

#[test]
fn test_delayed_fence_blocks() {
    let delay = Duration::from_millis(30);
    let ctx = TestContext::new(FenceMode::Delayed(delay));
    let encoder = ctx.device.create_command_encoder();

    let start = Instant::now();
    let fence = encoder.create_fence();
    assert!(!fence.is_signaled());
    assert!(fence.await_completion(None));
    assert!(start.elapsed() >= delay);
    assert!(fence.is_signaled());
}

#[test]
fn test_fence_timeout() {
    let ctx = TestContext::new(FenceMode::Manual);
    let fence = ctx.device.create_command_encoder().create_fence();

    assert!(!fence.await_completion(Some(Duration::from_millis(5))));
    assert!(!fence.await_completion_nanos(0));
    assert_eq!(ctx.backend.signal_all_fences(), 1);
    assert!(fence.await_completion_nanos(u64::MAX));
}

#[test]
fn test_manual_fence_signaled_from_another_thread() {
    let ctx = TestContext::new(FenceMode::Manual);
    let fence = ctx.device.create_command_encoder().create_fence();
    assert_eq!(ctx.backend.pending_fence_count(), 1);

    let backend = ctx.backend.clone();
    let signaler = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        backend.signal_all_fences()
    });

    assert!(fence.await_completion(None));
    assert_eq!(signaler.join().unwrap(), 1);
    assert_eq!(ctx.backend.pending_fence_count(), 0);
}

#[test]
fn test_fence_double_close() {
    let ctx = TestContext::default();
    let mut fence = ctx.device.create_command_encoder().create_fence();
    fence.close().unwrap();
    assert!(fence.is_closed());
    assert!(matches!(
        fence.close(),
        Err(GraphicsError::ResourceReleased(_))
    ));
}

// ============================================================================
// Ring Buffer Tests
// ============================================================================

#[rstest]
#[case::immediate(FenceMode::Immediate)]
#[case::delayed(FenceMode::Delayed(Duration::from_millis(1)))]
#[case::manual(FenceMode::Manual)]
fn test_ring_rotation(#[case] fence_mode: FenceMode) {
    let ctx = TestContext::new(fence_mode);
    let mut ring = MappableRingBuffer::new(
        &ctx.manager,
        "frame uniforms",
        BufferType::Uniform,
        BufferUsage::DynamicWrite,
        64,
    )
    .unwrap();

    for k in 0..10 {
        assert_eq!(ring.current_index(), k % MappableRingBuffer::BUFFER_COUNT);
        ctx.backend.signal_all_fences();
        let expected = format!("frame uniforms #{}", k % MappableRingBuffer::BUFFER_COUNT);
        assert_eq!(ring.get_blocking().unwrap().label(), expected);
        ring.rotate().unwrap();
    }
    ring.close().unwrap();
    assert_eq!(ctx.device.buffer_count(), 0);
}

#[test]
fn test_ring_waits_for_slot_fence() {
    let delay = Duration::from_millis(20);
    let ctx = TestContext::new(FenceMode::Delayed(delay));
    let mut ring = MappableRingBuffer::new(
        &ctx.manager,
        "ring",
        BufferType::Vertices,
        BufferUsage::StreamWrite,
        16,
    )
    .unwrap();

    let start = Instant::now();
    for _ in 0..MappableRingBuffer::BUFFER_COUNT {
        ring.rotate().unwrap();
    }
    assert!(ring.has_pending_fence(0));
    ring.get_blocking().unwrap();
    assert!(start.elapsed() >= delay);
    assert!(!ring.has_pending_fence(0));
}

#[test]
fn test_ring_end_to_end() {
    // Fences never signal on their own, so only fresh slots can be acquired.
    let ctx = TestContext::new(FenceMode::Manual);
    let mut ring = MappableRingBuffer::new(
        &ctx.manager,
        "upload",
        BufferType::CopyRead,
        BufferUsage::DynamicWrite,
        256,
    )
    .unwrap();
    assert_eq!(ring.size(), 256);
    let encoder = ctx.device.create_command_encoder();
    let data = generate_test_pattern(64);

    let mut ids = Vec::new();
    for frame in 0..MappableRingBuffer::BUFFER_COUNT as u64 {
        assert!(!ring.has_pending_fence(ring.current_index()));
        let buffer = ring.get_blocking().unwrap();
        encoder.write_to_buffer(buffer, &data, frame * 64).unwrap();
        ids.push((buffer.id(), frame * 64));
        ring.rotate().unwrap();
    }
    for slot in 0..MappableRingBuffer::BUFFER_COUNT {
        assert!(ring.has_pending_fence(slot));
    }
    for pair in ids.windows(2) {
        assert_ne!(pair[0].0, pair[1].0);
    }
    assert_ne!(ids[0].0, ids[MappableRingBuffer::BUFFER_COUNT - 1].0);

    for (id, offset) in ids {
        let contents = ctx.backend.buffer_contents(id).unwrap();
        let offset = offset as usize;
        assert_eq!(&contents[offset..offset + 64], data.as_slice());
    }

    // Back at the first slot, which is released once its fence signals.
    ctx.backend.signal_all_fences();
    ring.get_blocking().unwrap();
    assert!(!ring.has_pending_fence(0));
}
