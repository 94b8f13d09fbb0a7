//! Memory Object Tests
//!
//! Tests for:
//! - Buffer: size validation, host data copy, allocation limits
//! - Image2D / Image3D: pitch resolution, format validation, device support
//! - Sampler: coordinate / addressing mode combinations

use std::sync::Arc;

use opal::runtime::host::{DeviceConfig, PlatformConfig};
use opal::{
    AddressingMode, ChannelOrder, ChannelType, Context, DeviceType, FilterMode, HostConfig,
    HostRuntime, ImageFormat, MemFlags, OpalError, Operation, Platform, Status,
};

fn gpu_context() -> (Arc<HostRuntime>, Context) {
    gpu_context_with(HostConfig::default())
}

fn gpu_context_with(config: HostConfig) -> (Arc<HostRuntime>, Context) {
    let rt = Arc::new(HostRuntime::with_config(&config));
    let platform = Platform::first(rt.clone()).unwrap();
    let context = Context::from_type(&platform, DeviceType::GPU).unwrap();
    (rt, context)
}

/// A single GPU with a `pool`-byte memory and allocation limit.
fn small_gpu(pool: u64) -> HostConfig {
    HostConfig::empty().with_platform(
        PlatformConfig::new("Small").with_device(
            DeviceConfig::gpu("Tiny")
                .with_global_mem_size(pool)
                .with_max_mem_alloc_size(pool),
        ),
    )
}

// ============================================================================
// Buffer Tests
// ============================================================================

#[test]
fn buffer_records_size_and_flags() -> anyhow::Result<()> {
    let (_rt, context) = gpu_context();
    let buffer = context.create_buffer(MemFlags::READ_WRITE, 4096, None)?;
    assert_eq!(buffer.size(), 4096);
    assert_eq!(buffer.flags(), MemFlags::READ_WRITE);
    Ok(())
}

#[test]
fn buffer_of_zero_bytes_is_rejected() {
    let (rt, context) = gpu_context();
    let live = rt.live_objects();

    let err = context.create_buffer(MemFlags::READ_WRITE, 0, None).unwrap_err();
    assert_eq!(
        err,
        OpalError::BufferCreation {
            operation: Operation::CreateBuffer,
            status: Status::INVALID_BUFFER_SIZE,
        }
    );
    assert_eq!(rt.live_objects(), live);
}

#[test]
fn buffer_copies_host_data_at_creation() -> anyhow::Result<()> {
    let (rt, context) = gpu_context();
    let mut data = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
    let flags = MemFlags::READ_ONLY | MemFlags::COPY_HOST_PTR;
    let buffer = context.create_buffer(flags, 8, Some(&data))?;
    data.fill(0);

    assert_eq!(rt.buffer_contents(buffer.raw()), Some(vec![1, 2, 3, 4, 5, 6, 7, 8]));
    Ok(())
}

#[test]
fn buffer_from_slice_copies_typed_data() -> anyhow::Result<()> {
    let (rt, context) = gpu_context();
    let values = [1.0f32, -2.5, 3.25];
    let buffer = context.create_buffer_from_slice(MemFlags::READ_ONLY, &values)?;

    assert_eq!(buffer.size(), 12);
    assert!(buffer.flags().contains(MemFlags::COPY_HOST_PTR));
    let bytes = rt.buffer_contents(buffer.raw()).unwrap();
    assert_eq!(bytes, bytemuck::cast_slice::<f32, u8>(&values));
    Ok(())
}

#[test]
fn buffer_with_short_host_data_is_rejected() {
    let (_rt, context) = gpu_context();
    let err = context
        .create_buffer(MemFlags::COPY_HOST_PTR, 16, Some(&[0u8; 8]))
        .unwrap_err();
    assert_eq!(err.status(), Status::INVALID_HOST_PTR);
}

#[test]
fn buffer_copy_flag_without_host_data_is_rejected() {
    let (_rt, context) = gpu_context();
    let err = context
        .create_buffer(MemFlags::COPY_HOST_PTR, 16, None)
        .unwrap_err();
    assert_eq!(err.status(), Status::INVALID_HOST_PTR);
}

#[test]
fn buffer_use_host_ptr_requires_the_unsafe_entry_point() -> anyhow::Result<()> {
    let (rt, context) = gpu_context();
    let mut storage = vec![0u8; 64];

    let err = context
        .create_buffer(MemFlags::USE_HOST_PTR, 64, Some(&storage))
        .unwrap_err();
    assert_eq!(err.status(), Status::INVALID_HOST_PTR);

    let host_ptr = storage.as_mut_ptr().cast();
    // SAFETY: `storage` outlives `buffer` and is not touched meanwhile.
    let buffer =
        unsafe { context.create_buffer_with_host_ptr(MemFlags::USE_HOST_PTR, 64, host_ptr) }?;
    assert_eq!(buffer.size(), 64);
    assert_eq!(rt.buffer_contents(buffer.raw()), None);
    drop(buffer);
    drop(storage);
    Ok(())
}

#[test]
fn buffer_conflicting_access_flags_are_rejected() {
    let (_rt, context) = gpu_context();
    let err = context
        .create_buffer(MemFlags::READ_ONLY | MemFlags::WRITE_ONLY, 16, None)
        .unwrap_err();
    assert_eq!(err.status(), Status::INVALID_VALUE);
}

#[test]
fn buffer_exhaustion_surfaces_status_verbatim() -> anyhow::Result<()> {
    let (_rt, context) = gpu_context_with(small_gpu(1024));

    let first = context.create_buffer(MemFlags::READ_WRITE, 1000, None)?;
    let err = context.create_buffer(MemFlags::READ_WRITE, 100, None).unwrap_err();
    assert_eq!(
        err,
        OpalError::BufferCreation {
            operation: Operation::CreateBuffer,
            status: Status::MEM_OBJECT_ALLOCATION_FAILURE,
        }
    );

    drop(first);
    context.create_buffer(MemFlags::READ_WRITE, 100, None)?;
    Ok(())
}

#[test]
fn buffer_larger_than_max_alloc_is_rejected() {
    let (_rt, context) = gpu_context_with(small_gpu(1024));
    let err = context.create_buffer(MemFlags::READ_WRITE, 2048, None).unwrap_err();
    assert_eq!(err.status(), Status::INVALID_BUFFER_SIZE);
}

// ============================================================================
// Image Tests
// ============================================================================

#[test]
fn image2d_zero_pitch_is_packed() -> anyhow::Result<()> {
    let (_rt, context) = gpu_context();
    for format in [ImageFormat::R8, ImageFormat::RGBA8, ImageFormat::RGBA32F] {
        let image = context.create_image_2d(MemFlags::READ_ONLY, &format, 17, 9, 0, None)?;
        let bpp = format.bytes_per_pixel().unwrap();

        assert_eq!(image.row_pitch(), 17 * bpp, "{format}");
        assert_eq!((image.width(), image.height()), (17, 9));
        assert_eq!(image.format(), format);
    }
    Ok(())
}

#[test]
fn image3d_zero_pitches_are_packed() -> anyhow::Result<()> {
    let (_rt, context) = gpu_context();
    let image = context.create_image_3d(
        MemFlags::READ_WRITE,
        &ImageFormat::R32F,
        8,
        4,
        2,
        0,
        0,
        None,
    )?;
    assert_eq!(image.row_pitch(), 8 * 4);
    assert_eq!(image.slice_pitch(), 8 * 4 * 4);
    assert_eq!(image.depth(), 2);
    Ok(())
}

#[test]
fn image2d_explicit_pitch_with_host_data() -> anyhow::Result<()> {
    let (rt, context) = gpu_context();
    let pixels = vec![7u8; 32 * 4];
    let image = context.create_image_2d(
        MemFlags::READ_ONLY | MemFlags::COPY_HOST_PTR,
        &ImageFormat::RGBA8,
        6,
        4,
        32,
        Some(&pixels),
    )?;
    assert_eq!(image.row_pitch(), 32);
    assert_eq!(rt.buffer_contents(image.raw()).map(|b| b.len()), Some(128));
    Ok(())
}

#[test]
fn image2d_pitch_below_packed_row_is_rejected() {
    let (_rt, context) = gpu_context();
    let pixels = vec![0u8; 256];
    let err = context
        .create_image_2d(
            MemFlags::COPY_HOST_PTR,
            &ImageFormat::RGBA8,
            8,
            4,
            16,
            Some(&pixels),
        )
        .unwrap_err();
    assert_eq!(err.status(), Status::INVALID_IMAGE_SIZE);
}

#[test]
fn image3d_explicit_slice_pitch_with_host_data() -> anyhow::Result<()> {
    let (rt, context) = gpu_context();
    let voxels = vec![3u8; 32 * 2];
    let image = context.create_image_3d(
        MemFlags::READ_ONLY | MemFlags::COPY_HOST_PTR,
        &ImageFormat::R8,
        4,
        3,
        2,
        8,
        32,
        Some(&voxels),
    )?;
    assert_eq!(image.row_pitch(), 8);
    assert_eq!(image.slice_pitch(), 32);
    assert_eq!(rt.buffer_contents(image.raw()).map(|b| b.len()), Some(64));
    Ok(())
}

#[test]
fn image3d_slice_pitch_below_packed_slice_is_rejected() {
    let (_rt, context) = gpu_context();
    let voxels = vec![0u8; 256];
    // row pitch 8 * height 3 = 24; 16 is short and 28 is not a whole number of rows.
    for slice_pitch in [16, 28] {
        let err = context
            .create_image_3d(
                MemFlags::COPY_HOST_PTR,
                &ImageFormat::R8,
                4,
                3,
                2,
                8,
                slice_pitch,
                Some(&voxels),
            )
            .unwrap_err();
        assert_eq!(
            err,
            OpalError::ImageCreation {
                operation: Operation::CreateImage3D,
                status: Status::INVALID_IMAGE_SIZE,
            },
            "slice pitch {slice_pitch}"
        );
    }
}

#[test]
fn image_extent_overflow_is_rejected_before_allocation() {
    let (rt, context) = gpu_context();
    let live = rt.live_objects();
    let host = [0u8; 64];

    let err = context
        .create_image_2d(
            MemFlags::COPY_HOST_PTR,
            &ImageFormat::RGBA8,
            usize::MAX / 2,
            1,
            0,
            Some(&host),
        )
        .unwrap_err();
    assert_eq!(
        err,
        OpalError::ImageCreation {
            operation: Operation::CreateImage2D,
            status: Status::INVALID_IMAGE_SIZE,
        }
    );

    let err = context
        .create_image_2d(
            MemFlags::COPY_HOST_PTR,
            &ImageFormat::RGBA8,
            4,
            4,
            1 << 62,
            Some(&host),
        )
        .unwrap_err();
    assert_eq!(err.status(), Status::INVALID_IMAGE_SIZE);

    let err = context
        .create_image_3d(
            MemFlags::COPY_HOST_PTR,
            &ImageFormat::R8,
            4,
            4,
            4,
            16,
            usize::MAX - usize::MAX % 16,
            Some(&host),
        )
        .unwrap_err();
    assert_eq!(err.status(), Status::INVALID_IMAGE_SIZE);
    assert_eq!(rt.live_objects(), live);
}

#[test]
fn image_with_zero_dimension_is_rejected() {
    let (_rt, context) = gpu_context();
    let err = context
        .create_image_2d(MemFlags::READ_ONLY, &ImageFormat::RGBA8, 0, 4, 0, None)
        .unwrap_err();
    assert_eq!(
        err,
        OpalError::ImageCreation {
            operation: Operation::CreateImage2D,
            status: Status::INVALID_IMAGE_SIZE,
        }
    );

    let err = context
        .create_image_3d(MemFlags::READ_ONLY, &ImageFormat::R8, 4, 4, 0, 0, 0, None)
        .unwrap_err();
    assert_eq!(err.operation(), Operation::CreateImage3D);
    assert_eq!(err.status(), Status::INVALID_IMAGE_SIZE);
}

#[test]
fn image_with_invalid_format_descriptor_is_rejected() {
    let (_rt, context) = gpu_context();
    let bad = ImageFormat::new(ChannelOrder::RGB, ChannelType::Float);
    let err = context
        .create_image_2d(MemFlags::READ_ONLY, &bad, 4, 4, 0, None)
        .unwrap_err();
    assert_eq!(err.status(), Status::INVALID_IMAGE_FORMAT_DESCRIPTOR);
}

#[test]
fn image_with_unsupported_format_is_rejected() -> anyhow::Result<()> {
    let config = HostConfig::default().with_supported_image_formats(vec![ImageFormat::RGBA8]);
    let (_rt, context) = gpu_context_with(config);

    context.create_image_2d(MemFlags::READ_ONLY, &ImageFormat::RGBA8, 4, 4, 0, None)?;
    let err = context
        .create_image_2d(MemFlags::READ_ONLY, &ImageFormat::R32F, 4, 4, 0, None)
        .unwrap_err();
    assert_eq!(err.status(), Status::IMAGE_FORMAT_NOT_SUPPORTED);
    Ok(())
}

#[test]
fn image_on_device_without_image_support_is_rejected() {
    let config = HostConfig::empty()
        .with_platform(PlatformConfig::new("Acc").with_device(DeviceConfig::accelerator("A")));
    let platform = Platform::first(Arc::new(HostRuntime::with_config(&config))).unwrap();
    let context = Context::from_type(&platform, DeviceType::ACCELERATOR).unwrap();

    let err = context
        .create_image_2d(MemFlags::READ_ONLY, &ImageFormat::RGBA8, 4, 4, 0, None)
        .unwrap_err();
    assert_eq!(err.status(), Status::INVALID_OPERATION);
}

// ============================================================================
// Sampler Tests
// ============================================================================

#[test]
fn sampler_records_its_state() -> anyhow::Result<()> {
    let (_rt, context) = gpu_context();
    let sampler = context.create_sampler(true, AddressingMode::Repeat, FilterMode::Linear)?;
    assert!(sampler.normalized_coords());
    assert_eq!(sampler.addressing_mode(), AddressingMode::Repeat);
    assert_eq!(sampler.filter_mode(), FilterMode::Linear);
    Ok(())
}

#[test]
fn sampler_repeat_requires_normalized_coords() {
    let (_rt, context) = gpu_context();
    for mode in [AddressingMode::Repeat, AddressingMode::MirroredRepeat] {
        let err = context
            .create_sampler(false, mode, FilterMode::Nearest)
            .unwrap_err();
        assert_eq!(
            err,
            OpalError::SamplerCreation {
                operation: Operation::CreateSampler,
                status: Status::INVALID_VALUE,
            }
        );
    }
    context
        .create_sampler(false, AddressingMode::ClampToEdge, FilterMode::Nearest)
        .unwrap();
}
