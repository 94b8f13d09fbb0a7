//! Lists every platform and device a runtime exposes, then allocates a few
//! resources on the first GPU context.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example list_devices
//! RUST_LOG=debug cargo run --example list_devices --features opencl
//! ```

use std::sync::Arc;

use opal::{ComputeRuntime, Context, DeviceType, ImageFormat, MemFlags, Platform, QueueProperties};

#[cfg(feature = "opencl")]
fn runtime() -> Arc<dyn ComputeRuntime> {
    Arc::new(opal::OpenClRuntime::new())
}

#[cfg(not(feature = "opencl"))]
fn runtime() -> Arc<dyn ComputeRuntime> {
    Arc::new(opal::HostRuntime::new())
}

fn main() -> opal::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runtime = runtime();
    for platform in Platform::all(Arc::clone(&runtime))? {
        println!("{} ({})", platform.name()?, platform.version()?);
        for device in platform.devices(DeviceType::ALL)? {
            println!(
                "  {:<24} {:?}  mem {} MiB  max alloc {} MiB  images: {}",
                device.name()?,
                device.device_type()?,
                device.global_mem_size()? >> 20,
                device.max_mem_alloc_size()? >> 20,
                device.image_support()?,
            );
        }
    }

    let platform = Platform::first(runtime)?;
    let context = Context::from_type(&platform, DeviceType::GPU)?;
    let Some(device) = context.devices()?.into_iter().next() else {
        log::warn!("GPU context reports no devices, skipping allocations");
        return Ok(());
    };
    let queue = context.create_command_queue(&device, QueueProperties::empty())?;
    let input = context.create_buffer_from_slice(MemFlags::READ_ONLY, &[0.5f32; 1024])?;
    let image = context.create_image_2d(
        MemFlags::WRITE_ONLY,
        &ImageFormat::RGBA8,
        640,
        480,
        0,
        None,
    )?;
    let program = context.create_program("__kernel void fill(__global float* out) {}")?;

    log::info!(
        "Queue {:?} on {}, buffer {} bytes, image row pitch {}, program {} bytes",
        queue.raw(),
        device.name()?,
        input.size(),
        image.row_pitch(),
        program.source().len()
    );
    Ok(())
}
