//! Context Tests
//!
//! Tests for:
//! - Platform / Device discovery against the host runtime
//! - Context: construction by device type and by explicit device list
//! - Context::devices: size-then-fill query, idempotence, order
//! - CommandQueue: device binding, foreign devices, property validation
//! - Program: source retention, empty source rejection

use std::collections::HashSet;
use std::sync::Arc;

use opal::runtime::host::{DeviceConfig, PlatformConfig};
use opal::{
    CommandQueue, Context, DeviceType, HostConfig, HostRuntime, OpalError, Operation, Platform,
    QueueProperties, Status,
};

fn default_platform() -> (Arc<HostRuntime>, Platform) {
    let rt = Arc::new(HostRuntime::new());
    let platform = Platform::first(rt.clone()).expect("default topology has a platform");
    (rt, platform)
}

/// A platform with three GPUs, one CPU, and one accelerator.
fn wide_platform() -> Platform {
    let config = HostConfig::empty().with_platform(
        PlatformConfig::new("Wide")
            .with_device(DeviceConfig::gpu("GPU 0"))
            .with_device(DeviceConfig::gpu("GPU 1"))
            .with_device(DeviceConfig::cpu("CPU"))
            .with_device(DeviceConfig::gpu("GPU 2"))
            .with_device(DeviceConfig::accelerator("ACC")),
    );
    Platform::first(Arc::new(HostRuntime::with_config(&config))).unwrap()
}

// ============================================================================
// Discovery Tests
// ============================================================================

#[test]
fn platform_reports_configured_strings() -> anyhow::Result<()> {
    let (_rt, platform) = default_platform();
    assert_eq!(platform.version()?, "OpenCL 1.2 opal-host");
    assert_eq!(platform.profile()?, "FULL_PROFILE");
    assert!(!platform.name()?.is_empty());
    Ok(())
}

#[test]
fn platform_lists_devices_by_type() -> anyhow::Result<()> {
    let platform = wide_platform();
    assert_eq!(platform.devices(DeviceType::ALL)?.len(), 5);
    assert_eq!(platform.devices(DeviceType::GPU)?.len(), 3);
    assert_eq!(platform.devices(DeviceType::CPU)?.len(), 1);
    assert_eq!(platform.devices(DeviceType::GPU | DeviceType::CPU)?.len(), 4);
    assert_eq!(platform.devices(DeviceType::DEFAULT)?.len(), 1);
    Ok(())
}

#[test]
fn platform_without_matching_devices_returns_empty_list() -> anyhow::Result<()> {
    let (_rt, platform) = default_platform();
    assert!(platform.devices(DeviceType::ACCELERATOR)?.is_empty());
    Ok(())
}

#[test]
fn empty_topology_has_no_platform() {
    let rt = Arc::new(HostRuntime::with_config(&HostConfig::empty()));
    let err = Platform::first(rt).unwrap_err();
    assert_eq!(err.status(), Status::PLATFORM_NOT_FOUND_KHR);
    assert_eq!(err.operation(), Operation::ListPlatforms);
}

#[test]
fn device_reports_configured_info() -> anyhow::Result<()> {
    let (_rt, platform) = default_platform();
    let gpu = platform.devices(DeviceType::GPU)?.remove(0);

    assert_eq!(gpu.name()?, "Opal Host GPU");
    assert_eq!(gpu.device_type()?, DeviceType::GPU);
    assert!(gpu.image_support()?);
    assert!(gpu.max_mem_alloc_size()? <= gpu.global_mem_size()?);
    assert!(
        gpu.queue_properties()?
            .contains(QueueProperties::OUT_OF_ORDER_EXEC_MODE_ENABLE)
    );
    assert_eq!(gpu.platform()?, platform);
    Ok(())
}

// ============================================================================
// Context Construction Tests
// ============================================================================

#[test]
fn context_from_type_binds_every_matching_device() -> anyhow::Result<()> {
    let platform = wide_platform();
    for device_type in [
        DeviceType::GPU,
        DeviceType::CPU,
        DeviceType::ACCELERATOR,
        DeviceType::DEFAULT,
        DeviceType::ALL,
    ] {
        let expected = platform.devices(device_type)?;
        let context = Context::from_type(&platform, device_type)?;
        let devices = context.devices()?;

        assert!(!devices.is_empty(), "{device_type:?}");
        assert_eq!(devices.len(), expected.len(), "{device_type:?}");
        assert_eq!(context.num_devices()? as usize, devices.len());
    }
    Ok(())
}

#[test]
fn context_from_type_without_match_fails_with_device_not_found() {
    let (_rt, platform) = default_platform();
    let err = Context::from_type(&platform, DeviceType::ACCELERATOR).unwrap_err();
    assert_eq!(
        err,
        OpalError::ContextCreation {
            operation: Operation::CreateContextFromType,
            status: Status::DEVICE_NOT_FOUND,
        }
    );
}

#[test]
fn context_from_device_list_keeps_length_and_members() -> anyhow::Result<()> {
    let platform = wide_platform();
    let all = platform.devices(DeviceType::ALL)?;

    for n in 1..=all.len() {
        let chosen = &all[..n];
        let context = Context::from_devices(&platform, chosen)?;
        let devices = context.devices()?;

        assert_eq!(devices.len(), n);
        let chosen_set: HashSet<_> = chosen.iter().map(opal::Device::raw).collect();
        let bound_set: HashSet<_> = devices.iter().map(opal::Device::raw).collect();
        assert_eq!(chosen_set, bound_set);
    }
    Ok(())
}

#[test]
fn context_from_empty_device_list_fails_deterministically() {
    let (rt, platform) = default_platform();
    let first = Context::from_devices(&platform, &[]).unwrap_err();
    let second = Context::from_devices(&platform, &[]).unwrap_err();

    assert_eq!(first, second);
    assert_eq!(
        first,
        OpalError::ContextCreation {
            operation: Operation::CreateContext,
            status: Status::INVALID_VALUE,
        }
    );
    assert_eq!(rt.live_objects(), 0);
}

#[test]
fn context_from_repeated_devices_is_forwarded_as_given() -> anyhow::Result<()> {
    let (_rt, platform) = default_platform();
    let gpu = platform.devices(DeviceType::GPU)?.remove(0);

    let context = Context::from_devices(&platform, &[gpu.clone(), gpu.clone()])?;
    // The runtime ignores repeats, as a conforming driver does.
    assert_eq!(context.devices()?, vec![gpu]);
    assert_eq!(context.num_devices()?, 1);
    Ok(())
}

#[test]
fn context_rejects_device_from_another_platform() -> anyhow::Result<()> {
    let config = HostConfig::empty()
        .with_platform(PlatformConfig::new("A").with_device(DeviceConfig::gpu("A0")))
        .with_platform(PlatformConfig::new("B").with_device(DeviceConfig::gpu("B0")));
    let platforms = Platform::all(Arc::new(HostRuntime::with_config(&config)))?;
    let foreign = platforms[1].devices(DeviceType::ALL)?;

    let err = Context::from_devices(&platforms[0], &foreign).unwrap_err();
    assert_eq!(err.status(), Status::INVALID_DEVICE);
    Ok(())
}

#[test]
fn context_devices_query_is_idempotent() -> anyhow::Result<()> {
    let platform = wide_platform();
    let context = Context::from_type(&platform, DeviceType::ALL)?;

    let first = context.devices()?;
    let second = context.devices()?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn context_remembers_its_platform() -> anyhow::Result<()> {
    let (_rt, platform) = default_platform();
    let context = Context::from_type(&platform, DeviceType::CPU)?;
    assert_eq!(context.platform(), &platform);
    Ok(())
}

// ============================================================================
// Command Queue Tests
// ============================================================================

#[test]
fn queue_is_bound_to_the_requested_device() -> anyhow::Result<()> {
    let (_rt, platform) = default_platform();
    let context = Context::from_type(&platform, DeviceType::GPU)?;
    let devices = context.devices()?;
    assert_eq!(devices.len(), 1);
    let gpu = &devices[0];

    let queue: CommandQueue = context.create_command_queue(gpu, QueueProperties::empty())?;
    assert_eq!(queue.device(), gpu);
    assert_eq!(queue.properties(), QueueProperties::empty());
    assert!(!queue.is_out_of_order());
    Ok(())
}

#[test]
fn queue_on_device_outside_context_fails() -> anyhow::Result<()> {
    let (_rt, platform) = default_platform();
    let context = Context::from_type(&platform, DeviceType::GPU)?;
    let cpu = platform.devices(DeviceType::CPU)?.remove(0);

    let err = context
        .create_command_queue(&cpu, QueueProperties::empty())
        .unwrap_err();
    assert_eq!(
        err,
        OpalError::QueueCreation {
            operation: Operation::CreateCommandQueue,
            status: Status::INVALID_DEVICE,
        }
    );
    Ok(())
}

#[test]
fn queue_properties_must_be_supported_by_the_device() -> anyhow::Result<()> {
    let (_rt, platform) = default_platform();
    let context = Context::from_type(&platform, DeviceType::ALL)?;
    let gpu = platform.devices(DeviceType::GPU)?.remove(0);
    let cpu = platform.devices(DeviceType::CPU)?.remove(0);

    let ooo = QueueProperties::OUT_OF_ORDER_EXEC_MODE_ENABLE;
    assert!(context.create_command_queue(&gpu, ooo)?.is_out_of_order());

    let err = context.create_command_queue(&cpu, ooo).unwrap_err();
    assert_eq!(err.status(), Status::INVALID_QUEUE_PROPERTIES);
    Ok(())
}

// ============================================================================
// Program Tests
// ============================================================================

#[test]
fn program_keeps_a_copy_of_its_source() -> anyhow::Result<()> {
    let (_rt, platform) = default_platform();
    let context = Context::from_type(&platform, DeviceType::GPU)?;

    let text = String::from("__kernel void k(){}");
    let program = context.create_program(&text)?;
    drop(text);

    assert_eq!(program.source(), "__kernel void k(){}");
    Ok(())
}

#[test]
fn program_with_empty_source_is_rejected() -> anyhow::Result<()> {
    let (rt, platform) = default_platform();
    let context = Context::from_type(&platform, DeviceType::GPU)?;
    let live = rt.live_objects();

    let err = context.create_program("").unwrap_err();
    assert_eq!(
        err,
        OpalError::ProgramCreation {
            operation: Operation::CreateProgram,
            status: Status::INVALID_VALUE,
        }
    );
    assert_eq!(rt.live_objects(), live);
    Ok(())
}
