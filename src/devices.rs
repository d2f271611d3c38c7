//! Local audio device discovery
//!
//! With the `audio-io` feature, devices come from cpal's default host.
//! Without it (or when the host reports nothing) a single system-default
//! entry is returned for each direction so the UI always has a selection.

use crate::transport::{AudioDeviceInfo, MediaDevices};

/// Name used when no real device list is available
pub const SYSTEM_DEFAULT_DEVICE: &str = "System default";

/// Enumerate microphones and speakers
pub fn discover() -> MediaDevices {
    let mics = non_empty(list_input_devices());
    let speakers = non_empty(list_output_devices());
    MediaDevices::with_defaults(mics, speakers)
}

fn non_empty(devices: Vec<AudioDeviceInfo>) -> Vec<AudioDeviceInfo> {
    if devices.is_empty() {
        vec![AudioDeviceInfo {
            name: SYSTEM_DEFAULT_DEVICE.to_string(),
            is_default: true,
        }]
    } else {
        devices
    }
}

/// List available audio input devices
#[cfg(feature = "audio-io")]
pub fn list_input_devices() -> Vec<AudioDeviceInfo> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let default_device_name = host.default_input_device().and_then(|d| d.name().ok());

    host.input_devices()
        .map(|devices| {
            devices
                .filter_map(|device| {
                    let name = device.name().ok()?;
                    let is_default = default_device_name.as_deref() == Some(name.as_str());
                    Some(AudioDeviceInfo { name, is_default })
                })
                .collect()
        })
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to enumerate input devices: {}", e);
            Vec::new()
        })
}

/// List available audio output devices
#[cfg(feature = "audio-io")]
pub fn list_output_devices() -> Vec<AudioDeviceInfo> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let default_device_name = host.default_output_device().and_then(|d| d.name().ok());

    host.output_devices()
        .map(|devices| {
            devices
                .filter_map(|device| {
                    let name = device.name().ok()?;
                    let is_default = default_device_name.as_deref() == Some(name.as_str());
                    Some(AudioDeviceInfo { name, is_default })
                })
                .collect()
        })
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to enumerate output devices: {}", e);
            Vec::new()
        })
}

#[cfg(not(feature = "audio-io"))]
pub fn list_input_devices() -> Vec<AudioDeviceInfo> {
    Vec::new()
}

#[cfg(not(feature = "audio-io"))]
pub fn list_output_devices() -> Vec<AudioDeviceInfo> {
    Vec::new()
}
