use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, SampleFormat, SupportedStreamConfig};
use log::{debug, warn};
use std::collections::BTreeMap;

use crate::error::AudioError;

const COMMON_SAMPLE_RATES: [u32; 8] = [44100, 48000, 88200, 96000, 176400, 192000, 352800, 384000];

/// Information about an output device's capabilities
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    pub name: String,
    pub supported_sample_rates: Vec<u32>,
    pub max_channels: u16,
    pub default_config: SupportedStreamConfig,
}

impl DeviceCapabilities {
    pub fn default_sample_rate(&self) -> u32 {
        self.default_config.sample_rate().0
    }

    pub fn default_sample_format(&self) -> SampleFormat {
        self.default_config.sample_format()
    }
}

/// Enumerates output devices and tracks the selected one
pub struct DeviceManager {
    host: Host,
    devices: BTreeMap<String, Device>,
    current_device: Option<Device>,
    device_capabilities: BTreeMap<String, DeviceCapabilities>,
}

impl DeviceManager {
    pub fn new() -> Result<Self, AudioError> {
        let mut manager = DeviceManager {
            host: cpal::default_host(),
            devices: BTreeMap::new(),
            current_device: None,
            device_capabilities: BTreeMap::new(),
        };
        manager.refresh_devices()?;
        Ok(manager)
    }

    /// Re-enumerate output devices. Devices whose configuration cannot be
    /// queried are skipped.
    pub fn refresh_devices(&mut self) -> Result<(), AudioError> {
        self.devices.clear();
        self.device_capabilities.clear();

        let devices = self
            .host
            .output_devices()
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to enumerate devices: {}", e)))?;

        for device in devices {
            let Ok(device_name) = device.name() else {
                continue;
            };
            match Self::get_device_capabilities(&device, &device_name) {
                Ok(capabilities) => {
                    self.device_capabilities.insert(device_name.clone(), capabilities);
                    self.devices.insert(device_name, device);
                }
                Err(e) => warn!("Skipping output device {}: {}", device_name, e),
            }
        }

        debug!("Found {} output devices", self.devices.len());
        Ok(())
    }

    /// Device names in sorted order
    pub fn list_devices(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    pub fn get_capabilities(&self, device_name: &str) -> Option<&DeviceCapabilities> {
        self.device_capabilities.get(device_name)
    }

    /// Select a device by name; `None` selects the default device
    pub fn select_device(&mut self, device_name: Option<&str>) -> Result<(), AudioError> {
        match device_name {
            Some(name) => {
                let device = self.devices.get(name).cloned().ok_or_else(|| AudioError::DeviceNotFound {
                    device: name.to_string(),
                })?;
                self.current_device = Some(device);
                Ok(())
            }
            None => self.select_default_device(),
        }
    }

    /// Select a device by name, falling back to the default device when it
    /// is not available
    pub fn select_device_with_fallback(&mut self, device_name: Option<&str>) -> Result<(), AudioError> {
        match self.select_device(device_name) {
            Err(AudioError::DeviceNotFound { device }) => {
                warn!("Output device {} not found, using default device", device);
                self.select_default_device()
                    .map_err(|_| AudioError::DeviceNotFound { device })
            }
            other => other,
        }
    }

    pub fn select_default_device(&mut self) -> Result<(), AudioError> {
        let default_device = self
            .host
            .default_output_device()
            .ok_or_else(|| AudioError::InitializationFailed("No default output device available".to_string()))?;

        self.current_device = Some(default_device);
        Ok(())
    }

    pub fn current_device(&self) -> Option<&Device> {
        self.current_device.as_ref()
    }

    pub fn current_device_name(&self) -> Result<Option<String>, AudioError> {
        match &self.current_device {
            Some(device) => {
                let name = device
                    .name()
                    .map_err(|e| AudioError::InitializationFailed(format!("Failed to get device name: {}", e)))?;
                Ok(Some(name))
            }
            None => Ok(None),
        }
    }

    /// Whether a device runs natively at `sample_rate`
    pub fn supports_sample_rate(&self, device_name: &str, sample_rate: u32) -> bool {
        self.device_capabilities
            .get(device_name)
            .map(|caps| caps.supported_sample_rates.contains(&sample_rate))
            .unwrap_or(false)
    }

    fn get_device_capabilities(device: &Device, device_name: &str) -> Result<DeviceCapabilities, AudioError> {
        let default_config = device.default_output_config().map_err(|e| {
            AudioError::InitializationFailed(format!("Failed to get default config for {}: {}", device_name, e))
        })?;

        let supported_configs = device.supported_output_configs().map_err(|e| {
            AudioError::InitializationFailed(format!("Failed to get supported configs for {}: {}", device_name, e))
        })?;

        let mut sample_rates = Vec::new();
        let mut max_channels = 0;

        for config_range in supported_configs {
            let min_rate = config_range.min_sample_rate().0;
            let max_rate = config_range.max_sample_rate().0;
            for &rate in &COMMON_SAMPLE_RATES {
                if rate >= min_rate && rate <= max_rate && !sample_rates.contains(&rate) {
                    sample_rates.push(rate);
                }
            }
            max_channels = max_channels.max(config_range.channels());
        }

        let default_rate = default_config.sample_rate().0;
        if !sample_rates.contains(&default_rate) {
            sample_rates.push(default_rate);
        }
        sample_rates.sort_unstable();
        if max_channels == 0 {
            max_channels = default_config.channels();
        }

        Ok(DeviceCapabilities {
            name: device_name.to_string(),
            supported_sample_rates: sample_rates,
            max_channels,
            default_config,
        })
    }
}
