//! Audio device capture and stream management.
//!
//! Captures audio from a system device using cpal, mono-mixing callback data
//! into a fixed-size ring buffer the frame loop snapshots once per frame.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::utils::Config;

pub const BUFFER_SIZE: usize = 1024;

struct DeviceInfo {
    device: Device,
    name: String,
    is_input: bool,
}

pub struct SourcePipe {
    buffer: Arc<Mutex<Vec<f32>>>,
    _stream: Option<Stream>,
    // Auto-gain normalization state
    smoothed_peak: f32,
    target_level: f32,
}

impl SourcePipe {
    pub fn new() -> Self {
        let devices = Self::collect_devices();
        let buffer = Arc::new(Mutex::new(vec![0.0; BUFFER_SIZE]));

        let stream = match Self::pick_start_device(&devices) {
            Some(index) => {
                let info = &devices[index];
                let kind = if info.is_input { "input" } else { "output" };
                println!("[{}] Capturing: {} ({})", index, info.name, kind);
                Self::build_stream(info, Arc::clone(&buffer))
            }
            None => {
                eprintln!("No audio devices found, staying idle");
                None
            }
        };

        Self {
            buffer,
            _stream: stream,
            smoothed_peak: 0.1,
            target_level: 0.5,
        }
    }

    /// Whether a capture stream is up. This is the visualization's
    /// activation trigger.
    pub fn is_live(&self) -> bool {
        self._stream.is_some()
    }

    pub fn list_devices() {
        let host = cpal::default_host();
        println!("\n=== Audio Devices ===");

        let mut idx = 0;
        if let Ok(inputs) = host.input_devices() {
            for device in inputs {
                if let Ok(name) = device.name() {
                    println!("  [{}] {} (input)", idx, name);
                    idx += 1;
                }
            }
        }
        if let Ok(outputs) = host.output_devices() {
            for device in outputs {
                if let Ok(name) = device.name() {
                    println!("  [{}] {} (output)", idx, name);
                    idx += 1;
                }
            }
        }
        println!();
    }

    fn collect_devices() -> Vec<DeviceInfo> {
        let host = cpal::default_host();
        let mut devices = Vec::new();

        if let Ok(input_devices) = host.input_devices() {
            for device in input_devices {
                if let Ok(name) = device.name() {
                    devices.push(DeviceInfo {
                        device,
                        name,
                        is_input: true,
                    });
                }
            }
        }

        if let Ok(output_devices) = host.output_devices() {
            for device in output_devices {
                if let Ok(name) = device.name() {
                    devices.push(DeviceInfo {
                        device,
                        name,
                        is_input: false,
                    });
                }
            }
        }

        devices
    }

    /// Startup device preference: configured device, then a pipewire or
    /// pulse input (reliable on Linux), then the default output for loopback
    /// capture, else the first device listed.
    fn pick_start_device(devices: &[DeviceInfo]) -> Option<usize> {
        if devices.is_empty() {
            return None;
        }

        let config = Config::load();
        let preferred = config.preferred_device.as_ref().and_then(|name| {
            let is_input = config.preferred_device_is_input.unwrap_or(true);
            devices
                .iter()
                .position(|d| d.name == *name && d.is_input == is_input)
        });

        preferred
            .or_else(|| {
                devices
                    .iter()
                    .position(|d| d.is_input && d.name == "pipewire")
            })
            .or_else(|| devices.iter().position(|d| d.is_input && d.name == "pulse"))
            .or_else(|| {
                let host = cpal::default_host();
                let default_output = host.default_output_device().and_then(|d| d.name().ok());
                default_output
                    .and_then(|name| devices.iter().position(|d| !d.is_input && d.name == name))
            })
            .or(Some(0))
    }

    /// Get device config on a helper thread with a timeout (the call can
    /// hang on misbehaving devices).
    fn get_config_with_timeout(device: &Device, is_input: bool) -> Option<StreamConfig> {
        let timeout = Duration::from_secs(Config::load().device_timeout_secs());
        let device = device.clone();

        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let config = if is_input {
                device.default_input_config()
            } else {
                device.default_output_config()
            };
            let _ = tx.send(config);
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(config)) => Some(config.into()),
            Ok(Err(e)) => {
                eprintln!("  Failed to get device config: {}", e);
                None
            }
            Err(_) => {
                eprintln!("  Device config timed out after {:?}", timeout);
                None
            }
        }
    }

    fn build_stream(info: &DeviceInfo, audio_buffer: Arc<Mutex<Vec<f32>>>) -> Option<Stream> {
        let stream_config = Self::get_config_with_timeout(&info.device, info.is_input)?;
        let channels = stream_config.channels as usize;

        let err_fn = |err| eprintln!("Audio stream error: {}", err);

        let stream = info.device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mut buffer = audio_buffer.lock().unwrap();
                for chunk in data.chunks(channels) {
                    let sample: f32 = chunk.iter().sum::<f32>() / channels as f32;
                    buffer.remove(0);
                    buffer.push(sample);
                }
            },
            err_fn,
            None,
        );

        match stream {
            Ok(s) => {
                if let Err(e) = s.play() {
                    eprintln!("  Failed to play stream: {}", e);
                    return None;
                }
                Some(s)
            }
            Err(e) => {
                eprintln!("  Failed to build stream: {}", e);
                None
            }
        }
    }

    /// Snapshot of the ring buffer with auto-gain normalization applied.
    pub fn stream(&mut self) -> Vec<f32> {
        let buffer = self.buffer.lock().unwrap().clone();

        let current_peak = buffer.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Fast attack when the signal gets louder, slow release when quieter
        if current_peak > self.smoothed_peak {
            self.smoothed_peak = self.smoothed_peak * 0.8 + current_peak * 0.2;
        } else {
            self.smoothed_peak = self.smoothed_peak * 0.995 + current_peak * 0.005;
        }

        let safe_peak = self.smoothed_peak.max(0.001);
        let gain = (self.target_level / safe_peak).clamp(0.5, 10.0);

        buffer.iter().map(|s| (s * gain).clamp(-1.0, 1.0)).collect()
    }
}
