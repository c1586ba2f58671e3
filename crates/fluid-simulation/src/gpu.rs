//! GPU device setup and queue draining

use std::sync::mpsc;

use crate::error::{Result, SimulationError};

/// Device and queue the simulation submits to
#[derive(Clone, Debug)]
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Request a headless adapter and device.
    ///
    /// Fails when no adapter or device is available; there is no fallback.
    pub async fn new(backends: wgpu::Backends) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let adapter_info = adapter.get_info();
        log::info!("✓ Using GPU: {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("SPH Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Blocking variant of [`GpuContext::new`]
    pub fn new_blocking(backends: wgpu::Backends) -> Result<Self> {
        pollster::block_on(Self::new(backends))
    }

    /// Largest storage buffer binding the device accepts
    pub fn max_storage_binding(&self) -> u64 {
        self.device.limits().max_storage_buffer_binding_size as u64
    }

    /// Wait until every command batch submitted so far has finished on the GPU.
    pub async fn drain(&self) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        self.queue.on_submitted_work_done(move || {
            let _ = tx.send(());
        });
        self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })?;
        rx.recv().map_err(|_| {
            log::error!("Work-done callback dropped before firing");
            SimulationError::ChannelDisconnected
        })
    }

    /// Map `buffer` for reading, wait for it, and copy its contents out.
    ///
    /// The buffer must have `MAP_READ` usage and be unmapped.
    pub async fn read_buffer(&self, buffer: &wgpu::Buffer) -> Result<Vec<u8>> {
        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })?;

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::error!("Buffer map failed: {err:?}");
                return Err(err.into());
            }
            Err(_) => return Err(SimulationError::ChannelDisconnected),
        }

        let bytes = slice.get_mapped_range().to_vec();
        buffer.unmap();
        Ok(bytes)
    }
}
