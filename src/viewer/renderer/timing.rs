//! GPU timestamp queries with non-blocking readback.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::pipeline::timing::QueryReadback;
use crate::pipeline::PassKind;

/// Passes measured on the GPU; the GUI pass is timed on the CPU.
pub const GPU_PASSES: [PassKind; 5] = [
    PassKind::Geometry,
    PassKind::Ssao,
    PassKind::Lighting,
    PassKind::Forward,
    PassKind::Cubemap,
];

/// Begin and end tick per GPU pass
pub const QUERY_COUNT: u32 = GPU_PASSES.len() as u32 * 2;

const BUFFER_SIZE: wgpu::BufferAddress = QUERY_COUNT as wgpu::BufferAddress * 8;

const MAP_PENDING: u8 = 0;
const MAP_READY: u8 = 1;
const MAP_FAILED: u8 = 2;

/// Timestamp query set plus the buffers its results travel through.
///
/// One frame's queries are in flight at a time. While a readback is still
/// mapping, later frames render without timestamps and report unavailable.
pub struct GpuTimer {
    device: Arc<wgpu::Device>,
    query_set: wgpu::QuerySet,
    resolve_buffer: wgpu::Buffer,
    readback_buffer: wgpu::Buffer,
    period_ns: f32,
    map_state: Arc<AtomicU8>,
    in_flight: bool,
}

impl GpuTimer {
    /// `None` unless the device was created with `TIMESTAMP_QUERY`.
    pub fn new(device: Arc<wgpu::Device>, queue: &wgpu::Queue) -> Option<Self> {
        if !device.features().contains(wgpu::Features::TIMESTAMP_QUERY) {
            tracing::info!("timestamp queries unsupported, pass timings disabled");
            return None;
        }

        let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("pass_timestamps"),
            ty: wgpu::QueryType::Timestamp,
            count: QUERY_COUNT,
        });
        let resolve_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("timestamp_resolve"),
            size: BUFFER_SIZE,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("timestamp_readback"),
            size: BUFFER_SIZE,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Some(Self {
            device,
            query_set,
            resolve_buffer,
            readback_buffer,
            period_ns: queue.get_timestamp_period(),
            map_state: Arc::new(AtomicU8::new(MAP_PENDING)),
            in_flight: false,
        })
    }

    /// True while the previous frame's results are still being read back.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Timestamp writes for `pass`. A pass split over two render passes asks
    /// for the beginning on the first and the end on the second.
    pub fn writes(&self, pass: PassKind, begin: bool, end: bool) -> Option<wgpu::RenderPassTimestampWrites<'_>> {
        if self.in_flight {
            return None;
        }
        let slot = GPU_PASSES.iter().position(|p| *p == pass)? as u32 * 2;
        Some(wgpu::RenderPassTimestampWrites {
            query_set: &self.query_set,
            beginning_of_pass_write_index: begin.then_some(slot),
            end_of_pass_write_index: end.then_some(slot + 1),
        })
    }

    /// Encode the resolve and the copy into the readback buffer.
    pub fn resolve(&self, encoder: &mut wgpu::CommandEncoder) {
        if self.in_flight {
            return;
        }
        encoder.resolve_query_set(&self.query_set, 0..QUERY_COUNT, &self.resolve_buffer, 0);
        encoder.copy_buffer_to_buffer(&self.resolve_buffer, 0, &self.readback_buffer, 0, BUFFER_SIZE);
    }

    /// Start mapping the readback buffer; call after the frame was submitted.
    pub fn request_readback(&mut self) {
        if self.in_flight {
            return;
        }
        self.map_state.store(MAP_PENDING, Ordering::Release);
        let state = Arc::clone(&self.map_state);
        self.readback_buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            let value = if result.is_ok() { MAP_READY } else { MAP_FAILED };
            state.store(value, Ordering::Release);
        });
        self.in_flight = true;
    }
}

impl QueryReadback for GpuTimer {
    fn try_read(&mut self) -> Option<Vec<u64>> {
        if !self.in_flight {
            return None;
        }
        if let Err(e) = self.device.poll(wgpu::PollType::Poll) {
            tracing::warn!("device poll failed while reading timestamps: {e}");
        }
        match self.map_state.load(Ordering::Acquire) {
            MAP_READY => {
                let ticks = {
                    let data = self.readback_buffer.slice(..).get_mapped_range();
                    data.chunks_exact(8).map(bytemuck::pod_read_unaligned::<u64>).collect()
                };
                self.readback_buffer.unmap();
                self.in_flight = false;
                Some(ticks)
            }
            MAP_FAILED => {
                tracing::warn!("timestamp readback failed to map");
                self.in_flight = false;
                None
            }
            _ => None,
        }
    }

    fn period_ns(&self) -> f32 {
        self.period_ns
    }
}
