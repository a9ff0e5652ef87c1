use std::sync::mpsc;

/// Timestamp pair bracketing the shader render pass.
///
/// Measures device-side execution only: the beginning/end-of-pass timestamps
/// exclude CPU dispatch overhead. The readback is synchronous at the end of
/// the frame, mirroring how an OpenGL elapsed-time query would be consumed.
/// When the adapter lacks `TIMESTAMP_QUERY` the timer is inert and every
/// read returns `None`.
pub(crate) struct FrameTimer {
    inner: Option<TimerResources>,
}

struct TimerResources {
    query_set: wgpu::QuerySet,
    resolve_buffer: wgpu::Buffer,
    readback_buffer: wgpu::Buffer,
}

const TIMESTAMP_COUNT: u32 = 2;
const BUFFER_SIZE: u64 = TIMESTAMP_COUNT as u64 * 8;

impl FrameTimer {
    pub(crate) fn new(device: &wgpu::Device, supported: bool) -> Self {
        if !supported {
            return Self { inner: None };
        }

        let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("frame timer queries"),
            ty: wgpu::QueryType::Timestamp,
            count: TIMESTAMP_COUNT,
        });
        let resolve_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame timer resolve"),
            size: BUFFER_SIZE,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame timer readback"),
            size: BUFFER_SIZE,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            inner: Some(TimerResources {
                query_set,
                resolve_buffer,
                readback_buffer,
            }),
        }
    }

    /// Timestamp writes to attach to the shader render pass.
    pub(crate) fn timestamp_writes(&self) -> Option<wgpu::RenderPassTimestampWrites<'_>> {
        self.inner
            .as_ref()
            .map(|timer| wgpu::RenderPassTimestampWrites {
                query_set: &timer.query_set,
                beginning_of_pass_write_index: Some(0),
                end_of_pass_write_index: Some(1),
            })
    }

    /// Resolves the query pair into the mappable readback buffer. Must be
    /// encoded after the timed pass and before submit.
    pub(crate) fn resolve(&self, encoder: &mut wgpu::CommandEncoder) {
        if let Some(timer) = &self.inner {
            encoder.resolve_query_set(&timer.query_set, 0..TIMESTAMP_COUNT, &timer.resolve_buffer, 0);
            encoder.copy_buffer_to_buffer(
                &timer.resolve_buffer,
                0,
                &timer.readback_buffer,
                0,
                BUFFER_SIZE,
            );
        }
    }

    /// Reads back the elapsed device time of the most recent frame in
    /// nanoseconds. Blocks until the submitted work completes.
    pub(crate) fn read_elapsed_ns(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Option<u64> {
        let timer = self.inner.as_ref()?;

        let slice = timer.readback_buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        if device.poll(wgpu::PollType::Wait).is_err() {
            return None;
        }
        match receiver.recv() {
            Ok(Ok(())) => {}
            _ => return None,
        }

        let elapsed = {
            let data = slice.get_mapped_range();
            let timestamps: &[u64] = bytemuck::cast_slice(&data);
            timestamps[1].saturating_sub(timestamps[0])
        };
        timer.readback_buffer.unmap();

        let period = queue.get_timestamp_period() as f64;
        Some((elapsed as f64 * period) as u64)
    }
}
