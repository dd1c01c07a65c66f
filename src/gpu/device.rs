use bytemuck::{self, Pod, Zeroable};
use num::Complex;
use pollster;
use std::mem;
use std::sync::mpsc;
use wgpu;
use wgpu::util::DeviceExt;

use super::unavailable;
use errors::SampleError;
use escape::{EscapeTime, EscapeTimeSampler};
use grid::SampleGrid;
use newton::{NewtonPixel, NewtonSampler};
use threads::{for_each_band, PixelKernel};

const WORKGROUP_SIZE: u32 = 16;

// Newton pixel states written by the shader.
const UNSETTLED: u32 = 0;
const SETTLED: u32 = 1;
const OVERFLOWED: u32 = 2;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct EscapeParams {
    origin_re: f32,
    origin_im: f32,
    step_re: f32,
    step_im: f32,
    c_re: f32,
    c_im: f32,
    width: u32,
    height: u32,
    max_itr: u32,
    julia: u32,
    _pad: [u32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct NewtonParams {
    origin_re: f32,
    origin_im: f32,
    step_re: f32,
    step_im: f32,
    width: u32,
    height: u32,
    max_itr: u32,
    degree: u32,
    tolerance: f32,
    _pad: [u32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GpuComplex {
    re: f32,
    im: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GpuNewtonPixel {
    re: f32,
    im: f32,
    iterations: u32,
    status: u32,
}

fn to_gpu(coeffs: &[Complex<f64>]) -> Vec<GpuComplex> {
    coeffs
        .iter()
        .map(|c| GpuComplex {
            re: c.re as f32,
            im: c.im as f32,
        })
        .collect()
}

/// An open GPU device with both sampling pipelines compiled.
pub struct Device {
    device: wgpu::Device,
    queue: wgpu::Queue,
    escape_time: wgpu::ComputePipeline,
    newton: wgpu::ComputePipeline,
    name: String,
}

impl Device {
    /// Opens the highest-performance adapter on the machine.
    pub fn acquire() -> Result<Device, SampleError> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| unavailable("no GPU adapter found"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("fractal-sampler-device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
            },
            None,
        ))
        .map_err(|e| unavailable(&format!("could not open GPU device: {}", e)))?;

        let escape_time = Device::pipeline(&device, "escape-time", include_str!("escape_time.wgsl"));
        let newton = Device::pipeline(&device, "newton", include_str!("newton.wgsl"));

        Ok(Device {
            device,
            queue,
            escape_time,
            newton,
            name: adapter.get_info().name,
        })
    }

    fn pipeline(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ComputePipeline {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: None,
            module: &module,
            entry_point: "main",
        })
    }

    /// The adapter's name, for logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Escape-time counts in computation order (row 0 on `start.im`).
    pub fn escape_time(
        &self,
        grid: &SampleGrid,
        sampler: &EscapeTimeSampler,
    ) -> Result<Vec<u32>, SampleError> {
        let (julia, c) = match sampler.kind() {
            EscapeTime::Mandelbrot => (0, Complex::new(0.0, 0.0)),
            EscapeTime::Julia(c) => (1, c),
        };
        let origin = grid.origin();
        let step = grid.step();
        let params = EscapeParams {
            origin_re: origin.re as f32,
            origin_im: origin.im as f32,
            step_re: step.0 as f32,
            step_im: step.1 as f32,
            c_re: c.re as f32,
            c_im: c.im as f32,
            width: grid.x_resolution as u32,
            height: grid.y_resolution as u32,
            max_itr: sampler.max_itr(),
            julia,
            _pad: [0; 2],
        };

        self.run::<u32>(
            &self.escape_time,
            grid,
            bytemuck::bytes_of(&params),
            &[],
        )
    }

    /// Newton results in computation order.  Root matching is left to
    /// the caller.
    ///
    /// The shader works in single precision, so it settles on a
    /// residual relative to the size of the polynomial's terms, or on a
    /// step that no longer moves `z`, rather than on the absolute
    /// residual.  Settled pixels are then carried to the sampler's own
    /// tolerance on the host, and a pixel whose iteration overflowed
    /// single precision is sampled again on the host from scratch.
    pub fn newton(
        &self,
        grid: &SampleGrid,
        sampler: &NewtonSampler,
    ) -> Result<Vec<NewtonPixel>, SampleError> {
        let origin = grid.origin();
        let step = grid.step();
        let params = NewtonParams {
            origin_re: origin.re as f32,
            origin_im: origin.im as f32,
            step_re: step.0 as f32,
            step_im: step.1 as f32,
            width: grid.x_resolution as u32,
            height: grid.y_resolution as u32,
            max_itr: sampler.max_itr(),
            degree: sampler.polynomial().degree() as u32,
            tolerance: sampler.tolerance() as f32,
            _pad: [0; 3],
        };
        let coeffs = to_gpu(sampler.polynomial().coeffs());
        let slopes = to_gpu(sampler.derivative().coeffs());

        let raw = self.run::<GpuNewtonPixel>(
            &self.newton,
            grid,
            bytemuck::bytes_of(&params),
            &[bytemuck::cast_slice(&coeffs), bytemuck::cast_slice(&slopes)],
        )?;

        let width = grid.x_resolution;
        let mut pixels = vec![NewtonPixel::default(); raw.len()];
        for_each_band(&mut pixels, width, 0, |rows, chunk| {
            let first = rows.start * width;
            for (offset, cell) in chunk.iter_mut().enumerate() {
                let index = first + offset;
                let p = raw[index];
                let pixel = NewtonPixel {
                    approx_root: Complex::new(f64::from(p.re), f64::from(p.im)),
                    iterations: p.iterations,
                };
                *cell = match p.status {
                    SETTLED => sampler.refine(pixel),
                    OVERFLOWED => sampler.sample(grid.point(index / width, index % width)),
                    _ => pixel,
                };
            }
        });
        let overflowed = raw.iter().filter(|p| p.status == OVERFLOWED).count();
        if overflowed > 0 {
            debug!("{} pixels overflowed on the GPU and were resampled", overflowed);
        }
        Ok(pixels)
    }

    /// Binds `params` at 0, each input at the following bindings, and
    /// a `T` per pixel as the last binding; dispatches one invocation
    /// per pixel; and blocks until the output is back on the host.
    fn run<T: Pod>(
        &self,
        pipeline: &wgpu::ComputePipeline,
        grid: &SampleGrid,
        params: &[u8],
        inputs: &[&[u8]],
    ) -> Result<Vec<T>, SampleError> {
        let limits = self.device.limits();
        let output_size = (grid.len() * mem::size_of::<T>()) as u64;
        if output_size > u64::from(limits.max_storage_buffer_binding_size)
            || output_size > limits.max_buffer_size
        {
            return Err(unavailable(&format!(
                "a {}x{} grid does not fit in one GPU buffer",
                grid.x_resolution, grid.y_resolution
            )));
        }

        let groups_x = (grid.x_resolution as u32 + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
        let groups_y = (grid.y_resolution as u32 + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
        let max_groups = limits.max_compute_workgroups_per_dimension;
        if groups_x > max_groups || groups_y > max_groups {
            return Err(unavailable(&format!(
                "a {}x{} grid needs more workgroups than the GPU allows",
                grid.x_resolution, grid.y_resolution
            )));
        }

        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("params"),
                contents: params,
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let input_buffers: Vec<wgpu::Buffer> = inputs
            .iter()
            .map(|&contents| {
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("input"),
                        contents,
                        usage: wgpu::BufferUsages::STORAGE,
                    })
            })
            .collect();

        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("output"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let readback_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: output_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: params_buffer.as_entire_binding(),
        }];
        for (i, buffer) in input_buffers.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 1 + i as u32,
                resource: buffer.as_entire_binding(),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: 1 + input_buffers.len() as u32,
            resource: output_buffer.as_entire_binding(),
        });

        let layout = pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bindings"),
            layout: &layout,
            entries: &entries,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sample"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("sample"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        encoder.copy_buffer_to_buffer(&output_buffer, 0, &readback_buffer, 0, output_size);
        self.queue.submit(Some(encoder.finish()));

        let slice = readback_buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        match receiver.recv() {
            Ok(Ok(())) => (),
            Ok(Err(e)) => return Err(unavailable(&format!("GPU readback failed: {}", e))),
            Err(_) => return Err(unavailable("GPU readback never completed")),
        }

        let cells = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, T>(&data).to_vec()
        };
        readback_buffer.unmap();
        Ok(cells)
    }
}
