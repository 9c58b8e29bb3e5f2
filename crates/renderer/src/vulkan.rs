//! [`PresentBackend`] implemented on Vulkan through `gsync_rhi`.

use std::fmt::Display;
use std::mem::ManuallyDrop;
use std::path::Path;
use std::sync::Arc;

use gsync_core::config::PresentationConfig;
use gsync_platform::{Surface, Window};
use gsync_rhi::command::{CommandBuffer, CommandPool};
use gsync_rhi::device::Device;
use gsync_rhi::instance::Instance;
use gsync_rhi::physical_device::select_physical_device;
use gsync_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout, push_constant_range};
use gsync_rhi::shader::{Shader, ShaderStage, spirv_path};
use gsync_rhi::swapchain::Swapchain;
use gsync_rhi::sync::{FrameSync, Semaphore};
use gsync_rhi::{RhiResult, vk};
use tracing::{debug, error, info};

use crate::engine::{AcquiredImage, PresentBackend};
use crate::error::{EngineError, EngineResult};
use crate::push_constants::BarPushConstants;

const CLEAR_COLOR: [f32; 4] = [0.2, 0.2, 0.2, 1.0];
/// Two triangles forming the bar quad, generated in the vertex shader.
const BAR_VERTEX_COUNT: u32 = 6;

struct FrameSlot {
    command_buffer: CommandBuffer,
    sync: FrameSync,
}

fn setup<E: Display>(step: &'static str) -> impl FnOnce(E) -> EngineError {
    move |e| EngineError::SetupFailure(format!("{}: {}", step, e))
}

/// Owns every Vulkan object of the test bench.
pub struct VulkanBackend {
    slots: Vec<FrameSlot>,
    /// Indexed by swapchain image, signaled by submit and waited by present.
    render_finished: Vec<Semaphore>,
    command_pool: ManuallyDrop<CommandPool>,
    pipeline: ManuallyDrop<Pipeline>,
    swapchain: ManuallyDrop<Swapchain>,
    surface: ManuallyDrop<Surface>,
    device: ManuallyDrop<Arc<Device>>,
    instance: ManuallyDrop<Instance>,
    width: u32,
    height: u32,
    acquire_timeout_ns: u64,
}

impl VulkanBackend {
    /// Creates the instance, surface, device, swapchain, command pool, bar
    /// pipeline and one frame slot per swapchain image.
    ///
    /// # Errors
    ///
    /// Any failing step is reported as [`EngineError::SetupFailure`]; objects
    /// created before it are released.
    pub fn new(window: &Window, config: &PresentationConfig) -> EngineResult<Self> {
        info!(
            "Initializing Vulkan backend ({}x{})",
            window.width(),
            window.height()
        );

        let extensions = window.required_extensions()?;
        let instance =
            Instance::new(extensions, config.validation).map_err(setup("instance creation"))?;
        let surface = window.create_surface(instance.entry(), instance.handle())?;

        let physical_device =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())
                .map_err(setup("GPU selection"))?;
        let device = Device::new(&instance, &physical_device).map_err(setup("device creation"))?;

        let swapchain = Swapchain::new(
            &instance,
            device.clone(),
            surface.handle(),
            window.width(),
            window.height(),
            config.vsync,
        )
        .map_err(setup("swapchain creation"))?;

        let command_pool = CommandPool::new(device.clone(), device.graphics_family())
            .map_err(setup("command pool creation"))?;
        let pipeline = create_bar_pipeline(&device, &config.shader_dir, swapchain.format())
            .map_err(setup("bar pipeline creation"))?;

        let image_count = swapchain.image_count();
        let slots = create_slots(&device, &command_pool, image_count)
            .map_err(setup("frame slot creation"))?;
        let render_finished =
            create_semaphores(&device, image_count).map_err(setup("semaphore creation"))?;

        info!(
            "Vulkan backend ready on '{}': {} frame slots, {:?}, validation {}",
            physical_device.device_name(),
            slots.len(),
            swapchain.present_mode(),
            if instance.has_validation() { "on" } else { "off" }
        );

        Ok(Self {
            slots,
            render_finished,
            command_pool: ManuallyDrop::new(command_pool),
            pipeline: ManuallyDrop::new(pipeline),
            swapchain: ManuallyDrop::new(swapchain),
            surface: ManuallyDrop::new(surface),
            device: ManuallyDrop::new(device),
            instance: ManuallyDrop::new(instance),
            width: window.width(),
            height: window.height(),
            acquire_timeout_ns: config.fence_timeout_ns,
        })
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.swapchain.present_mode()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }
}

fn create_bar_pipeline(
    device: &Arc<Device>,
    shader_dir: &Path,
    color_format: vk::Format,
) -> RhiResult<Pipeline> {
    let vertex = Shader::from_spirv_file(
        device.clone(),
        &spirv_path(shader_dir, "bar", ShaderStage::Vertex),
        ShaderStage::Vertex,
    )?;
    let fragment = Shader::from_spirv_file(
        device.clone(),
        &spirv_path(shader_dir, "bar", ShaderStage::Fragment),
        ShaderStage::Fragment,
    )?;

    let layout = PipelineLayout::new(
        device.clone(),
        &[push_constant_range::<BarPushConstants>(
            vk::ShaderStageFlags::VERTEX,
        )],
    )?;

    GraphicsPipelineBuilder::new()
        .vertex_shader(&vertex)
        .fragment_shader(&fragment)
        .color_format(color_format)
        .build(device.clone(), layout)
}

fn create_slots(
    device: &Arc<Device>,
    command_pool: &CommandPool,
    count: usize,
) -> RhiResult<Vec<FrameSlot>> {
    let buffers = command_pool.allocate(count as u32)?;
    let slots = buffers
        .into_iter()
        .map(|command_buffer| {
            Ok(FrameSlot {
                command_buffer,
                sync: FrameSync::new(device.clone())?,
            })
        })
        .collect::<RhiResult<Vec<_>>>()?;
    debug!("Created {} frame slots", slots.len());
    Ok(slots)
}

fn create_semaphores(device: &Arc<Device>, count: usize) -> RhiResult<Vec<Semaphore>> {
    (0..count).map(|_| Semaphore::new(device.clone())).collect()
}

impl PresentBackend for VulkanBackend {
    fn ring_size(&self) -> usize {
        self.slots.len()
    }

    fn wait_slot_fence(&mut self, slot: usize, timeout_ns: u64) -> EngineResult<()> {
        self.slots[slot]
            .sync
            .in_flight()
            .wait(timeout_ns)
            .map_err(EngineError::from_vk)
    }

    fn reset_slot_fence(&mut self, slot: usize) -> EngineResult<()> {
        self.slots[slot]
            .sync
            .in_flight()
            .reset()
            .map_err(EngineError::from_vk)
    }

    fn acquire_image(&mut self, slot: usize) -> EngineResult<AcquiredImage> {
        let semaphore = self.slots[slot].sync.image_available().handle();
        let (index, suboptimal) = self
            .swapchain
            .acquire_next_image(semaphore, self.acquire_timeout_ns)
            .map_err(EngineError::from_vk)?;
        Ok(AcquiredImage { index, suboptimal })
    }

    fn record_frame(&mut self, slot: usize, image: u32, position: f32) -> EngineResult<()> {
        let cmd = &self.slots[slot].command_buffer;
        let extent = self.swapchain.extent();
        let color_image = self.swapchain.image(image as usize);

        cmd.reset()?;
        cmd.begin()?;

        cmd.transition_color_image(
            color_image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        );

        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(self.swapchain.image_view(image as usize))
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: CLEAR_COLOR,
                },
            });
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let rendering_info = vk::RenderingInfo::default()
            .render_area(render_area)
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment));

        cmd.begin_rendering(&rendering_info);
        cmd.set_viewport(&vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        cmd.set_scissor(&render_area);
        cmd.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, self.pipeline.handle());
        cmd.push_constants(
            self.pipeline.layout(),
            vk::ShaderStageFlags::VERTEX,
            0,
            &BarPushConstants::new(position),
        );
        cmd.draw(BAR_VERTEX_COUNT, 1);
        cmd.end_rendering();

        cmd.transition_color_image(
            color_image,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
        );

        cmd.end()?;
        Ok(())
    }

    fn submit_frame(&mut self, slot: usize, image: u32) -> EngineResult<()> {
        let frame = &self.slots[slot];
        let wait_semaphores = [frame.sync.image_available().handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [self.render_finished[image as usize].handle()];
        let command_buffers = [frame.command_buffer.handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        // SAFETY: the command buffer was just recorded and the engine reset
        // this slot's fence after its previous submission completed.
        unsafe {
            self.device
                .submit_graphics(&[submit_info], frame.sync.in_flight().handle())
                .map_err(EngineError::from_vk)
        }
    }

    fn present_image(&mut self, _slot: usize, image: u32) -> EngineResult<bool> {
        self.swapchain
            .present(
                self.device.present_queue(),
                image,
                self.render_finished[image as usize].handle(),
            )
            .map_err(EngineError::from_vk)
    }

    fn wait_idle(&mut self) -> EngineResult<()> {
        self.device.wait_idle()?;
        Ok(())
    }

    fn rebuild(&mut self, vsync: bool) -> EngineResult<()> {
        self.swapchain.rebuild(self.width, self.height, vsync)?;

        let image_count = self.swapchain.image_count();
        if image_count != self.slots.len() {
            let old_buffers = self.slots.drain(..).map(|slot| slot.command_buffer).collect();
            self.command_pool.free(old_buffers);
            self.slots = create_slots(&self.device, &self.command_pool, image_count)?;
        }
        // Fresh semaphores for the new images; the old ones are idle after wait_idle.
        self.render_finished = create_semaphores(&self.device, image_count)?;

        info!(
            "Swapchain rebuilt: {:?}, {} images",
            self.swapchain.present_mode(),
            image_count
        );
        Ok(())
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait for device idle during backend drop: {:?}", e);
        }

        self.render_finished.clear();
        self.slots.clear();

        // Device objects first, then the surface, the device and the instance.
        // SAFETY: the device is idle and each field is dropped exactly once.
        unsafe {
            ManuallyDrop::drop(&mut self.command_pool);
            ManuallyDrop::drop(&mut self.pipeline);
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Vulkan backend destroyed");
    }
}
