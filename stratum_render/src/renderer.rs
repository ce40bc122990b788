// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderer backends.
//!
//! One closed variant set, selected once at initialization from the
//! output surface's capabilities:
//!
//! - [`HardwareRenderer`] drives an abstract [`GpuDevice`] (the GL/
//!   shader specifics live behind that trait, out of scope here).
//! - [`SoftwareRenderer`] rasterizes the root pass into an owned RGBA
//!   buffer. It runs resourceless: assembly guarantees a single pass.
//! - [`DelegatingRenderer`] forwards finished pass lists to a remote
//!   compositor and flow-controls on swap acks.
//!
//! All variants implement the same draw/swap/capability contract via
//! [`Renderer`]'s inherent methods. Quads are drawn in reverse of their
//! stored front-to-back order.

use kurbo::{Rect, Size, Vec2};
use stratum_core::geom::{Color, intersect_nonempty, rect_is_empty};

use crate::pass::{DrawQuad, FrameData, RenderPassId, SharedQuadState};

/// What the renderer can do, as reported to the frame pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RendererCapabilities {
    /// Whether damage-scissored partial swaps are supported.
    pub partial_swap: bool,
    /// Whether frames are forwarded to a remote compositor.
    pub delegated_rendering: bool,
    /// How many unacked frames may be in flight.
    pub max_frames_pending: u8,
    /// Whether this is the software fallback.
    pub using_software: bool,
}

/// Capabilities of the output surface the renderer binds to.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputSurfaceCaps {
    /// A GPU context is available.
    pub has_gpu: bool,
    /// The surface forwards frames instead of presenting them.
    pub delegated_rendering: bool,
    /// Software rendering is forced regardless of GPU availability.
    pub forced_software: bool,
    /// The surface supports partial swaps.
    pub partial_swap: bool,
    /// Maximum in-flight frames before throttling.
    pub max_frames_pending: u8,
}

/// Per-frame metadata handed to the presentation layer with each swap.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameMetadata {
    /// Device scale factor.
    pub device_scale: f64,
    /// Current total page scale.
    pub page_scale: f64,
    /// Minimum allowed page scale.
    pub min_page_scale: f64,
    /// Maximum allowed page scale.
    pub max_page_scale: f64,
    /// Root scroll offset.
    pub root_scroll_offset: Vec2,
    /// Scrollable viewport size in layout pixels.
    pub scrollable_viewport_size: Size,
    /// Scrollable content size in layout pixels.
    pub content_size: Size,
    /// Top-controls offset (how much is hidden).
    pub top_controls_offset: f64,
    /// On-screen-keyboard inset, if any.
    pub keyboard_inset: f64,
}

/// Per-draw parameters, shared by all renderer variants.
#[derive(Clone, Copy, Debug)]
pub struct DrawParams {
    /// Device scale factor for this draw.
    pub device_scale: f64,
    /// Viewport rect in physical pixels.
    pub viewport: Rect,
    /// Clip rect applied to the whole frame.
    pub clip: Rect,
    /// Whether the caller permits a damage-scissored partial swap.
    pub allow_partial_swap: bool,
    /// Whether image filtering should be disabled (fast-path scrolling).
    pub disable_image_filtering: bool,
}

/// The abstract GPU behind the hardware renderer.
///
/// Shader and API specifics live behind this trait; tests use a
/// recording mock.
pub trait GpuDevice {
    /// Binds a pass as the draw target.
    fn begin_pass(&mut self, id: RenderPassId, output_rect: Rect, scissor: Option<Rect>);
    /// Draws one quad with its shared state.
    fn draw_quad(&mut self, state: &SharedQuadState, quad: &DrawQuad);
    /// Finishes the bound pass.
    fn end_pass(&mut self);
    /// Presents the frame.
    fn swap(&mut self);
    /// Synchronous readback of `rect`, tightly packed RGBA.
    fn readback(&mut self, rect: Rect) -> Vec<u8>;
}

/// GPU-backed renderer.
pub struct HardwareRenderer {
    device: Box<dyn GpuDevice>,
    partial_swap: bool,
    max_frames_pending: u8,
    visible: bool,
    frames_pending: u8,
}

impl core::fmt::Debug for HardwareRenderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HardwareRenderer")
            .field("partial_swap", &self.partial_swap)
            .field("visible", &self.visible)
            .field("frames_pending", &self.frames_pending)
            .finish_non_exhaustive()
    }
}

impl HardwareRenderer {
    fn draw_frame(&mut self, frame: &FrameData, params: &DrawParams) {
        for pass in &frame.passes {
            let scissor = (params.allow_partial_swap && self.partial_swap)
                .then_some(pass.damage_rect)
                .filter(|damage| !rect_is_empty(*damage));
            self.device.begin_pass(pass.id, pass.output_rect, scissor);
            for quad in pass.quads.iter().rev() {
                let state = &pass.shared_states[quad.shared_index()];
                self.device.draw_quad(state, quad);
            }
            self.device.end_pass();
        }
    }
}

/// CPU rasterizing renderer (resourceless: root pass only).
#[derive(Debug)]
pub struct SoftwareRenderer {
    width: usize,
    height: usize,
    framebuffer: Vec<u32>,
    visible: bool,
    frames_pending: u8,
}

impl SoftwareRenderer {
    /// Creates a renderer with a zeroed framebuffer.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            framebuffer: vec![0; width * height],
            visible: true,
            frames_pending: 0,
        }
    }

    fn draw_frame(&mut self, frame: &FrameData, params: &DrawParams) {
        debug_assert!(
            frame.passes.len() == 1,
            "software renderer draws exactly one pass"
        );
        let Some(pass) = frame.root_pass() else {
            return;
        };
        let scissor = if params.allow_partial_swap {
            intersect_nonempty(pass.damage_rect, params.clip)
        } else {
            params.clip
        };
        for quad in pass.quads.iter().rev() {
            let state = &pass.shared_states[quad.shared_index()];
            let bounds = intersect_nonempty(
                intersect_nonempty(quad.rect(), state.clip),
                intersect_nonempty(scissor, params.viewport),
            );
            if rect_is_empty(bounds) {
                continue;
            }
            match quad {
                DrawQuad::SolidColor { color, .. } => {
                    self.fill(bounds, *color, state.opacity);
                }
                DrawQuad::Checkerboard { .. } => self.fill_checkerboard(bounds),
                DrawQuad::Tile { resource, .. } => {
                    // No pixel store behind resources here; tiles render
                    // as an id-derived placeholder shade.
                    let shade = 0.25 + 0.5 * ((resource.0 % 7) as f32 / 7.0);
                    self.fill(bounds, Color::new(shade, shade, shade, 1.0), state.opacity);
                }
                DrawQuad::Overhang { .. } => {
                    self.fill(bounds, Color::new(0.85, 0.85, 0.85, 1.0), state.opacity);
                }
                DrawQuad::Pass { .. } => {
                    debug_assert!(false, "pass quads cannot appear in resourceless mode");
                }
            }
        }
    }

    fn fill(&mut self, rect: Rect, color: Color, opacity: f32) {
        let (x0, y0, x1, y1) = self.clamp_to_buffer(rect);
        let alpha = (color.rgba[3] * opacity).clamp(0.0, 1.0);
        for y in y0..y1 {
            for x in x0..x1 {
                let dst = &mut self.framebuffer[y * self.width + x];
                *dst = blend_over(*dst, color, alpha);
            }
        }
    }

    fn fill_checkerboard(&mut self, rect: Rect) {
        let (x0, y0, x1, y1) = self.clamp_to_buffer(rect);
        for y in y0..y1 {
            for x in x0..x1 {
                let light = ((x / 8) + (y / 8)) % 2 == 0;
                let value = if light { 0.93 } else { 0.80 };
                let color = Color::new(value, value, value, 1.0);
                let dst = &mut self.framebuffer[y * self.width + x];
                *dst = blend_over(*dst, color, 1.0);
            }
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "rects are clamped to the buffer before converting"
    )]
    fn clamp_to_buffer(&self, rect: Rect) -> (usize, usize, usize, usize) {
        let x0 = rect.x0.max(0.0).floor() as usize;
        let y0 = rect.y0.max(0.0).floor() as usize;
        let x1 = (rect.x1.ceil().max(0.0) as usize).min(self.width);
        let y1 = (rect.y1.ceil().max(0.0) as usize).min(self.height);
        (x0.min(x1), y0.min(y1), x1, y1)
    }

    fn pixels_in(&self, rect: Rect) -> Vec<u8> {
        let (x0, y0, x1, y1) = self.clamp_to_buffer(rect);
        let mut out = Vec::with_capacity((x1 - x0) * (y1 - y0) * 4);
        for y in y0..y1 {
            let row = &self.framebuffer[y * self.width + x0..y * self.width + x1];
            out.extend_from_slice(bytemuck::cast_slice(row));
        }
        out
    }
}

/// Packs a color into `0xAABBGGRR`, the byte order RGBA in memory on
/// little-endian targets.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "channel values are clamped into u8 range first"
)]
fn pack(r: f32, g: f32, b: f32, a: f32) -> u32 {
    let to_byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u32;
    to_byte(r) | (to_byte(g) << 8) | (to_byte(b) << 16) | (to_byte(a) << 24)
}

fn blend_over(dst: u32, src: Color, alpha: f32) -> u32 {
    if alpha >= 1.0 {
        return pack(src.rgba[0], src.rgba[1], src.rgba[2], 1.0);
    }
    let unpack = |v: u32, shift: u32| ((v >> shift) & 0xFF) as f32 / 255.0;
    let blend = |s: f32, d: f32| s * alpha + d * (1.0 - alpha);
    pack(
        blend(src.rgba[0], unpack(dst, 0)),
        blend(src.rgba[1], unpack(dst, 8)),
        blend(src.rgba[2], unpack(dst, 16)),
        alpha + unpack(dst, 24) * (1.0 - alpha),
    )
}

/// Compact description of one pass in a delegated frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassSummary {
    /// Pass identity.
    pub id: RenderPassId,
    /// Output rect of the pass.
    pub output_rect: Rect,
    /// Damage scissor of the pass.
    pub damage_rect: Rect,
    /// Number of quads in the pass.
    pub quad_count: usize,
}

/// A frame queued for a remote compositor.
#[derive(Clone, Debug, PartialEq)]
pub struct DelegatedFrame {
    /// Pass descriptions, contributing-before-referencing order.
    pub passes: Vec<PassSummary>,
    /// Metadata attached at swap time.
    pub metadata: FrameMetadata,
}

/// Renderer that forwards frames to a remote compositor.
#[derive(Debug, Default)]
pub struct DelegatingRenderer {
    max_frames_pending: u8,
    frames_pending: u8,
    staged: Option<Vec<PassSummary>>,
    queued: Vec<DelegatedFrame>,
    visible: bool,
}

impl DelegatingRenderer {
    /// Creates a delegating renderer with the given in-flight cap.
    #[must_use]
    pub fn new(max_frames_pending: u8) -> Self {
        Self {
            max_frames_pending: max_frames_pending.max(1),
            visible: true,
            ..Self::default()
        }
    }

    fn draw_frame(&mut self, frame: &FrameData) {
        self.staged = Some(
            frame
                .passes
                .iter()
                .map(|pass| PassSummary {
                    id: pass.id,
                    output_rect: pass.output_rect,
                    damage_rect: pass.damage_rect,
                    quad_count: pass.quads.len(),
                })
                .collect(),
        );
    }

    /// Drains frames queued for the remote side.
    pub fn take_delegated_frames(&mut self) -> Vec<DelegatedFrame> {
        core::mem::take(&mut self.queued)
    }

    /// Returns whether another swap may start without exceeding the
    /// in-flight cap.
    #[must_use]
    pub fn can_swap(&self) -> bool {
        self.frames_pending < self.max_frames_pending
    }
}

/// The renderer, selected once at initialization.
#[derive(Debug)]
pub enum Renderer {
    /// GPU-backed drawing through a [`GpuDevice`].
    Hardware(HardwareRenderer),
    /// CPU rasterization fallback.
    Software(SoftwareRenderer),
    /// Forwarding to a remote compositor.
    Delegating(DelegatingRenderer),
}

impl Renderer {
    /// Selects and constructs a renderer variant from output-surface
    /// capabilities.
    ///
    /// Delegated surfaces always delegate; a GPU surface gets the
    /// hardware renderer when a device is supplied and software is not
    /// forced; everything else falls back to software.
    #[must_use]
    pub fn new(
        caps: OutputSurfaceCaps,
        device: Option<Box<dyn GpuDevice>>,
        viewport: (usize, usize),
    ) -> Self {
        if caps.delegated_rendering {
            return Self::Delegating(DelegatingRenderer::new(caps.max_frames_pending));
        }
        if caps.has_gpu && !caps.forced_software {
            if let Some(device) = device {
                return Self::Hardware(HardwareRenderer {
                    device,
                    partial_swap: caps.partial_swap,
                    max_frames_pending: caps.max_frames_pending.max(1),
                    visible: true,
                    frames_pending: 0,
                });
            }
        }
        Self::Software(SoftwareRenderer::new(viewport.0, viewport.1))
    }

    /// Draws the frame's pass list.
    pub fn draw_frame(&mut self, frame: &FrameData, params: &DrawParams) {
        match self {
            Self::Hardware(renderer) => renderer.draw_frame(frame, params),
            Self::Software(renderer) => renderer.draw_frame(frame, params),
            Self::Delegating(renderer) => renderer.draw_frame(frame),
        }
    }

    /// Presents (or forwards) the drawn frame with its metadata.
    pub fn swap_buffers(&mut self, metadata: FrameMetadata) {
        match self {
            Self::Hardware(renderer) => {
                renderer.device.swap();
                renderer.frames_pending = renderer.frames_pending.saturating_add(1);
            }
            Self::Software(renderer) => {
                renderer.frames_pending = renderer.frames_pending.saturating_add(1);
            }
            Self::Delegating(renderer) => {
                let passes = renderer.staged.take().unwrap_or_default();
                renderer.queued.push(DelegatedFrame { passes, metadata });
                renderer.frames_pending = renderer.frames_pending.saturating_add(1);
            }
        }
    }

    /// Acknowledges one presented frame, releasing throttling.
    pub fn receive_swap_ack(&mut self) {
        let pending = match self {
            Self::Hardware(renderer) => &mut renderer.frames_pending,
            Self::Software(renderer) => &mut renderer.frames_pending,
            Self::Delegating(renderer) => &mut renderer.frames_pending,
        };
        *pending = pending.saturating_sub(1);
    }

    /// Synchronous framebuffer readback, tightly packed RGBA.
    ///
    /// `None` when the variant has no local pixels (delegating).
    pub fn framebuffer_pixels(&mut self, rect: Rect) -> Option<Vec<u8>> {
        match self {
            Self::Hardware(renderer) => Some(renderer.device.readback(rect)),
            Self::Software(renderer) => Some(renderer.pixels_in(rect)),
            Self::Delegating(_) => None,
        }
    }

    /// Propagates visibility to the backend.
    pub fn set_visible(&mut self, visible: bool) {
        match self {
            Self::Hardware(renderer) => renderer.visible = visible,
            Self::Software(renderer) => renderer.visible = visible,
            Self::Delegating(renderer) => renderer.visible = visible,
        }
    }

    /// Reports the active variant's capabilities.
    #[must_use]
    pub fn capabilities(&self) -> RendererCapabilities {
        match self {
            Self::Hardware(renderer) => RendererCapabilities {
                partial_swap: renderer.partial_swap,
                delegated_rendering: false,
                max_frames_pending: renderer.max_frames_pending,
                using_software: false,
            },
            Self::Software(_) => RendererCapabilities {
                partial_swap: true,
                delegated_rendering: false,
                max_frames_pending: 1,
                using_software: true,
            },
            Self::Delegating(renderer) => RendererCapabilities {
                partial_swap: false,
                delegated_rendering: true,
                max_frames_pending: renderer.max_frames_pending,
                using_software: false,
            },
        }
    }
}
