// pipeline.rs - per-frame draw sequence for the spinning cube

use crate::config::RenderConfig;
use crate::render::buffers::{GeometryBuffers, COLOR_LAYOUT, INDEX_TYPE, POSITION_LAYOUT};
use crate::render::camera::{Camera, Viewport};
use crate::render::context::{BufferTarget, ClearMask, DepthFunc, RenderContext, Topology};
use crate::render::mesh::Mesh;
use crate::render::shaders::{build_program, cube_shaders, Program, ShaderBindings, ShaderSource};
use crate::utils::diagnostics::Diagnostics;
use crate::utils::error::Result;

/// Accumulated rotation angle in radians.
///
/// Only ever grows: each frame adds `elapsed * rate`. The sum is kept in
/// `f64` so small frame deltas still register after days of uptime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationClock {
    angle: f64,
    rate: f32,
}

impl AnimationClock {
    pub fn new(rate: f32) -> Self {
        Self { angle: 0.0, rate }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// The angle wrapped to one turn, for building the model-view matrix.
    pub fn phase(&self) -> f32 {
        self.angle.rem_euclid(std::f64::consts::TAU) as f32
    }

    pub fn advance(&mut self, elapsed_secs: f32) {
        self.angle += f64::from(elapsed_secs.max(0.0)) * f64::from(self.rate);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Nothing was issued; the renderer never reached `Ready`.
    Skipped,
    Drawn,
}

struct Resources<C: RenderContext> {
    program: Program<C>,
    geometry: GeometryBuffers<C>,
}

/// Owns the linked program, the cube buffers and the rotation clock, and
/// issues the full draw sequence once per tick.
pub struct FrameRenderer<C: RenderContext> {
    camera: Camera,
    clear_color: [f32; 4],
    clear_depth: f32,
    clock: AnimationClock,
    resources: Option<Resources<C>>,
}

impl<C: RenderContext> FrameRenderer<C> {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            camera: Camera::from_config(config),
            clear_color: config.clear_color,
            clear_depth: config.clear_depth,
            clock: AnimationClock::new(config.angular_rate),
            resources: None,
        }
    }

    pub fn state(&self) -> RendererState {
        match self.resources {
            Some(_) => RendererState::Ready,
            None => RendererState::Uninitialized,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.resources.is_some()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn rotation(&self) -> f64 {
        self.clock.angle()
    }

    pub fn program(&self) -> Option<&Program<C>> {
        self.resources.as_ref().map(|r| &r.program)
    }

    pub fn geometry(&self) -> Option<&GeometryBuffers<C>> {
        self.resources.as_ref().map(|r| &r.geometry)
    }

    /// Builds the program and uploads `mesh`, moving to `Ready`.
    ///
    /// Nothing is leaked on failure and the previous state is kept, so a
    /// `Ready` renderer keeps drawing with its old program and buffers.
    pub fn setup(
        &mut self,
        ctx: &C,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
        bindings: &ShaderBindings,
        mesh: &Mesh,
    ) -> Result<()> {
        let program = build_program(ctx, vertex, fragment, bindings)?;
        let geometry = match GeometryBuffers::build(ctx, mesh) {
            Ok(geometry) => geometry,
            Err(err) => {
                program.release(ctx);
                return Err(err);
            }
        };

        self.release(ctx);
        self.resources = Some(Resources { program, geometry });
        log::info!("renderer ready ({} indices)", mesh.index_count());
        Ok(())
    }

    /// [`setup`](Self::setup) with the built-in cube shaders and mesh.
    ///
    /// A failure is reported to `diagnostics` exactly once and also returned.
    pub fn setup_cube(&mut self, ctx: &C, diagnostics: &mut dyn Diagnostics) -> Result<()> {
        let result = self.setup(
            ctx,
            &cube_shaders::vertex(),
            &cube_shaders::fragment(),
            &ShaderBindings::default(),
            &Mesh::cube(),
        );
        if let Err(err) = &result {
            diagnostics.report(&err.to_string());
        }
        result
    }

    /// Swaps in new geometry between frames. Returns false when not `Ready`.
    pub fn replace_mesh(&mut self, ctx: &C, mesh: &Mesh) -> Result<bool> {
        match self.resources.as_mut() {
            Some(resources) => {
                resources.geometry.rebuild(ctx, mesh)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs one frame, then advances the rotation by `elapsed_secs`.
    ///
    /// Handles are trusted here; nothing is re-validated per frame.
    pub fn tick(&mut self, ctx: &C, viewport: Viewport, elapsed_secs: f32) -> FrameOutcome {
        let Some(resources) = self.resources.as_ref() else {
            return FrameOutcome::Skipped;
        };
        let locations = resources.program.locations();
        let geometry = &resources.geometry;

        ctx.clear_color(self.clear_color);
        ctx.clear_depth(self.clear_depth);
        ctx.enable_depth_test(DepthFunc::LessOrEqual);
        ctx.clear(ClearMask::COLOR_AND_DEPTH);

        let projection = self.camera.projection_matrix(viewport.aspect_ratio());
        let model_view = self.camera.model_view_matrix(self.clock.phase());

        ctx.bind_buffer(BufferTarget::Array, Some(geometry.position()));
        locations.position.bind_if_present(|&index| {
            ctx.vertex_attrib_pointer(index, POSITION_LAYOUT);
            ctx.enable_vertex_attrib_array(index);
        });

        ctx.bind_buffer(BufferTarget::Array, Some(geometry.color()));
        locations.color.bind_if_present(|&index| {
            ctx.vertex_attrib_pointer(index, COLOR_LAYOUT);
            ctx.enable_vertex_attrib_array(index);
        });

        ctx.bind_buffer(BufferTarget::ElementArray, Some(geometry.index()));

        resources.program.activate(ctx);

        locations
            .projection_matrix
            .bind_if_present(|loc| ctx.uniform_matrix4(loc, &projection.to_cols_array()));
        locations
            .model_view_matrix
            .bind_if_present(|loc| ctx.uniform_matrix4(loc, &model_view.to_cols_array()));

        ctx.draw_elements(Topology::Triangles, geometry.index_count(), INDEX_TYPE, 0);

        self.clock.advance(elapsed_secs);
        log::trace!("frame drawn, rotation {:.3}", self.clock.angle());
        FrameOutcome::Drawn
    }

    /// Deletes the program and buffers and returns to `Uninitialized`.
    /// The rotation clock keeps its value.
    pub fn release(&mut self, ctx: &C) {
        if let Some(Resources { program, geometry }) = self.resources.take() {
            program.release(ctx);
            geometry.release(ctx);
            log::debug!("renderer resources released");
        }
    }
}
