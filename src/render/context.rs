//! The drawing-surface capability.
//!
//! Every GPU-facing step of the pipeline goes through [`RenderContext`], which
//! is threaded explicitly into each call instead of living in global state.
//! [`GlowContext`] backs it with a real GL context; `RecordingContext` backs it
//! with an in-memory command log.

use crate::render::shaders::ShaderStage;
use glow::HasContext;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data.
    Array,
    /// Triangle indices.
    ElementArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Uploaded once, drawn many times.
    StaticDraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Float,
    UnsignedShort,
}

impl DataType {
    pub fn size_in_bytes(self) -> usize {
        match self {
            DataType::Float => std::mem::size_of::<f32>(),
            DataType::UnsignedShort => std::mem::size_of::<u16>(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunc {
    Less,
    /// Nearer-or-equal fragments pass.
    LessOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
}

impl ClearMask {
    pub const COLOR_AND_DEPTH: ClearMask = ClearMask {
        color: true,
        depth: true,
    };
}

/// How an attribute is read out of the currently bound array buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttribLayout {
    pub components: i32,
    pub data_type: DataType,
    pub normalized: bool,
    /// Zero means tightly packed.
    pub stride: i32,
    pub offset: i32,
}

impl AttribLayout {
    pub const fn packed_floats(components: i32) -> Self {
        Self {
            components,
            data_type: DataType::Float,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }
}

/// Operations the pipeline needs from a rendering context.
///
/// Handles are opaque. Creation calls may fail and report the reason; every
/// other call assumes its handles are live.
pub trait RenderContext {
    type Shader: Copy + Debug + PartialEq;
    type Program: Copy + Debug + PartialEq;
    type Buffer: Copy + Debug + PartialEq;
    type UniformLocation: Clone + Debug;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;

    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>);
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    fn delete_buffer(&self, buffer: Self::Buffer);

    fn vertex_attrib_pointer(&self, index: u32, layout: AttribLayout);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn uniform_matrix4(&self, location: &Self::UniformLocation, columns: &[f32; 16]);

    fn clear_color(&self, rgba: [f32; 4]);
    fn clear_depth(&self, depth: f32);
    fn enable_depth_test(&self, func: DepthFunc);
    fn clear(&self, mask: ClearMask);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);

    fn draw_elements(&self, topology: Topology, count: i32, index_type: DataType, offset: i32);
}

/// [`RenderContext`] over a loaded `glow` context.
pub struct GlowContext {
    gl: glow::Context,
}

impl GlowContext {
    /// # Safety
    ///
    /// The GL context `gl` was loaded from must be current on the calling
    /// thread for as long as this value is used, and must outlive it.
    pub unsafe fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    /// Human-readable renderer/version string for startup logging.
    pub fn describe(&self) -> String {
        // SAFETY: see `new`.
        unsafe {
            format!(
                "{} ({})",
                self.gl.get_parameter_string(glow::RENDERER),
                self.gl.get_parameter_string(glow::VERSION)
            )
        }
    }
}

fn stage_enum(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn target_enum(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn type_enum(data_type: DataType) -> u32 {
    match data_type {
        DataType::Float => glow::FLOAT,
        DataType::UnsignedShort => glow::UNSIGNED_SHORT,
    }
}

// SAFETY (all methods below): `GlowContext::new` requires the context to be
// current on this thread, and the pipeline only passes handles it created.
impl RenderContext for GlowContext {
    type Shader = <glow::Context as HasContext>::Shader;
    type Program = <glow::Context as HasContext>::Program;
    type Buffer = <glow::Context as HasContext>::Buffer;
    type UniformLocation = <glow::Context as HasContext>::UniformLocation;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        unsafe { self.gl.create_shader(stage_enum(stage)) }
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.detach_shader(program, shader) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>) {
        unsafe { self.gl.bind_buffer(target_enum(target), buffer) }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let usage = match usage {
            BufferUsage::StaticDraw => glow::STATIC_DRAW,
        };
        unsafe { self.gl.buffer_data_u8_slice(target_enum(target), data, usage) }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn vertex_attrib_pointer(&self, index: u32, layout: AttribLayout) {
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                index,
                layout.components,
                type_enum(layout.data_type),
                layout.normalized,
                layout.stride,
                layout.offset,
            )
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn uniform_matrix4(&self, location: &Self::UniformLocation, columns: &[f32; 16]) {
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(Some(location), false, columns)
        }
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        unsafe { self.gl.clear_color(rgba[0], rgba[1], rgba[2], rgba[3]) }
    }

    fn clear_depth(&self, depth: f32) {
        unsafe { self.gl.clear_depth_f32(depth) }
    }

    fn enable_depth_test(&self, func: DepthFunc) {
        let func = match func {
            DepthFunc::Less => glow::LESS,
            DepthFunc::LessOrEqual => glow::LEQUAL,
        };
        unsafe {
            self.gl.enable(glow::DEPTH_TEST);
            self.gl.depth_func(func);
        }
    }

    fn clear(&self, mask: ClearMask) {
        let mut bits = 0;
        if mask.color {
            bits |= glow::COLOR_BUFFER_BIT;
        }
        if mask.depth {
            bits |= glow::DEPTH_BUFFER_BIT;
        }
        unsafe { self.gl.clear(bits) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn draw_elements(&self, topology: Topology, count: i32, index_type: DataType, offset: i32) {
        let mode = match topology {
            Topology::Triangles => glow::TRIANGLES,
        };
        unsafe {
            self.gl
                .draw_elements(mode, count, type_enum(index_type), offset)
        }
    }
}
