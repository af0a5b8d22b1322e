// shaders.rs - shader compilation, program linking and location lookup

use crate::render::context::RenderContext;
use crate::utils::error::{RenderError, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Source text for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    stage: ShaderStage,
    text: String,
}

impl ShaderSource {
    pub fn new(stage: ShaderStage, text: impl Into<String>) -> Self {
        Self {
            stage,
            text: text.into(),
        }
    }

    pub fn vertex(text: impl Into<String>) -> Self {
        Self::new(ShaderStage::Vertex, text)
    }

    pub fn fragment(text: impl Into<String>) -> Self {
        Self::new(ShaderStage::Fragment, text)
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A successfully compiled stage.
///
/// Handles are released explicitly since deletion needs the context;
/// [`link`] takes ownership and releases them once the program is built.
#[derive(Debug)]
pub struct CompiledShader<C: RenderContext> {
    handle: C::Shader,
    stage: ShaderStage,
}

impl<C: RenderContext> CompiledShader<C> {
    pub fn handle(&self) -> C::Shader {
        self.handle
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn release(self, ctx: &C) {
        ctx.delete_shader(self.handle);
    }
}

/// Compiles one stage. On failure the shader object is deleted and the
/// compiler log is returned in the error.
pub fn compile<C: RenderContext>(ctx: &C, source: &ShaderSource) -> Result<CompiledShader<C>> {
    let stage = source.stage();
    let shader = ctx
        .create_shader(stage)
        .map_err(|reason| RenderError::Allocation {
            resource: "shader",
            reason,
        })?;

    ctx.shader_source(shader, source.text());
    ctx.compile_shader(shader);

    if !ctx.shader_compile_status(shader) {
        let log = ctx.shader_info_log(shader);
        ctx.delete_shader(shader);
        return Err(RenderError::Compile { stage, log });
    }

    log::debug!("compiled {} shader {:?}", stage, shader);
    Ok(CompiledShader {
        handle: shader,
        stage,
    })
}

/// Symbolic names the pipeline looks up in a linked program.
///
/// These must match the shader text exactly, case included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBindings {
    pub position: String,
    pub color: String,
    pub projection_matrix: String,
    pub model_view_matrix: String,
}

impl Default for ShaderBindings {
    fn default() -> Self {
        Self {
            position: "aVertexPosition".into(),
            color: "aVertexColor".into(),
            projection_matrix: "uProjectionMatrix".into(),
            model_view_matrix: "uModelViewMatrix".into(),
        }
    }
}

/// A location that may be absent from the program.
///
/// Absence is legal: the shader simply does not use that input, and the
/// corresponding binding step is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding<T>(Option<T>);

impl<T> Binding<T> {
    pub fn found(location: T) -> Self {
        Self(Some(location))
    }

    pub fn missing() -> Self {
        Self(None)
    }

    pub fn is_found(&self) -> bool {
        self.0.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    /// Runs `bind` only when the location was resolved.
    pub fn bind_if_present<R>(&self, bind: impl FnOnce(&T) -> R) -> Option<R> {
        self.0.as_ref().map(bind)
    }
}

impl<T> From<Option<T>> for Binding<T> {
    fn from(location: Option<T>) -> Self {
        Self(location)
    }
}

pub fn resolve_attribute<C: RenderContext>(ctx: &C, program: &Program<C>, name: &str) -> Binding<u32> {
    lookup_attribute(ctx, program.handle, name)
}

pub fn resolve_uniform<C: RenderContext>(
    ctx: &C,
    program: &Program<C>,
    name: &str,
) -> Binding<C::UniformLocation> {
    lookup_uniform(ctx, program.handle, name)
}

fn lookup_attribute<C: RenderContext>(ctx: &C, program: C::Program, name: &str) -> Binding<u32> {
    let location = ctx.attrib_location(program, name);
    if location.is_none() {
        log::warn!("Attribute '{}' not found in shader", name);
    }
    location.into()
}

fn lookup_uniform<C: RenderContext>(
    ctx: &C,
    program: C::Program,
    name: &str,
) -> Binding<C::UniformLocation> {
    let location = ctx.uniform_location(program, name);
    if location.is_none() {
        log::warn!("Uniform '{}' not found in shader", name);
    }
    location.into()
}

/// Every location the frame pipeline needs, resolved once after linking.
#[derive(Debug, Clone)]
pub struct ProgramLocations<U> {
    pub position: Binding<u32>,
    pub color: Binding<u32>,
    pub projection_matrix: Binding<U>,
    pub model_view_matrix: Binding<U>,
}

impl<U> ProgramLocations<U> {
    fn resolve<C>(ctx: &C, program: C::Program, bindings: &ShaderBindings) -> Self
    where
        C: RenderContext<UniformLocation = U>,
    {
        Self {
            position: lookup_attribute(ctx, program, &bindings.position),
            color: lookup_attribute(ctx, program, &bindings.color),
            projection_matrix: lookup_uniform(ctx, program, &bindings.projection_matrix),
            model_view_matrix: lookup_uniform(ctx, program, &bindings.model_view_matrix),
        }
    }
}

/// A linked vertex + fragment program and its resolved locations.
#[derive(Debug)]
pub struct Program<C: RenderContext> {
    handle: C::Program,
    bindings: ShaderBindings,
    locations: ProgramLocations<C::UniformLocation>,
}

impl<C: RenderContext> Program<C> {
    pub fn handle(&self) -> C::Program {
        self.handle
    }

    pub fn bindings(&self) -> &ShaderBindings {
        &self.bindings
    }

    pub fn locations(&self) -> &ProgramLocations<C::UniformLocation> {
        &self.locations
    }

    pub fn activate(&self, ctx: &C) {
        ctx.use_program(Some(self.handle));
    }

    /// Links a new shader pair into the same program object.
    ///
    /// Locations from the previous link are discarded and resolved again. If
    /// linking fails the program object is deleted.
    pub fn relink(
        self,
        ctx: &C,
        vertex: CompiledShader<C>,
        fragment: CompiledShader<C>,
    ) -> Result<Program<C>> {
        let Program {
            handle, bindings, ..
        } = self;
        link_into(ctx, handle, vertex, fragment, bindings)
    }

    pub fn release(self, ctx: &C) {
        ctx.delete_program(self.handle);
    }
}

/// Links a vertex and fragment shader into a program.
///
/// Both shaders are released afterwards whether or not linking succeeded.
pub fn link<C: RenderContext>(
    ctx: &C,
    vertex: CompiledShader<C>,
    fragment: CompiledShader<C>,
    bindings: &ShaderBindings,
) -> Result<Program<C>> {
    let program = match ctx.create_program() {
        Ok(program) => program,
        Err(reason) => {
            vertex.release(ctx);
            fragment.release(ctx);
            return Err(RenderError::Allocation {
                resource: "program",
                reason,
            });
        }
    };

    link_into(ctx, program, vertex, fragment, bindings.clone())
}

fn link_into<C: RenderContext>(
    ctx: &C,
    program: C::Program,
    vertex: CompiledShader<C>,
    fragment: CompiledShader<C>,
    bindings: ShaderBindings,
) -> Result<Program<C>> {
    if vertex.stage() != ShaderStage::Vertex || fragment.stage() != ShaderStage::Fragment {
        let log = format!(
            "expected a vertex and a fragment shader, got {} and {}",
            vertex.stage(),
            fragment.stage()
        );
        vertex.release(ctx);
        fragment.release(ctx);
        ctx.delete_program(program);
        return Err(RenderError::Link { log });
    }

    ctx.attach_shader(program, vertex.handle());
    ctx.attach_shader(program, fragment.handle());
    ctx.link_program(program);

    let linked = ctx.program_link_status(program);

    for shader in [vertex, fragment] {
        ctx.detach_shader(program, shader.handle());
        shader.release(ctx);
    }

    if !linked {
        let log = ctx.program_info_log(program);
        ctx.delete_program(program);
        return Err(RenderError::Link { log });
    }

    let locations = ProgramLocations::resolve(ctx, program, &bindings);
    log::debug!("linked program {:?}", program);

    Ok(Program {
        handle: program,
        bindings,
        locations,
    })
}

/// Compiles both stages and links them. A failed fragment compile releases
/// the already compiled vertex shader.
pub fn build_program<C: RenderContext>(
    ctx: &C,
    vertex: &ShaderSource,
    fragment: &ShaderSource,
    bindings: &ShaderBindings,
) -> Result<Program<C>> {
    let vertex = compile(ctx, vertex)?;
    let fragment = match compile(ctx, fragment) {
        Ok(fragment) => fragment,
        Err(err) => {
            vertex.release(ctx);
            return Err(err);
        }
    };

    link(ctx, vertex, fragment, bindings)
}

/// Built-in shaders for the colored cube.
pub mod cube_shaders {
    use super::ShaderSource;

    pub const VERTEX_SRC: &str = r#"
    attribute vec4 aVertexPosition;
    attribute vec4 aVertexColor;

    uniform mat4 uModelViewMatrix;
    uniform mat4 uProjectionMatrix;

    varying lowp vec4 vColor;

    void main(void) {
        gl_Position = uProjectionMatrix * uModelViewMatrix * aVertexPosition;
        vColor = aVertexColor;
    }
    "#;

    pub const FRAGMENT_SRC: &str = r#"
    varying lowp vec4 vColor;

    void main(void) {
        gl_FragColor = vColor;
    }
    "#;

    pub fn vertex() -> ShaderSource {
        ShaderSource::vertex(VERTEX_SRC)
    }

    pub fn fragment() -> ShaderSource {
        ShaderSource::fragment(FRAGMENT_SRC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{Command, RecordingContext};

    const BROKEN_FRAGMENT: &str = "void main() { gl_FragColor = vec4(1.0, 1.0, 1.0, 1.0); ";

    #[test]
    fn compile_returns_live_handle() {
        let ctx = RecordingContext::new();
        let shader = compile(&ctx, &cube_shaders::vertex()).unwrap();

        assert_eq!(shader.stage(), ShaderStage::Vertex);
        assert_eq!(ctx.live_shaders(), 1);
    }

    #[test]
    fn compile_failure_carries_log_and_releases_shader() {
        let ctx = RecordingContext::new();
        let err = compile(&ctx, &ShaderSource::fragment(BROKEN_FRAGMENT)).unwrap_err();

        match err {
            RenderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ctx.live_shaders(), 0);
    }

    #[test]
    fn compile_reports_allocation_failure() {
        let ctx = RecordingContext::new();
        ctx.fail_allocations(true);

        let err = compile(&ctx, &cube_shaders::vertex()).unwrap_err();
        assert!(matches!(err, RenderError::Allocation { resource: "shader", .. }));
    }

    #[test]
    fn link_resolves_declared_names_and_releases_shaders() {
        let ctx = RecordingContext::new();
        let program = build_program(
            &ctx,
            &cube_shaders::vertex(),
            &cube_shaders::fragment(),
            &ShaderBindings::default(),
        )
        .unwrap();

        let locations = program.locations();
        assert_eq!(locations.position, Binding::found(0));
        assert_eq!(locations.color, Binding::found(1));
        assert!(locations.projection_matrix.is_found());
        assert!(locations.model_view_matrix.is_found());

        assert_eq!(ctx.live_shaders(), 0);
        assert_eq!(ctx.live_programs(), 1);
    }

    #[test]
    fn undeclared_names_resolve_to_missing() {
        let ctx = RecordingContext::new();
        let program = build_program(
            &ctx,
            &cube_shaders::vertex(),
            &cube_shaders::fragment(),
            &ShaderBindings::default(),
        )
        .unwrap();

        assert!(!resolve_attribute(&ctx, &program, "aVertexNormal").is_found());
        assert!(!resolve_uniform(&ctx, &program, "uNormalMatrix").is_found());
        // lookups are case-sensitive
        assert!(!resolve_attribute(&ctx, &program, "avertexposition").is_found());
    }

    #[test]
    fn program_without_color_attribute_links_with_missing_color() {
        let ctx = RecordingContext::new();
        let vertex = ShaderSource::vertex(
            "attribute vec4 aVertexPosition;\n\
             uniform mat4 uModelViewMatrix;\n\
             uniform mat4 uProjectionMatrix;\n\
             void main() { gl_Position = uProjectionMatrix * uModelViewMatrix * aVertexPosition; }",
        );
        let fragment = ShaderSource::fragment("void main() { gl_FragColor = vec4(1.0); }");

        let program = build_program(&ctx, &vertex, &fragment, &ShaderBindings::default()).unwrap();
        assert!(program.locations().position.is_found());
        assert!(!program.locations().color.is_found());
    }

    #[test]
    fn link_failure_discards_program() {
        let ctx = RecordingContext::new();
        // fragment reads a varying the vertex stage never declares
        let fragment = ShaderSource::fragment(
            "varying lowp vec4 vTint;\nvoid main() { gl_FragColor = vTint; }",
        );

        let err = build_program(
            &ctx,
            &cube_shaders::vertex(),
            &fragment,
            &ShaderBindings::default(),
        )
        .unwrap_err();

        assert!(matches!(err, RenderError::Link { ref log } if log.contains("vTint")));
        assert_eq!(ctx.live_programs(), 0);
        assert_eq!(ctx.live_shaders(), 0);
    }

    #[test]
    fn swapped_stages_fail_to_link() {
        let ctx = RecordingContext::new();
        let vertex = compile(&ctx, &cube_shaders::vertex()).unwrap();
        let fragment = compile(&ctx, &cube_shaders::fragment()).unwrap();

        let err = link(&ctx, fragment, vertex, &ShaderBindings::default()).unwrap_err();
        assert!(matches!(err, RenderError::Link { .. }));
        assert_eq!(ctx.live_shaders(), 0);
        assert_eq!(ctx.live_programs(), 0);
    }

    #[test]
    fn fragment_compile_failure_releases_vertex_shader() {
        let ctx = RecordingContext::new();
        let err = build_program(
            &ctx,
            &cube_shaders::vertex(),
            &ShaderSource::fragment(BROKEN_FRAGMENT),
            &ShaderBindings::default(),
        )
        .unwrap_err();

        assert!(matches!(err, RenderError::Compile { stage: ShaderStage::Fragment, .. }));
        assert_eq!(ctx.live_shaders(), 0);
        assert!(!ctx
            .commands()
            .iter()
            .any(|c| matches!(c, Command::LinkProgram { .. })));
    }

    #[test]
    fn relink_reuses_program_object_and_refreshes_locations() {
        let ctx = RecordingContext::new();
        let bindings = ShaderBindings::default();
        let program = build_program(
            &ctx,
            &cube_shaders::vertex(),
            &cube_shaders::fragment(),
            &bindings,
        )
        .unwrap();
        let handle = program.handle();
        assert!(program.locations().color.is_found());

        let vertex = compile(
            &ctx,
            &ShaderSource::vertex(
                "attribute vec4 aVertexPosition;\n\
                 uniform mat4 uProjectionMatrix;\n\
                 void main() { gl_Position = uProjectionMatrix * aVertexPosition; }",
            ),
        )
        .unwrap();
        let fragment = compile(
            &ctx,
            &ShaderSource::fragment("void main() { gl_FragColor = vec4(1.0); }"),
        )
        .unwrap();

        let program = program.relink(&ctx, vertex, fragment).unwrap();
        assert_eq!(program.handle(), handle);
        assert!(!program.locations().color.is_found());
        assert!(!program.locations().model_view_matrix.is_found());
        assert!(program.locations().projection_matrix.is_found());
    }

    #[test]
    fn binding_runs_only_when_found() {
        let mut calls = 0;
        Binding::<u32>::missing().bind_if_present(|_| calls += 1);
        assert_eq!(calls, 0);

        let seen = Binding::found(7u32).bind_if_present(|loc| *loc);
        assert_eq!(seen, Some(7));
    }
}
