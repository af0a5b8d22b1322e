//! In-memory rendering context.
//!
//! `RecordingContext` logs every command it receives and emulates just enough
//! of a GLSL toolchain to exercise the pipeline without a GPU:
//!
//! - compiling checks that `()`/`{}` balance, that a `main` function exists
//!   and that statements end in `;` (a body statement left open before `}`,
//!   or two assignments on different lines with no `;` between them)
//! - linking requires one compiled vertex and one compiled fragment shader, and
//!   every fragment `varying` to be declared by the vertex stage
//! - attributes get locations in declaration order; uniforms from both stages
//!   get one location per distinct name
//!
//! Used for headless runs and throughout the test suite.

use crate::render::context::{
    AttribLayout, BufferTarget, BufferUsage, ClearMask, DataType, DepthFunc, RenderContext,
    Topology,
};
use crate::render::shaders::ShaderStage;
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordedShader(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordedProgram(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordedBuffer(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordedUniform {
    pub program: RecordedProgram,
    pub location: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateShader { shader: RecordedShader, stage: ShaderStage },
    ShaderSource { shader: RecordedShader },
    CompileShader { shader: RecordedShader },
    DeleteShader { shader: RecordedShader },
    CreateProgram { program: RecordedProgram },
    AttachShader { program: RecordedProgram, shader: RecordedShader },
    DetachShader { program: RecordedProgram, shader: RecordedShader },
    LinkProgram { program: RecordedProgram },
    DeleteProgram { program: RecordedProgram },
    UseProgram { program: Option<RecordedProgram> },
    CreateBuffer { buffer: RecordedBuffer },
    BindBuffer { target: BufferTarget, buffer: Option<RecordedBuffer> },
    BufferData { target: BufferTarget, len: usize, usage: BufferUsage },
    DeleteBuffer { buffer: RecordedBuffer },
    VertexAttribPointer { index: u32, layout: AttribLayout },
    EnableVertexAttribArray { index: u32 },
    UniformMatrix4 { location: RecordedUniform, columns: [f32; 16] },
    ClearColor { rgba: [f32; 4] },
    ClearDepth { depth: f32 },
    EnableDepthTest { func: DepthFunc },
    Clear { mask: ClearMask },
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    DrawElements { topology: Topology, count: i32, index_type: DataType, offset: i32 },
}

#[derive(Debug)]
struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<RecordedShader>,
    linked: bool,
    log: String,
    attributes: Vec<String>,
    uniforms: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    fail_allocations: bool,
    shaders: HashMap<RecordedShader, ShaderObject>,
    programs: HashMap<RecordedProgram, ProgramObject>,
    buffers: HashMap<RecordedBuffer, Vec<u8>>,
    bound: HashMap<BufferTarget, RecordedBuffer>,
    commands: Vec<Command>,
}

impl State {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct RecordingContext {
    state: RefCell<State>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `create_*` call fail.
    pub fn fail_allocations(&self, fail: bool) {
        self.state.borrow_mut().fail_allocations = fail;
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.borrow().commands.clone()
    }

    /// Returns the recorded commands and starts a fresh log.
    pub fn take_commands(&self) -> Vec<Command> {
        std::mem::take(&mut self.state.borrow_mut().commands)
    }

    pub fn draw_calls(&self) -> Vec<Command> {
        self.state
            .borrow()
            .commands
            .iter()
            .filter(|c| matches!(c, Command::DrawElements { .. }))
            .cloned()
            .collect()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn buffer_contents(&self, buffer: RecordedBuffer) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer).cloned()
    }

    fn record(&self, command: Command) {
        self.state.borrow_mut().commands.push(command);
    }
}

/// Names declared with `keyword` (e.g. `attribute`, `uniform`), in order.
fn declarations(source: &str, keyword: &str) -> Vec<String> {
    source
        .split(';')
        .filter_map(|statement| {
            let mut tokens = statement.split_whitespace();
            if tokens.next()? != keyword {
                return None;
            }
            let name = tokens.last()?;
            let name = name.split('[').next().unwrap_or(name);
            Some(name.to_string())
        })
        .collect()
}

fn attached_stage<'a>(
    shaders: &'a HashMap<RecordedShader, ShaderObject>,
    attached: &[RecordedShader],
    stage: ShaderStage,
) -> Vec<&'a ShaderObject> {
    attached
        .iter()
        .filter_map(|s| shaders.get(s))
        .filter(|s| s.stage == stage)
        .collect()
}

fn check_syntax(source: &str) -> Result<(), String> {
    let mut parens = 0i32;
    let mut braces = 0i32;
    // text of the current statement and the lines holding its assignments
    let mut statement = String::new();
    let mut assignments: Vec<usize> = Vec::new();

    for (line_no, line) in source.lines().enumerate() {
        let line_no = line_no + 1;
        let code = line.split("//").next().unwrap_or_default();
        let chars: Vec<char> = code.chars().collect();

        for (i, &ch) in chars.iter().enumerate() {
            match ch {
                '(' => parens += 1,
                ')' => parens -= 1,
                '{' => {
                    braces += 1;
                    statement.clear();
                    assignments.clear();
                    continue;
                }
                '}' => {
                    if braces > 0 && !statement.trim().is_empty() {
                        return Err(format!("ERROR: 0:{}: syntax error, expected ';'", line_no));
                    }
                    braces -= 1;
                    statement.clear();
                    assignments.clear();
                }
                ';' if parens == 0 => {
                    statement.clear();
                    assignments.clear();
                    continue;
                }
                '=' if is_assignment(&chars, i) => {
                    if assignments.first().is_some_and(|&first| first != line_no) {
                        return Err(format!("ERROR: 0:{}: syntax error, expected ';'", line_no));
                    }
                    assignments.push(line_no);
                }
                _ => {}
            }
            if parens < 0 || braces < 0 {
                return Err(format!("ERROR: 0:{}: unexpected '{}'", line_no, ch));
            }
            if ch != '}' {
                statement.push(ch);
            }
        }
        statement.push('\n');
    }

    if parens != 0 || braces != 0 {
        return Err("ERROR: 0:0: unexpected end of file".into());
    }
    if !source.contains("void main") {
        return Err("ERROR: 0:0: missing main function".into());
    }
    Ok(())
}

/// `=` that is not part of `==`, `<=`, `>=` or `!=`.
fn is_assignment(chars: &[char], i: usize) -> bool {
    let next = chars.get(i + 1).copied();
    let prev = i.checked_sub(1).map(|p| chars[p]);
    next != Some('=') && !matches!(prev, Some('=' | '<' | '>' | '!'))
}

impl RenderContext for RecordingContext {
    type Shader = RecordedShader;
    type Program = RecordedProgram;
    type Buffer = RecordedBuffer;
    type UniformLocation = RecordedUniform;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        let mut state = self.state.borrow_mut();
        if state.fail_allocations {
            return Err("out of shader objects".into());
        }
        let shader = RecordedShader(state.next_id());
        state.shaders.insert(
            shader,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        state.commands.push(Command::CreateShader { shader, stage });
        Ok(shader)
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.shaders.get_mut(&shader) {
            object.source = source.to_string();
        }
        state.commands.push(Command::ShaderSource { shader });
    }

    fn compile_shader(&self, shader: Self::Shader) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.shaders.get_mut(&shader) {
            match check_syntax(&object.source) {
                Ok(()) => {
                    object.compiled = true;
                    object.log.clear();
                }
                Err(log) => {
                    object.compiled = false;
                    object.log = log;
                }
            }
        }
        state.commands.push(Command::CompileShader { shader });
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map_or(false, |s| s.compiled)
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: Self::Shader) {
        let mut state = self.state.borrow_mut();
        state.shaders.remove(&shader);
        state.commands.push(Command::DeleteShader { shader });
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        let mut state = self.state.borrow_mut();
        if state.fail_allocations {
            return Err("out of program objects".into());
        }
        let program = RecordedProgram(state.next_id());
        state.programs.insert(program, ProgramObject::default());
        state.commands.push(Command::CreateProgram { program });
        Ok(program)
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.programs.get_mut(&program) {
            object.attached.push(shader);
        }
        state.commands.push(Command::AttachShader { program, shader });
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.programs.get_mut(&program) {
            object.attached.retain(|s| *s != shader);
        }
        state.commands.push(Command::DetachShader { program, shader });
    }

    fn link_program(&self, program: Self::Program) {
        let mut state = self.state.borrow_mut();
        state.commands.push(Command::LinkProgram { program });

        let attached = match state.programs.get(&program) {
            Some(object) => object.attached.clone(),
            None => return,
        };

        let vertex = attached_stage(&state.shaders, &attached, ShaderStage::Vertex);
        let fragment = attached_stage(&state.shaders, &attached, ShaderStage::Fragment);

        let outcome = match (vertex.as_slice(), fragment.as_slice()) {
            ([v], [f]) if v.compiled && f.compiled => {
                let declared = declarations(&v.source, "varying");
                match declarations(&f.source, "varying")
                    .into_iter()
                    .find(|name| !declared.contains(name))
                {
                    Some(name) => Err(format!(
                        "Varying '{}' is not declared in the vertex shader",
                        name
                    )),
                    None => {
                        let attributes = declarations(&v.source, "attribute");
                        let mut uniforms = declarations(&v.source, "uniform");
                        for name in declarations(&f.source, "uniform") {
                            if !uniforms.contains(&name) {
                                uniforms.push(name);
                            }
                        }
                        Ok((attributes, uniforms))
                    }
                }
            }
            _ => Err("a program needs exactly one compiled vertex and fragment shader".into()),
        };

        if let Some(object) = state.programs.get_mut(&program) {
            match outcome {
                Ok((attributes, uniforms)) => {
                    object.linked = true;
                    object.log.clear();
                    object.attributes = attributes;
                    object.uniforms = uniforms;
                }
                Err(log) => {
                    object.linked = false;
                    object.log = log;
                    object.attributes.clear();
                    object.uniforms.clear();
                }
            }
        }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map_or(false, |p| p.linked)
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&self, program: Self::Program) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        state.commands.push(Command::DeleteProgram { program });
    }

    fn use_program(&self, program: Option<Self::Program>) {
        self.record(Command::UseProgram { program });
    }

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let object = state.programs.get(&program).filter(|p| p.linked)?;
        object
            .attributes
            .iter()
            .position(|a| a == name)
            .map(|i| i as u32)
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        let state = self.state.borrow();
        let object = state.programs.get(&program).filter(|p| p.linked)?;
        object
            .uniforms
            .iter()
            .position(|u| u == name)
            .map(|i| RecordedUniform {
                program,
                location: i as u32,
            })
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        let mut state = self.state.borrow_mut();
        if state.fail_allocations {
            return Err("out of buffer objects".into());
        }
        let buffer = RecordedBuffer(state.next_id());
        state.buffers.insert(buffer, Vec::new());
        state.commands.push(Command::CreateBuffer { buffer });
        Ok(buffer)
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>) {
        let mut state = self.state.borrow_mut();
        match buffer {
            Some(buffer) => state.bound.insert(target, buffer),
            None => state.bound.remove(&target),
        };
        state.commands.push(Command::BindBuffer { target, buffer });
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let mut state = self.state.borrow_mut();
        if let Some(buffer) = state.bound.get(&target).copied() {
            state.buffers.insert(buffer, data.to_vec());
        }
        state.commands.push(Command::BufferData {
            target,
            len: data.len(),
            usage,
        });
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        let mut state = self.state.borrow_mut();
        state.buffers.remove(&buffer);
        state.bound.retain(|_, b| *b != buffer);
        state.commands.push(Command::DeleteBuffer { buffer });
    }

    fn vertex_attrib_pointer(&self, index: u32, layout: AttribLayout) {
        self.record(Command::VertexAttribPointer { index, layout });
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(Command::EnableVertexAttribArray { index });
    }

    fn uniform_matrix4(&self, location: &Self::UniformLocation, columns: &[f32; 16]) {
        self.record(Command::UniformMatrix4 {
            location: *location,
            columns: *columns,
        });
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.record(Command::ClearColor { rgba });
    }

    fn clear_depth(&self, depth: f32) {
        self.record(Command::ClearDepth { depth });
    }

    fn enable_depth_test(&self, func: DepthFunc) {
        self.record(Command::EnableDepthTest { func });
    }

    fn clear(&self, mask: ClearMask) {
        self.record(Command::Clear { mask });
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Command::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn draw_elements(&self, topology: Topology, count: i32, index_type: DataType, offset: i32) {
        self.record(Command::DrawElements {
            topology,
            count,
            index_type,
            offset,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_pick_trailing_names() {
        let src = "attribute vec4 aPos;\nuniform lowp mat4 uMvp;\nuniform float uWeights[4];";
        assert_eq!(declarations(src, "attribute"), vec!["aPos"]);
        assert_eq!(declarations(src, "uniform"), vec!["uMvp", "uWeights"]);
    }

    #[test]
    fn syntax_check_rejects_unbalanced_source() {
        assert!(check_syntax("void main() { }").is_ok());
        assert!(check_syntax("void main() { ").is_err());
        assert!(check_syntax("void main) {}").is_err());
        assert!(check_syntax("void other() {}").is_err());
    }

    #[test]
    fn syntax_check_rejects_missing_semicolons() {
        let unterminated = "void main() {\n    gl_FragColor = vec4(1.0)\n}";
        assert_eq!(
            check_syntax(unterminated).unwrap_err(),
            "ERROR: 0:3: syntax error, expected ';'"
        );

        let run_on = "void main() {\n    vec4 c = vec4(1.0)\n    gl_FragColor = c;\n}";
        assert_eq!(
            check_syntax(run_on).unwrap_err(),
            "ERROR: 0:3: syntax error, expected ';'"
        );
    }

    #[test]
    fn syntax_check_accepts_well_formed_statements() {
        let src = "uniform mat4 uMvp; // transform\n\
                   void main() {\n\
                   \x20   for (int i = 0; i < 4; i++) { }\n\
                   \x20   bool same = 1.0 == 1.0;\n\
                   \x20   gl_Position = uMvp\n\
                   \x20       * vec4(0.0);\n\
                   }";
        assert_eq!(check_syntax(src), Ok(()));
        assert_eq!(check_syntax(crate::render::shaders::cube_shaders::VERTEX_SRC), Ok(()));
        assert_eq!(check_syntax(crate::render::shaders::cube_shaders::FRAGMENT_SRC), Ok(()));
    }

    #[test]
    fn buffer_data_lands_in_bound_buffer() {
        let ctx = RecordingContext::new();
        let buffer = ctx.create_buffer().unwrap();
        ctx.bind_buffer(BufferTarget::Array, Some(buffer));
        ctx.buffer_data(BufferTarget::Array, &[1, 2, 3], BufferUsage::StaticDraw);

        assert_eq!(ctx.buffer_contents(buffer), Some(vec![1, 2, 3]));
        ctx.delete_buffer(buffer);
        assert_eq!(ctx.live_buffers(), 0);
    }
}
