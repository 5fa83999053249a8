//! Headless driver that records every state-changing call.
//!
//! `RecordingDriver` simulates just enough of a GL context for the pipeline
//! and shader code to run without a GPU:
//! - object handles are allocated from a counter starting at 1
//! - compiling a source that contains `#error` fails; the rest of that line
//!   becomes the info log
//! - linking collects `uniform` declarations from every attached stage and
//!   `in` / `attribute` declarations from the vertex stage, assigning them
//!   sequential locations
//! - deleting a stage that is still attached to a program only flags it;
//!   the object is freed once no program references it, as in GL
//! - the program in use and the bound texture are tracked so the matching
//!   queries answer truthfully
//!
//! Queries (`context_id`, `capabilities`, `uniform_location`, status and log
//! getters, `get_error`, `current_program`, `bound_texture`) are not recorded;
//! a test asserting "no driver calls" means no state was touched.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Capabilities, ContextId, Driver, Handle, ShaderStage};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Flush,
    Enable(u32),
    Disable(u32),
    ColorMask(bool, bool, bool, bool),
    BlendFuncSeparate(u32, u32, u32, u32),
    BlendEquationSeparate(u32, u32),
    StencilOp(u32, u32, u32),
    StencilFunc(u32, i32, u32),
    Viewport(i32, i32, i32, i32),
    Scissor(i32, i32, i32, i32),
    ClearColor(f32, f32, f32, f32),
    ClearStencil(i32),
    Clear(u32),

    CreateBuffer(Handle),
    DeleteBuffer(Handle),
    BindArrayBuffer(Handle),
    BufferData { len: usize, usage: u32 },
    BufferSubData { offset: usize, len: usize },
    CreateVertexArray(Handle),
    DeleteVertexArray(Handle),
    BindVertexArray(Handle),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    DrawArrays { mode: u32, first: i32, count: i32 },

    CreateTexture(Handle),
    DeleteTexture(Handle),
    ActiveTexture(u32),
    BindTexture(Handle),
    TexParameter(u32, i32),
    TexImage { width: i32, height: i32, filled: bool },
    TexSubImage { x: i32, y: i32, width: i32, height: i32 },

    CreateProgram(Handle),
    DeleteProgram(Handle),
    CreateShader(ShaderStage, Handle),
    DeleteShader(Handle),
    ShaderSource(Handle),
    CompileShader(Handle),
    AttachShader(Handle, Handle),
    LinkProgram(Handle),
    UseProgram(Handle),

    UniformF32(i32, Vec<f32>),
    UniformI32(i32, Vec<i32>),
    UniformF32Array { location: i32, components: usize, values: Vec<f32> },
    UniformMatrix3(i32, Vec<f32>),
    UniformMatrix4(i32, Vec<f32>),
}

#[derive(Debug)]
struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
    delete_pending: bool,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<Handle>,
    linked: bool,
    log: String,
    uniforms: HashMap<String, i32>,
    attributes: HashMap<String, u32>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    next_handle: Handle,
    shaders: HashMap<Handle, ShaderObject>,
    programs: HashMap<Handle, ProgramObject>,
    current_program: Handle,
    bound_texture: Handle,
    pending_errors: VecDeque<u32>,
}

/// Headless [`Driver`] for tests and tooling.
#[derive(Debug)]
pub struct RecordingDriver {
    context_id: Cell<ContextId>,
    capabilities: Cell<Capabilities>,
    fail_link: Cell<bool>,
    state: RefCell<State>,
}

impl RecordingDriver {
    /// Desktop-class capabilities and a fresh, process-unique context id.
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            context_id: Cell::new(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)),
            capabilities: Cell::new(capabilities),
            fail_link: Cell::new(false),
            state: RefCell::new(State {
                next_handle: 1,
                ..State::default()
            }),
        }
    }

    /// Simulates a different context becoming current.
    pub fn set_context_id(&self, id: ContextId) {
        self.context_id.set(id);
    }

    pub fn set_capabilities(&self, capabilities: Capabilities) {
        self.capabilities.set(capabilities);
    }

    /// Makes every subsequent `link_program` fail.
    pub fn set_fail_link(&self, fail: bool) {
        self.fail_link.set(fail);
    }

    /// Queues an error code for `get_error`.
    pub fn push_error(&self, code: u32) {
        self.state.borrow_mut().pending_errors.push_back(code);
    }

    /// Snapshot of the call log.
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Drains the call log.
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    /// Number of live (created, not deleted) programs.
    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Number of shader stage objects whose handles are still valid, that
    /// is, created and not yet passed to `delete_shader`.
    pub fn live_shaders(&self) -> usize {
        self.state
            .borrow()
            .shaders
            .values()
            .filter(|s| !s.delete_pending)
            .count()
    }

    /// Number of shader stage objects still held by the driver, including
    /// deleted stages kept alive by a program they are attached to.
    pub fn retained_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    fn allocate(&self) -> Handle {
        let mut state = self.state.borrow_mut();
        let handle = state.next_handle;
        state.next_handle += 1;
        handle
    }
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier declared by a `<qualifier> <type> <name>;` line, array suffix
/// stripped.
fn declared_name<'a>(line: &'a str, qualifiers: &[&str]) -> Option<&'a str> {
    let line = line.trim();
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    if !qualifiers.contains(&first) {
        return None;
    }
    let last = line.trim_end_matches(';').split_whitespace().last()?;
    let name = last.split('[').next()?;
    (!name.is_empty()).then_some(name)
}

impl Driver for RecordingDriver {
    fn context_id(&self) -> ContextId {
        self.context_id.get()
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities.get()
    }

    fn get_error(&self) -> u32 {
        self.state.borrow_mut().pending_errors.pop_front().unwrap_or(0)
    }

    fn flush(&self) {
        self.record(Call::Flush);
    }

    fn enable(&self, cap: u32) {
        self.record(Call::Enable(cap));
    }

    fn disable(&self, cap: u32) {
        self.record(Call::Disable(cap));
    }

    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool) {
        self.record(Call::ColorMask(r, g, b, a));
    }

    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.record(Call::BlendFuncSeparate(src_rgb, dst_rgb, src_alpha, dst_alpha));
    }

    fn blend_equation_separate(&self, mode_rgb: u32, mode_alpha: u32) {
        self.record(Call::BlendEquationSeparate(mode_rgb, mode_alpha));
    }

    fn stencil_op(&self, stencil_fail: u32, depth_fail: u32, pass: u32) {
        self.record(Call::StencilOp(stencil_fail, depth_fail, pass));
    }

    fn stencil_func(&self, func: u32, reference: i32, mask: u32) {
        self.record(Call::StencilFunc(func, reference, mask));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Viewport(x, y, width, height));
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Scissor(x, y, width, height));
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(Call::ClearColor(r, g, b, a));
    }

    fn clear_stencil(&self, value: i32) {
        self.record(Call::ClearStencil(value));
    }

    fn clear(&self, mask: u32) {
        self.record(Call::Clear(mask));
    }

    // ── buffers & vertex arrays ───────────────────────────────────────────

    fn create_buffer(&self) -> Result<Handle, String> {
        let handle = self.allocate();
        self.record(Call::CreateBuffer(handle));
        Ok(handle)
    }

    fn delete_buffer(&self, buffer: Handle) {
        self.record(Call::DeleteBuffer(buffer));
    }

    fn bind_array_buffer(&self, buffer: Handle) {
        self.record(Call::BindArrayBuffer(buffer));
    }

    fn buffer_data(&self, data: &[u8], usage: u32) {
        self.record(Call::BufferData { len: data.len(), usage });
    }

    fn buffer_sub_data(&self, offset: usize, data: &[u8]) {
        self.record(Call::BufferSubData { offset, len: data.len() });
    }

    fn create_vertex_array(&self) -> Result<Handle, String> {
        let handle = self.allocate();
        self.record(Call::CreateVertexArray(handle));
        Ok(handle)
    }

    fn delete_vertex_array(&self, array: Handle) {
        self.record(Call::DeleteVertexArray(array));
    }

    fn bind_vertex_array(&self, array: Handle) {
        self.record(Call::BindVertexArray(array));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        self.record(Call::VertexAttribPointer {
            index,
            size,
            data_type,
            normalized,
            stride,
            offset,
        });
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        self.record(Call::DrawArrays { mode, first, count });
    }

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&self) -> Result<Handle, String> {
        let handle = self.allocate();
        self.record(Call::CreateTexture(handle));
        Ok(handle)
    }

    fn delete_texture(&self, texture: Handle) {
        self.record(Call::DeleteTexture(texture));
    }

    fn active_texture(&self, unit: u32) {
        self.record(Call::ActiveTexture(unit));
    }

    fn bind_texture(&self, texture: Handle) {
        let mut state = self.state.borrow_mut();
        state.bound_texture = texture;
        state.calls.push(Call::BindTexture(texture));
    }

    fn bound_texture(&self) -> Handle {
        self.state.borrow().bound_texture
    }

    fn tex_parameter(&self, pname: u32, value: i32) {
        self.record(Call::TexParameter(pname, value));
    }

    fn tex_image_rgba(&self, width: i32, height: i32, pixels: Option<&[u8]>) {
        self.record(Call::TexImage {
            width,
            height,
            filled: pixels.is_some(),
        });
    }

    fn tex_sub_image_rgba(&self, x: i32, y: i32, width: i32, height: i32, _pixels: &[u8]) {
        self.record(Call::TexSubImage { x, y, width, height });
    }

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&self) -> Result<Handle, String> {
        let handle = self.allocate();
        self.state
            .borrow_mut()
            .programs
            .insert(handle, ProgramObject::default());
        self.record(Call::CreateProgram(handle));
        Ok(handle)
    }

    fn delete_program(&self, program: Handle) {
        let mut state = self.state.borrow_mut();
        let State { shaders, programs, .. } = &mut *state;
        if let Some(obj) = programs.remove(&program) {
            for handle in obj.attached {
                let still_attached = programs.values().any(|p| p.attached.contains(&handle));
                if !still_attached && shaders.get(&handle).is_some_and(|s| s.delete_pending) {
                    shaders.remove(&handle);
                }
            }
        }
        if state.current_program == program {
            state.current_program = 0;
        }
        state.calls.push(Call::DeleteProgram(program));
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<Handle, String> {
        let handle = self.allocate();
        self.state.borrow_mut().shaders.insert(
            handle,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
                delete_pending: false,
            },
        );
        self.record(Call::CreateShader(stage, handle));
        Ok(handle)
    }

    fn delete_shader(&self, shader: Handle) {
        let mut state = self.state.borrow_mut();
        let attached = state.programs.values().any(|p| p.attached.contains(&shader));
        if attached {
            if let Some(obj) = state.shaders.get_mut(&shader) {
                obj.delete_pending = true;
            }
        } else {
            state.shaders.remove(&shader);
        }
        state.calls.push(Call::DeleteShader(shader));
    }

    fn shader_source(&self, shader: Handle, source: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(obj) = state.shaders.get_mut(&shader) {
            obj.source = source.to_owned();
        }
        state.calls.push(Call::ShaderSource(shader));
    }

    fn compile_shader(&self, shader: Handle) {
        let mut state = self.state.borrow_mut();
        if let Some(obj) = state.shaders.get_mut(&shader) {
            match obj.source.find("#error") {
                Some(at) => {
                    let message = obj.source[at + "#error".len()..]
                        .lines()
                        .next()
                        .unwrap_or_default()
                        .trim();
                    obj.compiled = false;
                    obj.log = format!("0:1: error: {message}");
                }
                None => {
                    obj.compiled = true;
                    obj.log.clear();
                }
            }
        }
        state.calls.push(Call::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: Handle) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: Handle) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn attach_shader(&self, program: Handle, shader: Handle) {
        let mut state = self.state.borrow_mut();
        if let Some(obj) = state.programs.get_mut(&program) {
            obj.attached.push(shader);
        }
        state.calls.push(Call::AttachShader(program, shader));
    }

    fn link_program(&self, program: Handle) {
        let fail_link = self.fail_link.get();
        let mut state = self.state.borrow_mut();
        let State { shaders, programs, calls, .. } = &mut *state;
        calls.push(Call::LinkProgram(program));

        let Some(obj) = programs.get_mut(&program) else {
            return;
        };
        obj.uniforms.clear();
        obj.attributes.clear();

        if fail_link {
            obj.linked = false;
            obj.log = "link failed: forced by test driver".to_owned();
            return;
        }
        if obj.attached.iter().any(|h| !shaders.get(h).is_some_and(|s| s.compiled)) {
            obj.linked = false;
            obj.log = "link failed: attached stage not compiled".to_owned();
            return;
        }

        for handle in &obj.attached {
            let Some(stage) = shaders.get(handle) else {
                continue;
            };
            for line in stage.source.lines() {
                if let Some(name) = declared_name(line, &["uniform"]) {
                    let next = obj.uniforms.len() as i32;
                    obj.uniforms.entry(name.to_owned()).or_insert(next);
                }
                if stage.stage == ShaderStage::Vertex {
                    if let Some(name) = declared_name(line, &["in", "attribute"]) {
                        let next = obj.attributes.len() as u32;
                        obj.attributes.entry(name.to_owned()).or_insert(next);
                    }
                }
            }
        }
        obj.linked = true;
        obj.log.clear();
    }

    fn program_link_status(&self, program: Handle) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: Handle) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: Handle) {
        let mut state = self.state.borrow_mut();
        state.current_program = program;
        state.calls.push(Call::UseProgram(program));
    }

    fn current_program(&self) -> Handle {
        self.state.borrow().current_program
    }

    fn uniform_location(&self, program: Handle, name: &str) -> Option<i32> {
        let state = self.state.borrow();
        let obj = state.programs.get(&program).filter(|p| p.linked)?;
        obj.uniforms.get(name).copied()
    }

    fn attrib_location(&self, program: Handle, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let obj = state.programs.get(&program).filter(|p| p.linked)?;
        obj.attributes.get(name).copied()
    }

    // ── uniform uploads ───────────────────────────────────────────────────

    fn uniform_f32(&self, location: i32, values: &[f32]) {
        self.record(Call::UniformF32(location, values.to_vec()));
    }

    fn uniform_i32(&self, location: i32, values: &[i32]) {
        self.record(Call::UniformI32(location, values.to_vec()));
    }

    fn uniform_f32_array(&self, location: i32, components: usize, values: &[f32]) {
        self.record(Call::UniformF32Array {
            location,
            components,
            values: values.to_vec(),
        });
    }

    fn uniform_matrix3(&self, location: i32, values: &[f32]) {
        self.record(Call::UniformMatrix3(location, values.to_vec()));
    }

    fn uniform_matrix4(&self, location: i32, values: &[f32]) {
        self.record(Call::UniformMatrix4(location, values.to_vec()));
    }
}
