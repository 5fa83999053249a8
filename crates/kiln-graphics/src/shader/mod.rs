//! Shader program manager.
//!
//! A [`Shader`] owns at most one linked driver program built from up to three
//! stages. It caches uniform locations by name (misses included, so a missing
//! uniform is reported once) and records which texture each sampler uniform
//! refers to, assigning texture units at bind time.
//!
//! Failed (re)compilation never touches the program already in place.

pub mod defaults;
mod error;
mod source;
mod uniform;

pub use error::{ShaderError, SourceOrigin};
pub use uniform::Uniform;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

use crate::coords::Vec2;
use crate::driver::{Driver, Handle, ShaderStage};
use crate::render::RenderCtx;
use crate::texture::{Texture, TextureRef};
use uniform::Payload;

/// Driver info logs are truncated to this many bytes.
const INFO_LOG_LIMIT: usize = 1024;

fn bounded_log(mut log: String) -> String {
    if log.len() > INFO_LOG_LIMIT {
        let mut end = INFO_LOG_LIMIT;
        while !log.is_char_boundary(end) {
            end -= 1;
        }
        log.truncate(end);
    }
    log
}

pub struct Shader {
    driver: Rc<dyn Driver>,
    program: Handle,
    /// Name → location, `None` remembered for names the program lacks.
    uniforms: RefCell<HashMap<String, Option<i32>>>,
    /// Sampler location → texture, bound to units 1.. in location order.
    textures: BTreeMap<i32, TextureRef>,
    /// Sampler bound to unit 0 (the draw's own texture).
    current_texture: Option<i32>,
}

impl Shader {
    /// Empty shader (no program). Binding it unbinds any program.
    pub fn new(ctx: &RenderCtx) -> Self {
        Self::with_driver(Rc::clone(ctx.driver()))
    }

    pub(crate) fn with_driver(driver: Rc<dyn Driver>) -> Self {
        Self {
            driver,
            program: 0,
            uniforms: RefCell::new(HashMap::new()),
            textures: BTreeMap::new(),
            current_texture: None,
        }
    }

    /// Shaders are always available on supported drivers.
    pub fn is_available(_driver: &dyn Driver) -> bool {
        true
    }

    pub fn is_geometry_available(driver: &dyn Driver) -> bool {
        driver.capabilities().geometry_shaders
    }

    // ── loading ───────────────────────────────────────────────────────────

    /// Builds a program from a single stage.
    pub fn load_from_memory(&mut self, stage: ShaderStage, source: &str) -> Result<(), ShaderError> {
        match stage {
            ShaderStage::Vertex => self.compile(Some(source), None, None),
            ShaderStage::Geometry => self.compile(None, Some(source), None),
            ShaderStage::Fragment => self.compile(None, None, Some(source)),
        }
    }

    pub fn load_vertex_fragment(&mut self, vertex: &str, fragment: &str) -> Result<(), ShaderError> {
        self.compile(Some(vertex), None, Some(fragment))
    }

    pub fn load_from_file(&mut self, stage: ShaderStage, path: impl AsRef<Path>) -> Result<(), ShaderError> {
        let src = source::read_file(path.as_ref(), stage)?;
        self.load_from_memory(stage, &src)
    }

    /// Reads every supplied stage from disk, then compiles. Nothing is
    /// compiled if any read fails.
    pub fn load_from_files(
        &mut self,
        vertex: Option<&Path>,
        geometry: Option<&Path>,
        fragment: Option<&Path>,
    ) -> Result<(), ShaderError> {
        let vertex = read_optional_file(vertex, ShaderStage::Vertex)?;
        let geometry = read_optional_file(geometry, ShaderStage::Geometry)?;
        let fragment = read_optional_file(fragment, ShaderStage::Fragment)?;
        self.compile(vertex.as_deref(), geometry.as_deref(), fragment.as_deref())
    }

    pub fn load_from_stream(&mut self, stage: ShaderStage, stream: impl Read) -> Result<(), ShaderError> {
        let src = source::read_stream(stream, stage)?;
        self.load_from_memory(stage, &src)
    }

    /// Stream counterpart of [`Shader::load_from_files`].
    pub fn load_from_streams(
        &mut self,
        vertex: Option<&mut dyn Read>,
        geometry: Option<&mut dyn Read>,
        fragment: Option<&mut dyn Read>,
    ) -> Result<(), ShaderError> {
        let vertex = read_optional_stream(vertex, ShaderStage::Vertex)?;
        let geometry = read_optional_stream(geometry, ShaderStage::Geometry)?;
        let fragment = read_optional_stream(fragment, ShaderStage::Fragment)?;
        self.compile(vertex.as_deref(), geometry.as_deref(), fragment.as_deref())
    }

    /// Compiles and links the supplied stages (empty sources are skipped).
    ///
    /// On success the previous program is released and both caches are
    /// cleared. On failure the previous program, caches and texture bindings
    /// are left exactly as they were.
    pub fn compile(
        &mut self,
        vertex: Option<&str>,
        geometry: Option<&str>,
        fragment: Option<&str>,
    ) -> Result<(), ShaderError> {
        let vertex = vertex.filter(|s| !s.is_empty());
        let geometry = geometry.filter(|s| !s.is_empty());
        let fragment = fragment.filter(|s| !s.is_empty());
        let d = Rc::clone(&self.driver);

        if geometry.is_some() && !Self::is_geometry_available(d.as_ref()) {
            let err = ShaderError::GeometryUnsupported;
            log::error!("{err}");
            return Err(err);
        }

        let program = d.create_program().map_err(ShaderError::ProgramCreation)?;

        let stages = [
            (ShaderStage::Vertex, vertex),
            (ShaderStage::Geometry, geometry),
            (ShaderStage::Fragment, fragment),
        ];
        for (stage, src) in stages {
            let Some(src) = src else { continue };
            if let Err(err) = compile_stage(d.as_ref(), program, stage, src) {
                d.delete_program(program);
                log::error!("{err}");
                return Err(err);
            }
        }

        d.link_program(program);
        if !d.program_link_status(program) {
            let err = ShaderError::Link {
                log: bounded_log(d.program_info_log(program)),
            };
            d.delete_program(program);
            log::error!("{err}");
            return Err(err);
        }

        if self.program != 0 {
            d.delete_program(self.program);
        }
        self.program = program;
        self.current_texture = None;
        self.textures.clear();
        self.uniforms.get_mut().clear();

        d.flush();
        log::debug!("shader program {program} linked");
        Ok(())
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    /// Uploads a scalar, vector or matrix uniform. Unknown names are a no-op.
    pub fn set_uniform(&self, name: &str, value: impl Into<Uniform>) {
        let payload = value.into().payload();
        self.with_uniform(name, |d, location| match &payload {
            Payload::Floats(v) => d.uniform_f32(location, v),
            Payload::Ints(v) => d.uniform_i32(location, v),
            Payload::Mat3(m) => d.uniform_matrix3(location, m),
            Payload::Mat4(m) => d.uniform_matrix4(location, m),
        });
    }

    pub fn set_uniform_array_f32(&self, name: &str, values: &[f32]) {
        self.with_uniform(name, |d, location| d.uniform_f32_array(location, 1, values));
    }

    pub fn set_uniform_array_vec2(&self, name: &str, values: &[Vec2]) {
        let flat: &[f32] = bytemuck::cast_slice(values);
        self.with_uniform(name, |d, location| d.uniform_f32_array(location, 2, flat));
    }

    pub fn set_uniform_array_vec3(&self, name: &str, values: &[[f32; 3]]) {
        let flat: &[f32] = bytemuck::cast_slice(values);
        self.with_uniform(name, |d, location| d.uniform_f32_array(location, 3, flat));
    }

    pub fn set_uniform_array_vec4(&self, name: &str, values: &[[f32; 4]]) {
        let flat: &[f32] = bytemuck::cast_slice(values);
        self.with_uniform(name, |d, location| d.uniform_f32_array(location, 4, flat));
    }

    pub fn set_uniform_array_mat3(&self, name: &str, values: &[[f32; 9]]) {
        let flat: &[f32] = bytemuck::cast_slice(values);
        self.with_uniform(name, |d, location| d.uniform_matrix3(location, flat));
    }

    pub fn set_uniform_array_mat4(&self, name: &str, values: &[[f32; 16]]) {
        let flat: &[f32] = bytemuck::cast_slice(values);
        self.with_uniform(name, |d, location| d.uniform_matrix4(location, flat));
    }

    /// Associates `texture` with the sampler uniform `name`.
    ///
    /// The texture is referenced by handle snapshot; it must outlive every
    /// bind of this shader. Re-setting a sampler replaces its entry. A new
    /// entry that would exceed the driver's texture units is dropped.
    pub fn set_texture(&mut self, name: &str, texture: &Texture) {
        if self.program == 0 {
            return;
        }
        let Some(location) = self.location(name) else {
            return;
        };

        if let Some(entry) = self.textures.get_mut(&location) {
            *entry = texture.texture_ref();
            return;
        }

        let max_units = self.driver.capabilities().max_texture_units as usize;
        if self.textures.len() + 1 >= max_units {
            log::error!(
                "cannot use texture \"{name}\" for shader: all {max_units} texture units are used"
            );
            return;
        }
        self.textures.insert(location, texture.texture_ref());
    }

    /// Binds the sampler `name` to the texture of the draw using this shader.
    pub fn set_current_texture(&mut self, name: &str) {
        if self.program == 0 {
            return;
        }
        self.current_texture = self.location(name);
    }

    // ── binding ───────────────────────────────────────────────────────────

    /// Makes `shader` the program in use and binds its textures, or unbinds
    /// any program for `None` / an empty shader.
    ///
    /// Texture `i` (in sampler location order) goes to unit `i + 1`; the
    /// active unit is left at 0.
    pub fn bind(driver: &dyn Driver, shader: Option<&Shader>) {
        let Some(shader) = shader.filter(|s| s.program != 0) else {
            driver.use_program(0);
            return;
        };

        driver.use_program(shader.program);

        for (i, (&location, texture)) in shader.textures.iter().enumerate() {
            let unit = i as i32 + 1;
            driver.uniform_i32(location, &[unit]);
            driver.active_texture(glow::TEXTURE0 + unit as u32);
            driver.bind_texture(texture.native);
        }
        driver.active_texture(glow::TEXTURE0);

        if let Some(location) = shader.current_texture {
            driver.uniform_i32(location, &[0]);
        }
    }

    /// Driver program handle, `0` when nothing is linked.
    #[inline]
    pub fn native_handle(&self) -> Handle {
        self.program
    }

    /// Number of sampler uniforms with a recorded texture.
    pub fn texture_binding_count(&self) -> usize {
        self.textures.len()
    }

    pub(crate) fn attrib_location(&self, name: &str) -> Option<u32> {
        if self.program == 0 {
            return None;
        }
        self.driver.attrib_location(self.program, name)
    }

    fn location(&self, name: &str) -> Option<i32> {
        if let Some(&cached) = self.uniforms.borrow().get(name) {
            return cached;
        }
        let location = self.driver.uniform_location(self.program, name);
        if location.is_none() {
            log::warn!("uniform \"{name}\" not found in shader program {}", self.program);
        }
        self.uniforms.borrow_mut().insert(name.to_owned(), location);
        location
    }

    /// Runs `upload` with this program in use, restoring the previous program
    /// afterwards.
    fn with_uniform(&self, name: &str, upload: impl FnOnce(&dyn Driver, i32)) {
        if self.program == 0 {
            return;
        }
        let Some(location) = self.location(name) else {
            return;
        };

        let d = self.driver.as_ref();
        let saved = d.current_program();
        if saved != self.program {
            d.use_program(self.program);
        }
        upload(d, location);
        if saved != self.program {
            d.use_program(saved);
        }
    }
}

fn read_optional_file(path: Option<&Path>, stage: ShaderStage) -> Result<Option<String>, ShaderError> {
    path.map(|p| source::read_file(p, stage)).transpose()
}

fn read_optional_stream(
    stream: Option<&mut dyn Read>,
    stage: ShaderStage,
) -> Result<Option<String>, ShaderError> {
    stream.map(|s| source::read_stream(s, stage)).transpose()
}

fn compile_stage(
    d: &dyn Driver,
    program: Handle,
    stage: ShaderStage,
    src: &str,
) -> Result<(), ShaderError> {
    let shader = d.create_shader(stage).map_err(ShaderError::ProgramCreation)?;
    d.shader_source(shader, src);
    d.compile_shader(shader);
    if !d.shader_compile_status(shader) {
        let log = bounded_log(d.shader_info_log(shader));
        d.delete_shader(shader);
        return Err(ShaderError::Compile { stage, log });
    }
    // The program keeps the compiled stage alive after attachment.
    d.attach_shader(program, shader);
    d.delete_shader(shader);
    Ok(())
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("program", &self.program)
            .field("textures", &self.textures)
            .field("current_texture", &self.current_texture)
            .finish_non_exhaustive()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        if self.program != 0 {
            self.driver.delete_program(self.program);
        }
    }
}
