use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::driver::Driver;
use crate::shader::{defaults, Shader};

use super::{ActiveTargetRegistry, GlslProfile, RenderInit};

/// Renderer-facing context: the driver, its configuration, and the resources
/// shared by every target drawing through it.
///
/// The built-in shaders are compiled on first use.
pub struct RenderCtx {
    driver: Rc<dyn Driver>,
    init: RenderInit,
    glsl_profile: GlslProfile,
    registry: Arc<ActiveTargetRegistry>,
    default_shader: OnceCell<Shader>,
    default_tex_shader: OnceCell<Shader>,
}

impl RenderCtx {
    pub fn new(driver: Rc<dyn Driver>, init: RenderInit) -> Self {
        let glsl_profile = init.glsl_profile.unwrap_or(if driver.capabilities().embedded {
            GlslProfile::Es100
        } else {
            GlslProfile::Core330
        });
        Self {
            driver,
            init,
            glsl_profile,
            registry: ActiveTargetRegistry::global(),
            default_shader: OnceCell::new(),
            default_tex_shader: OnceCell::new(),
        }
    }

    /// Replaces the process-wide target registry for targets created from
    /// this context.
    pub fn with_registry(mut self, registry: Arc<ActiveTargetRegistry>) -> Self {
        self.registry = registry;
        self
    }

    #[inline]
    pub fn driver(&self) -> &Rc<dyn Driver> {
        &self.driver
    }

    #[inline]
    pub fn init(&self) -> &RenderInit {
        &self.init
    }

    #[inline]
    pub fn glsl_profile(&self) -> GlslProfile {
        self.glsl_profile
    }

    #[inline]
    pub fn registry(&self) -> &Arc<ActiveTargetRegistry> {
        &self.registry
    }

    /// Built-in program for draws without an explicit shader.
    ///
    /// A built-in that fails to compile stays empty (binding it unbinds any
    /// program); the failure is logged once.
    pub fn default_shader(&self, textured: bool) -> &Shader {
        let (cell, source) = if textured {
            (&self.default_tex_shader, defaults::textured(self.glsl_profile))
        } else {
            (&self.default_shader, defaults::untextured(self.glsl_profile))
        };
        cell.get_or_init(|| {
            let mut shader = Shader::with_driver(Rc::clone(&self.driver));
            if let Err(err) = shader.load_vertex_fragment(source.vertex, source.fragment) {
                log::error!("built-in shader (textured: {textured}) unavailable: {err}");
            }
            shader
        })
    }
}

impl fmt::Debug for RenderCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderCtx")
            .field("init", &self.init)
            .field("glsl_profile", &self.glsl_profile)
            .field("capabilities", &self.driver.capabilities())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Capabilities, RecordingDriver};

    #[test]
    fn profile_follows_driver_when_unset() {
        let gles = Rc::new(RecordingDriver::with_capabilities(Capabilities {
            embedded: true,
            ..Capabilities::default()
        }));
        assert_eq!(RenderCtx::new(gles, RenderInit::default()).glsl_profile(), GlslProfile::Es100);

        let desktop = Rc::new(RecordingDriver::new());
        let forced = RenderInit {
            glsl_profile: Some(GlslProfile::Es100),
            ..RenderInit::default()
        };
        assert_eq!(RenderCtx::new(desktop, forced).glsl_profile(), GlslProfile::Es100);
    }

    #[test]
    fn default_shaders_compile_once() {
        let driver = Rc::new(RecordingDriver::new());
        let ctx = RenderCtx::new(driver.clone(), RenderInit::default());
        let plain = ctx.default_shader(false).native_handle();
        let tex = ctx.default_shader(true).native_handle();
        assert_ne!(plain, 0);
        assert_ne!(tex, 0);
        assert_ne!(plain, tex);
        assert_eq!(ctx.default_shader(false).native_handle(), plain);
        assert_eq!(driver.live_programs(), 2);
    }
}
