//! Driver textures.
//!
//! A [`Texture`] owns one RGBA8 driver texture. Render targets and shaders
//! never compare driver handles: they compare the texture's cache id, which is
//! process-unique and refreshed whenever the contents change.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};

use crate::coords::Vec2u;
use crate::driver::{Driver, Handle};
use crate::render::RenderCtx;
use crate::state::CoordinateType;

static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(1);

fn next_cache_id() -> u64 {
    NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle snapshot of a texture, used where a texture is referenced by
/// identity rather than borrowed (shader sampler uniforms).
///
/// The snapshot does not keep the texture alive; binding it after the texture
/// is dropped binds a deleted driver object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureRef {
    pub native: Handle,
    pub cache_id: u64,
}

pub struct Texture {
    driver: Rc<dyn Driver>,
    handle: Handle,
    size: Vec2u,
    actual_size: Vec2u,
    cache_id: u64,
    smooth: bool,
    pixels_flipped: bool,
    fbo_attachment: bool,
}

impl Texture {
    /// Allocates an uninitialized texture of `size` pixels.
    ///
    /// Without NPOT support the storage is padded to the next power of two in
    /// each dimension; [`Texture::actual_size`] reports the padded size.
    pub fn new(ctx: &RenderCtx, size: Vec2u) -> Result<Self> {
        anyhow::ensure!(!size.is_empty(), "texture size must be non-zero, got {size:?}");

        let driver = Rc::clone(ctx.driver());
        let actual_size = if driver.capabilities().npot_textures {
            size
        } else {
            Vec2u::new(size.x.next_power_of_two(), size.y.next_power_of_two())
        };

        let handle = driver
            .create_texture()
            .map_err(anyhow::Error::msg)
            .context("failed to create driver texture")?;

        let texture = Self {
            driver,
            handle,
            size,
            actual_size,
            cache_id: next_cache_id(),
            smooth: false,
            pixels_flipped: false,
            fbo_attachment: false,
        };

        texture.with_bound(|d| {
            d.tex_image_rgba(actual_size.x as i32, actual_size.y as i32, None);
            d.tex_parameter(glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            d.tex_parameter(glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            d.tex_parameter(glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            d.tex_parameter(glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
        });

        log::debug!(
            "texture {}: {}x{} (storage {}x{})",
            texture.cache_id,
            size.x,
            size.y,
            actual_size.x,
            actual_size.y
        );
        Ok(texture)
    }

    /// Creates a texture and uploads `pixels` (tightly packed RGBA8 rows).
    pub fn from_pixels(ctx: &RenderCtx, size: Vec2u, pixels: &[u8]) -> Result<Self> {
        let mut texture = Self::new(ctx, size)?;
        texture.update(pixels)?;
        Ok(texture)
    }

    /// Replaces the whole logical area with `pixels`.
    pub fn update(&mut self, pixels: &[u8]) -> Result<()> {
        self.update_region(pixels, Vec2u::new(0, 0), self.size)
    }

    /// Replaces the `size` pixel region at `offset`.
    pub fn update_region(&mut self, pixels: &[u8], offset: Vec2u, size: Vec2u) -> Result<()> {
        anyhow::ensure!(
            offset.x + size.x <= self.size.x && offset.y + size.y <= self.size.y,
            "region {size:?} at {offset:?} exceeds texture size {:?}",
            self.size
        );
        let expected = size.x as usize * size.y as usize * 4;
        anyhow::ensure!(
            pixels.len() == expected,
            "expected {expected} bytes of RGBA8 data, got {}",
            pixels.len()
        );
        if size.is_empty() {
            return Ok(());
        }

        self.with_bound(|d| {
            d.tex_sub_image_rgba(
                offset.x as i32,
                offset.y as i32,
                size.x as i32,
                size.y as i32,
                pixels,
            );
        });
        self.pixels_flipped = false;
        self.cache_id = next_cache_id();
        self.driver.flush();
        Ok(())
    }

    /// Enables linear filtering.
    pub fn set_smooth(&mut self, smooth: bool) {
        if smooth == self.smooth {
            return;
        }
        self.smooth = smooth;
        let filter = (if smooth { glow::LINEAR } else { glow::NEAREST }) as i32;
        self.with_bound(|d| {
            d.tex_parameter(glow::TEXTURE_MIN_FILTER, filter);
            d.tex_parameter(glow::TEXTURE_MAG_FILTER, filter);
        });
    }

    /// Marks rows as stored bottom-up (render-to-texture output).
    pub fn set_pixels_flipped(&mut self, flipped: bool) {
        self.pixels_flipped = flipped;
    }

    /// Marks the texture as a color attachment of an offscreen target. Such
    /// textures are rebound on every draw and unbound after it.
    pub fn set_fbo_attachment(&mut self, attachment: bool) {
        self.fbo_attachment = attachment;
    }

    /// Binds `texture` (or no texture) on the active unit.
    pub fn bind(driver: &dyn Driver, texture: Option<&Texture>) {
        driver.bind_texture(texture.map_or(0, |t| t.handle));
    }

    /// Texture matrix for `coordinate_type`, column-major 4×4.
    ///
    /// Pixel coordinates are scaled by the storage size; normalized
    /// coordinates on padded storage are scaled to the logical area; flipped
    /// textures negate the Y scale and offset by the logical height.
    pub fn texture_matrix(&self, coordinate_type: CoordinateType) -> [f32; 16] {
        let mut m = [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let (w, h) = (self.size.x as f32, self.size.y as f32);
        let (aw, ah) = (self.actual_size.x as f32, self.actual_size.y as f32);

        match coordinate_type {
            CoordinateType::Pixels => {
                m[0] = 1.0 / aw;
                m[5] = 1.0 / ah;
            }
            CoordinateType::Normalized if self.size != self.actual_size => {
                m[0] = w / aw;
                m[5] = h / ah;
            }
            CoordinateType::Normalized => {}
        }

        if self.pixels_flipped {
            m[5] = -m[5];
            m[13] = h / ah;
        }
        m
    }

    /// Logical-to-storage ratio per axis, `None` for zero-sized storage.
    pub fn npot_factor(&self) -> Option<[f32; 2]> {
        if self.actual_size.x == 0 || self.actual_size.y == 0 {
            return None;
        }
        Some([
            self.size.x as f32 / self.actual_size.x as f32,
            self.size.y as f32 / self.actual_size.y as f32,
        ])
    }

    pub fn texture_ref(&self) -> TextureRef {
        TextureRef {
            native: self.handle,
            cache_id: self.cache_id,
        }
    }

    #[inline]
    pub fn size(&self) -> Vec2u {
        self.size
    }

    #[inline]
    pub fn actual_size(&self) -> Vec2u {
        self.actual_size
    }

    #[inline]
    pub fn cache_id(&self) -> u64 {
        self.cache_id
    }

    #[inline]
    pub fn native_handle(&self) -> Handle {
        self.handle
    }

    #[inline]
    pub fn is_smooth(&self) -> bool {
        self.smooth
    }

    #[inline]
    pub fn pixels_flipped(&self) -> bool {
        self.pixels_flipped
    }

    #[inline]
    pub fn is_fbo_attachment(&self) -> bool {
        self.fbo_attachment
    }

    /// Runs `f` with this texture bound, then restores the previous binding so
    /// render-target texture caches stay valid.
    fn with_bound(&self, f: impl FnOnce(&dyn Driver)) {
        let d = self.driver.as_ref();
        let previous = d.bound_texture();
        d.bind_texture(self.handle);
        f(d);
        d.bind_texture(previous);
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("handle", &self.handle)
            .field("size", &self.size)
            .field("actual_size", &self.actual_size)
            .field("cache_id", &self.cache_id)
            .field("smooth", &self.smooth)
            .field("pixels_flipped", &self.pixels_flipped)
            .field("fbo_attachment", &self.fbo_attachment)
            .finish()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.driver.delete_texture(self.handle);
    }
}
