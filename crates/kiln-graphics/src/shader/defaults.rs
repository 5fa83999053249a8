//! Built-in shader sources used when a draw supplies no shader.
//!
//! Uniform and attribute names here are the contract with the draw pipeline:
//! `u_modelview`, `u_projection`, `u_texture_matrix`, `u_npot_factor`,
//! `u_sampler`; attributes `position`, `color`, `texCoord`.

use crate::render::GlslProfile;

/// Vertex and fragment source of a built-in program.
#[derive(Debug, Copy, Clone)]
pub struct BuiltinSource {
    pub vertex: &'static str,
    pub fragment: &'static str,
}

pub fn untextured(profile: GlslProfile) -> BuiltinSource {
    match profile {
        GlslProfile::Core330 => BuiltinSource {
            vertex: CORE_VERTEX,
            fragment: CORE_FRAGMENT,
        },
        GlslProfile::Es100 => BuiltinSource {
            vertex: ES_VERTEX,
            fragment: ES_FRAGMENT,
        },
    }
}

pub fn textured(profile: GlslProfile) -> BuiltinSource {
    match profile {
        GlslProfile::Core330 => BuiltinSource {
            vertex: CORE_TEX_VERTEX,
            fragment: CORE_TEX_FRAGMENT,
        },
        GlslProfile::Es100 => BuiltinSource {
            vertex: ES_TEX_VERTEX,
            fragment: ES_TEX_FRAGMENT,
        },
    }
}

// ── GLSL 330 core ─────────────────────────────────────────────────────────

const CORE_VERTEX: &str = r#"#version 330 core
in vec2 position;
in vec4 color;
out vec4 v_color;
uniform mat4 u_modelview;
uniform mat4 u_projection;
void main() {
    v_color = color;
    gl_Position = u_projection * u_modelview * vec4(position, 0.0, 1.0);
}
"#;

const CORE_FRAGMENT: &str = r#"#version 330 core
in vec4 v_color;
out vec4 frag_color;
void main() {
    frag_color = v_color;
}
"#;

const CORE_TEX_VERTEX: &str = r#"#version 330 core
in vec2 position;
in vec4 color;
in vec2 texCoord;
out vec4 v_color;
out vec2 v_tex_coord;
uniform mat4 u_modelview;
uniform mat4 u_projection;
void main() {
    v_color = color;
    v_tex_coord = texCoord;
    gl_Position = u_projection * u_modelview * vec4(position, 0.0, 1.0);
}
"#;

const CORE_TEX_FRAGMENT: &str = r#"#version 330 core
in vec4 v_color;
in vec2 v_tex_coord;
out vec4 frag_color;
uniform sampler2D u_sampler;
uniform mat4 u_texture_matrix;
uniform vec2 u_npot_factor;
void main() {
    vec2 coord = (u_texture_matrix * vec4(v_tex_coord, 0.0, 1.0)).xy;
    coord = clamp(coord, vec2(0.0), u_npot_factor);
    frag_color = texture(u_sampler, coord) * v_color;
}
"#;

// ── GLSL ES 100 ───────────────────────────────────────────────────────────

const ES_VERTEX: &str = r#"#version 100
attribute vec2 position;
attribute vec4 color;
varying vec4 v_color;
uniform mat4 u_modelview;
uniform mat4 u_projection;
void main() {
    v_color = color;
    gl_Position = u_projection * u_modelview * vec4(position, 0.0, 1.0);
}
"#;

const ES_FRAGMENT: &str = r#"#version 100
precision mediump float;
varying vec4 v_color;
void main() {
    gl_FragColor = v_color;
}
"#;

const ES_TEX_VERTEX: &str = r#"#version 100
attribute vec2 position;
attribute vec4 color;
attribute vec2 texCoord;
varying vec4 v_color;
varying vec2 v_tex_coord;
uniform mat4 u_modelview;
uniform mat4 u_projection;
void main() {
    v_color = color;
    v_tex_coord = texCoord;
    gl_Position = u_projection * u_modelview * vec4(position, 0.0, 1.0);
}
"#;

const ES_TEX_FRAGMENT: &str = r#"#version 100
precision mediump float;
varying vec4 v_color;
varying vec2 v_tex_coord;
uniform sampler2D u_sampler;
uniform mat4 u_texture_matrix;
uniform vec2 u_npot_factor;
void main() {
    vec2 coord = (u_texture_matrix * vec4(v_tex_coord, 0.0, 1.0)).xy;
    coord = clamp(coord, vec2(0.0), u_npot_factor);
    gl_FragColor = texture2D(u_sampler, coord) * v_color;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_profile_declares_pipeline_names() {
        for profile in [GlslProfile::Core330, GlslProfile::Es100] {
            let plain = untextured(profile);
            let tex = textured(profile);
            for name in ["u_modelview", "u_projection", "position", "color"] {
                assert!(plain.vertex.contains(name), "{profile:?} missing {name}");
                assert!(tex.vertex.contains(name), "{profile:?} missing {name}");
            }
            for name in ["u_sampler", "u_texture_matrix", "u_npot_factor"] {
                assert!(tex.fragment.contains(name), "{profile:?} missing {name}");
            }
            assert!(tex.vertex.contains("texCoord"));
        }
    }
}
