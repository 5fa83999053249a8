use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::driver::ShaderStage;

/// Where a failed source read came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    File(PathBuf),
    Stream,
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOrigin::File(path) => write!(f, "file \"{}\"", path.display()),
            SourceOrigin::Stream => f.write_str("stream"),
        }
    }
}

/// Failure to build a shader program.
///
/// When any of these is returned the shader keeps its previous program.
#[derive(Debug)]
pub enum ShaderError {
    /// A geometry stage was supplied but the driver has no geometry shaders.
    GeometryUnsupported,
    /// The driver refused to allocate a program or stage object.
    ProgramCreation(String),
    /// A stage failed to compile; `log` is the driver's info log (bounded).
    Compile { stage: ShaderStage, log: String },
    /// The stages compiled but did not link.
    Link { log: String },
    /// Source could not be read.
    Read {
        stage: ShaderStage,
        origin: SourceOrigin,
        source: io::Error,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::GeometryUnsupported => f.write_str(
                "geometry shaders are not supported by this driver \
                 (check Shader::is_geometry_available first)",
            ),
            ShaderError::ProgramCreation(msg) => {
                write!(f, "failed to create shader object: {msg}")
            }
            ShaderError::Compile { stage, log } => {
                write!(f, "failed to compile {} shader:\n{log}", stage.name())
            }
            ShaderError::Link { log } => write!(f, "failed to link shader program:\n{log}"),
            ShaderError::Read { stage, origin, .. } => {
                write!(f, "failed to read {} shader from {origin}", stage.name())
            }
        }
    }
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShaderError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}
