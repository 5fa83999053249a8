use std::fs;
use std::io::Read;
use std::path::Path;

use super::error::{ShaderError, SourceOrigin};
use crate::driver::ShaderStage;

pub(super) fn read_file(path: &Path, stage: ShaderStage) -> Result<String, ShaderError> {
    fs::read_to_string(path).map_err(|source| ShaderError::Read {
        stage,
        origin: SourceOrigin::File(path.to_path_buf()),
        source,
    })
}

pub(super) fn read_stream(mut stream: impl Read, stage: ShaderStage) -> Result<String, ShaderError> {
    let mut out = String::new();
    stream
        .read_to_string(&mut out)
        .map_err(|source| ShaderError::Read {
            stage,
            origin: SourceOrigin::Stream,
            source,
        })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_path() {
        let err = read_file(Path::new("/nonexistent/kiln/shader.vert"), ShaderStage::Vertex)
            .unwrap_err();
        match err {
            ShaderError::Read { stage, origin, .. } => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(matches!(origin, SourceOrigin::File(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stream_contents_are_read_whole() {
        let src = read_stream(&b"void main() {}"[..], ShaderStage::Fragment).unwrap();
        assert_eq!(src, "void main() {}");
    }

    #[test]
    fn invalid_utf8_stream_is_an_error() {
        let err = read_stream(&[0xffu8, 0xfe][..], ShaderStage::Fragment).unwrap_err();
        assert!(matches!(err, ShaderError::Read { origin: SourceOrigin::Stream, .. }));
    }
}
