use std::time::Duration;

pub type MapResult<T> = Result<T, MapError>;

#[derive(thiserror::Error, Debug)]
pub enum MapError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("capture timeout: section {section} never reached {phase} within {waited:?}")]
    CaptureTimeout {
        phase: &'static str,
        section: usize,
        waited: Duration,
    },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("renderer error: {0}")]
    Renderer(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MapError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn renderer(msg: impl Into<String>) -> Self {
        Self::Renderer(msg.into())
    }

    pub fn capture_timeout(phase: &'static str, section: usize, waited: Duration) -> Self {
        Self::CaptureTimeout {
            phase,
            section,
            waited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            MapError::configuration("x")
                .to_string()
                .contains("configuration error:")
        );
        assert!(
            MapError::encoding("x")
                .to_string()
                .contains("encoding error:")
        );
        assert!(
            MapError::renderer("x")
                .to_string()
                .contains("renderer error:")
        );
        let timeout = MapError::capture_timeout("move-settled", 2, Duration::from_millis(5));
        let msg = timeout.to_string();
        assert!(msg.contains("capture timeout:"));
        assert!(msg.contains("section 2"));
        assert!(msg.contains("move-settled"));
    }

    #[test]
    fn io_errors_convert() {
        let err: MapError = std::io::Error::other("disk full").into();
        assert!(matches!(err, MapError::Io(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = MapError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
