use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Detection error: {0}")]
    Detection(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Camera("device 0 busy".to_string());
        assert_eq!(err.to_string(), "Camera error: device 0 busy");

        let err = Error::Configuration("window must be positive".to_string());
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }
}
