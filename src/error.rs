use std::path::PathBuf;

/// Startup configuration errors. These are programmer mistakes and abort launch.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum WiringError {
    #[error("no menu control named '{0}'")]
    UnknownControl(String),

    #[error("menu control '{0}' has no binding")]
    Unbound(String),

    #[error("menu control '{0}' is bound as both status and action")]
    DoubleBound(String),
}

/// Failures while turning a picked file into an image payload.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("could not read '{name}': {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data URI: {0}")]
    DataUri(String),

    #[error("'{name}' is not a decodable image: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("upload worker stopped before reporting a result")]
    Disconnected,
}

/// Failures while flattening, encoding or delivering an export.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("encode error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("could not write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything a menu press can fail with.
#[derive(thiserror::Error, Debug)]
pub enum ControlError {
    #[error(transparent)]
    Wiring(#[from] WiringError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
