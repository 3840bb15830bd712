use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
///
/// Every variant aborts the whole build. There is no partial-document output.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration precondition was violated
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A route, annotation or association names a class that cannot be found
    #[error("resolution error: unable to resolve {kind} `{name}`")]
    Resolution { kind: ClassKind, name: String },

    /// A schema could not be built for an entity
    #[error("schema build error in `{schema}`: {message}")]
    SchemaBuild { schema: String, message: String },

    /// A registered extension rejected an operation
    #[error("extension error from `{extension}` while building `{target}`: {source}")]
    Extension {
        extension: String,
        /// The route (or schema) being built when the extension failed
        target: String,
        #[source]
        source: crate::extension::ExtensionFailure,
    },

    /// The merged document is not internally consistent
    #[error("assembly error: {0}")]
    Assembly(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Configuration precondition violations, checked before any generation work
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("YML file is required, given `{0}`")]
    InvalidSeedFile(String),

    #[error("YML file not found, try specifying full path, given `{}`", .0.display())]
    MissingSeedFile(PathBuf),

    #[error("prefix is required")]
    MissingPrefix,

    #[error("unable to create swagger file `{}`, try creating an empty file first or checking permissions", .0.display())]
    OutputNotWritable(PathBuf),
}

/// The kind of class a resolution error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Controller,
    Table,
    Entity,
}

impl std::fmt::Display for ClassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ClassKind::Controller => write!(f, "controller"),
            ClassKind::Table => write!(f, "table class"),
            ClassKind::Entity => write!(f, "entity"),
        }
    }
}

impl Error {
    pub fn resolution(kind: ClassKind, name: impl Into<String>) -> Self {
        Error::Resolution {
            kind,
            name: name.into(),
        }
    }

    pub fn schema_build(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Error::SchemaBuild {
            schema: schema.into(),
            message: message.into(),
        }
    }

    /// Short name of the error kind, used by the CLI when reporting failures
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "ConfigurationError",
            Error::Resolution { .. } => "ResolutionError",
            Error::SchemaBuild { .. } => "SchemaBuildError",
            Error::Extension { .. } => "ExtensionError",
            Error::Assembly(_) => "AssemblyError",
            Error::Io { .. } => "IoError",
            Error::Serialization(_) => "SerializationError",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}
