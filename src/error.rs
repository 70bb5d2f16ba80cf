//! Error handling for jvmnode.
use std::path::PathBuf;

use thiserror::Error;

/// Fatal problems with the inputs a node is set up from. Never retried.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The Java launcher could not be found where it was expected.
    #[error("Java executable not found at {}", .0.display())]
    MissingExecutable(PathBuf),

    /// A multi-field value did not have the expected number of fields.
    #[error("Expected {expected} ':'-separated fields in '{value}', found {found}")]
    FieldCount {
        /// The raw value that failed to parse.
        value: String,
        /// Number of fields required.
        expected: usize,
        /// Number of fields present.
        found: usize,
    },

    /// A port field was not a valid TCP port.
    #[error("Invalid port '{port}' in '{value}'")]
    InvalidPort {
        /// The raw value containing the port.
        value: String,
        /// The offending port text.
        port: String,
    },

    /// A quorum member's id names no server in the ensemble.
    #[error("Server id {my_id} is outside the {servers}-server ensemble (expected 1..={servers})")]
    InvalidServerId {
        /// The configured id of this server.
        my_id: u32,
        /// Number of ensemble members.
        servers: usize,
    },

    /// A logger references an appender that was never declared.
    #[error("Logger '{logger}' references unknown appender '{appender}'")]
    UnknownAppender {
        /// The logger (or `root`) holding the reference.
        logger: String,
        /// The missing appender name.
        appender: String,
    },

    /// The root logger position holds a child logger, or a child list holds a root.
    #[error("Invalid logger tree: {0}")]
    InvalidLoggerTree(String),

    /// A manifest value that must be a scalar (string, number, bool) was not.
    #[error("Value for '{0}' must be a string, number or boolean")]
    NonScalarValue(String),

    /// A `${VAR}` reference in the manifest has no value in the environment.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// A duration string could not be parsed.
    #[error("Invalid duration value: '{0}'")]
    InvalidDuration(String),

    /// Error reading a manifest from disk.
    #[error("Failed to read config file: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// Error parsing YAML.
    #[error("Invalid YAML format: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

/// Error type for properties document operations.
#[derive(Debug, Error)]
pub enum PropertiesError {
    /// The sequence of entries the document was built from failed mid-iteration.
    #[error("Invalid properties input: {0}")]
    InvalidArgument(String),

    /// A non-empty line without a `=` separator.
    #[error("Line {line_number} is not a key=value pair: '{line}'")]
    MalformedLine {
        /// 1-based line number.
        line_number: usize,
        /// The offending line.
        line: String,
    },

    /// Error writing the document to disk.
    #[error("Failed to write properties file {}: {source}", .path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },
}

/// Error type for rendering logging configurations.
#[derive(Debug, Error)]
pub enum LogConfigError {
    /// The XML writer rejected an event.
    #[error("Failed to write XML configuration: {0}")]
    Xml(String),

    /// Rendered XML was not valid UTF-8.
    #[error("Rendered configuration is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Error type for launching and supervising a Java process.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The runner could not be constructed.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Error spawning the Java process.
    #[error("Failed to start '{entry_point}': {source}")]
    Spawn {
        /// The Java class being launched.
        entry_point: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Error waiting for the Java process to exit.
    #[error("Failed to wait for '{entry_point}': {source}")]
    Wait {
        /// The Java class being supervised.
        entry_point: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },
}

/// Defines all errors that can surface from a node's setup or run phase.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Invalid node configuration.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Error producing a properties document.
    #[error(transparent)]
    Properties(#[from] PropertiesError),

    /// Error rendering a logging configuration.
    #[error(transparent)]
    LogConfig(#[from] LogConfigError),

    /// Error supervising the Java process.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// Error creating one of the node directories.
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDirectory {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Error extracting a vendored archive.
    #[error("Failed to extract {} into {}: {source}", .archive.display(), .destination.display())]
    Extraction {
        /// The archive being extracted.
        archive: PathBuf,
        /// The extraction target.
        destination: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Error writing a rendered configuration file.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },
}
