//! jvmnode bootstraps JVM-hosted cluster daemons such as Kafka brokers and
//! ZooKeeper servers on a single machine. It writes the configuration files
//! those daemons read at startup, including their log4j or logback logging
//! setup, then launches the JVM and relaunches it whenever it exits.

/// CLI interface.
pub mod cli;

/// Node manifest loading.
pub mod config;

/// Error handling.
pub mod error;

/// Logger/appender model and its flat and XML renderers.
pub mod log_config;

/// Per-technology node setup and lifecycle.
pub mod node;

/// Ordered `key=value` documents.
pub mod properties;

/// Java process supervision.
pub mod supervisor;
