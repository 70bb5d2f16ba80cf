//! Kafka broker node.
use std::{path::PathBuf, sync::Arc};

use tracing::info;

use super::{
    EntryPoint, NodeContext, NodeRunner, PeerSource, forward_slashes, log4j_configuration_define,
};
use crate::{
    error::{ConfigurationError, NodeError},
    log_config::{
        AppenderDefinition, Level, LogConfig, LoggerDefinition, flat::PropertiesRenderer, log4j,
    },
    properties::PropertiesFile,
    supervisor::ProcessMonitor,
};

pub const ENTRY_POINT: &str = "kafka.Kafka";

/// Broker listener port.
pub const DEFAULT_PORT: u16 = 9092;

/// ZooKeeper client port brokers connect to unless told otherwise.
pub const DEFAULT_ZOOKEEPER_PORT: u16 = 2181;

/// Log4j variable the file appenders resolve their directory from.
pub const LOGS_DIR_PROPERTY: &str = "kafka.logs.dir";

const SERVER_PROPERTIES: &str = "server.properties";
const LOG4J_PROPERTIES: &str = "log4j.properties";

/// Contents of `server.properties`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaServerConfig {
    properties: PropertiesFile,
}

impl KafkaServerConfig {
    pub fn new(broker_id: u32, log_dirs: &str, zookeeper_connect: &str) -> Self {
        Self {
            properties: PropertiesFile::new([
                ("broker.id", broker_id.to_string()),
                ("port", DEFAULT_PORT.to_string()),
                ("log.dirs", log_dirs.to_string()),
                ("zookeeper.connect", zookeeper_connect.to_string()),
            ]),
        }
    }

    /// Copy with `key` set to `value`, replacing a default in place.
    pub fn with_config(&self, key: &str, value: &str) -> Self {
        Self {
            properties: self.properties.with_entry(key, value),
        }
    }

    pub fn properties(&self) -> &PropertiesFile {
        &self.properties
    }
}

/// `host:port` per ZooKeeper host, comma separated.
pub fn zookeeper_connection_string(hosts: &[String], port: u16) -> String {
    hosts
        .iter()
        .map(|host| format!("{host}:{port}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// The stock broker logging setup: console at the root plus one file per subsystem.
pub fn log_config(logs_dir: &str) -> Result<LogConfig, ConfigurationError> {
    let console = log4j::console_appender("stdout", None);
    let kafka = qualified_file_appender("kafkaAppender", "server.log");
    let state_change = qualified_file_appender("stateChangeAppender", "state-change.log");
    let request = qualified_file_appender("requestAppender", "kafka-request.log");
    let cleaner = qualified_file_appender("cleanerAppender", "log-cleaner.log");
    let controller = qualified_file_appender("controllerAppender", "controller.log");

    let children = [
        LoggerDefinition::child("kafka", Level::Info, [kafka]),
        LoggerDefinition::child("kafka.network.RequestChannel$", Level::Warn, [request.clone()])
            .with_additivity(false),
        LoggerDefinition::child("kafka.request.logger", Level::Warn, [request])
            .with_additivity(false),
        LoggerDefinition::child("kafka.controller", Level::Trace, [controller])
            .with_additivity(false),
        LoggerDefinition::child("kafka.log.LogCleaner", Level::Info, [cleaner])
            .with_additivity(false),
        LoggerDefinition::child("kafka.state.change.logger", Level::Trace, [state_change])
            .with_additivity(false),
    ];

    Ok(
        LogConfig::new(LoggerDefinition::root(Level::Info, [console]), children)?
            .with_property(LOGS_DIR_PROPERTY, logs_dir),
    )
}

fn qualified_file_appender(name: &str, file_name: &str) -> AppenderDefinition {
    log4j::file_appender(
        name,
        &format!("${{{LOGS_DIR_PROPERTY}}}/{file_name}"),
        None,
    )
}

/// A single Kafka broker.
pub struct KafkaNode {
    context: NodeContext,
    broker_id: u32,
    zookeeper_hosts: Arc<dyn PeerSource>,
    zookeeper_port: u16,
    overrides: Vec<(String, String)>,
}

impl KafkaNode {
    pub fn new(context: NodeContext, broker_id: u32, zookeeper_hosts: Arc<dyn PeerSource>) -> Self {
        Self {
            context,
            broker_id,
            zookeeper_hosts,
            zookeeper_port: DEFAULT_ZOOKEEPER_PORT,
            overrides: Vec::new(),
        }
    }

    pub fn with_zookeeper_port(mut self, port: u16) -> Self {
        self.zookeeper_port = port;
        self
    }

    /// Extra `server.properties` entries, applied over the defaults in order.
    pub fn with_overrides(mut self, overrides: Vec<(String, String)>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn server_properties_path(&self) -> PathBuf {
        self.context.config_path(SERVER_PROPERTIES)
    }

    pub fn log4j_properties_path(&self) -> PathBuf {
        self.context.config_path(LOG4J_PROPERTIES)
    }

    pub fn server_config(&self) -> KafkaServerConfig {
        let connect =
            zookeeper_connection_string(&self.zookeeper_hosts.peers(), self.zookeeper_port);
        info!("Zookeeper connection string: {connect}");

        let defaults = KafkaServerConfig::new(
            self.broker_id,
            &forward_slashes(&self.context.layout.data),
            &connect,
        );
        self.overrides
            .iter()
            .fold(defaults, |config, (key, value)| config.with_config(key, value))
    }
}

impl NodeRunner for KafkaNode {
    fn setup(&self) -> Result<(), NodeError> {
        self.context.prepare()?;

        self.server_config()
            .properties()
            .write_to_file(&self.server_properties_path())?;

        let logging = log_config(&forward_slashes(&self.context.layout.logs))?;
        PropertiesRenderer::log4j()
            .compile(&logging)
            .write_to_file(&self.log4j_properties_path())?;
        Ok(())
    }

    fn run(
        &self,
        run_continuous: bool,
        monitor: Option<Arc<dyn ProcessMonitor>>,
    ) -> Result<i32, NodeError> {
        let launch = EntryPoint {
            class_name: ENTRY_POINT,
            arguments: vec![self.server_properties_path().to_string_lossy().into_owned()],
            defines: vec![log4j_configuration_define(&self.log4j_properties_path())],
            ..EntryPoint::default()
        };
        self.context.run_entry_point(launch, run_continuous, monitor)
    }
}
