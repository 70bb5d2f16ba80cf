//! Node manifest loading.
//!
//! ```yaml
//! name: kafka-1
//! java_home: /usr/lib/jvm/java-8
//! root: /srv/kafka
//! archive: ./Jars.zip
//! max_memory_mb: 1024
//! restart_delay: 5s
//! env:
//!   KAFKA_HEAP_OPTS: "-Xms512M"
//! node:
//!   kind: kafka
//!   broker_id: 1
//!   zookeeper_hosts: [zk1, zk2, zk3]
//!   overrides:
//!     num.partitions: 8
//! ```
use regex::Regex;
use serde::Deserialize;
use serde_yaml::Mapping;
use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
    time::Duration,
};

use crate::{
    error::ConfigurationError,
    log_config::{
        LogFormat,
        manifest::{LogConfigManifest, scalar, scalar_pairs},
    },
    node::{
        CustomNode, JavaSettings, KafkaNode, NodeContext, NodeLayout, NodeRunner, StaticPeers,
        ZooKeeperNode,
    },
};

/// Manifest read when no path is given.
pub const DEFAULT_MANIFEST: &str = "jvmnode.yaml";

/// Represents the structure of the node manifest.
#[derive(Debug, Deserialize)]
pub struct NodeManifest {
    /// Identity used when reporting failures. Defaults to the node kind.
    pub name: Option<String>,
    /// Java installation whose `bin/java` runs the node.
    pub java_home: PathBuf,
    /// Directory the node's data, config, logs and jars live under.
    pub root: PathBuf,
    #[serde(default)]
    pub directories: DirectoryOverrides,
    /// Zip of jars unpacked during setup.
    pub archive: Option<PathBuf>,
    pub max_memory_mb: Option<u32>,
    #[serde(default)]
    pub extra_java_options: Vec<String>,
    pub debug_port: Option<u16>,
    /// Environment variables layered over the supervisor's own.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Pause before relaunching an exited daemon, e.g. `5s`, `2m`.
    pub restart_delay: Option<String>,
    pub node: NodeKind,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Per-directory replacements for the defaults under `root`.
#[derive(Debug, Default, Deserialize)]
pub struct DirectoryOverrides {
    pub data: Option<PathBuf>,
    pub configs: Option<PathBuf>,
    pub logs: Option<PathBuf>,
    pub jars: Option<PathBuf>,
}

/// Technology-specific settings, selected by `kind`.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    Kafka {
        broker_id: u32,
        #[serde(default)]
        zookeeper_hosts: Vec<String>,
        zookeeper_port: Option<u16>,
        /// Extra `server.properties` entries.
        #[serde(default)]
        overrides: Mapping,
    },
    ZooKeeper {
        /// Ensemble members in id order, `host` or `host:quorum_port:election_port`.
        #[serde(default)]
        peers: Vec<String>,
        my_id: Option<u32>,
        client_port: Option<u16>,
    },
    Custom {
        entry_point: String,
        #[serde(default)]
        arguments: Vec<String>,
        #[serde(default)]
        classpath: Vec<String>,
        /// System properties; a null value renders as a bare `-Dkey`.
        #[serde(default)]
        defines: Mapping,
        log: Option<LogSection>,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Kafka { .. } => "kafka",
            NodeKind::ZooKeeper { .. } => "zookeeper",
            NodeKind::Custom { .. } => "custom",
        }
    }
}

/// Logging configuration for a custom node.
#[derive(Debug, Deserialize)]
pub struct LogSection {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(flatten)]
    pub config: LogConfigManifest,
}

impl NodeManifest {
    pub fn node_id(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.node.name().to_string())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn layout(&self) -> NodeLayout {
        let defaults = NodeLayout::under(self.resolve(&self.root));
        let pick = |custom: &Option<PathBuf>, default: PathBuf| match custom {
            Some(path) => self.resolve(path),
            None => default,
        };
        NodeLayout {
            data: pick(&self.directories.data, defaults.data.clone()),
            configs: pick(&self.directories.configs, defaults.configs.clone()),
            logs: pick(&self.directories.logs, defaults.logs.clone()),
            jars: pick(&self.directories.jars, defaults.jars.clone()),
        }
    }

    pub fn java_settings(&self) -> Result<JavaSettings, ConfigurationError> {
        let defaults = JavaSettings::new(self.resolve(&self.java_home));
        Ok(JavaSettings {
            max_memory_mb: self.max_memory_mb.unwrap_or(defaults.max_memory_mb),
            extra_options: self.extra_java_options.clone(),
            environment: self
                .env
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            restart_delay: match &self.restart_delay {
                Some(raw) => parse_duration(raw)?,
                None => Duration::ZERO,
            },
            debug_port: self.debug_port,
            ..defaults
        })
    }

    pub fn context(&self) -> Result<NodeContext, ConfigurationError> {
        let context = NodeContext::new(self.layout(), self.java_settings()?);
        Ok(match &self.archive {
            Some(archive) => context.with_archive(self.resolve(archive)),
            None => context,
        })
    }

    /// Builds the runner this manifest describes.
    pub fn build(&self) -> Result<Box<dyn NodeRunner>, ConfigurationError> {
        let context = self.context()?;
        let node: Box<dyn NodeRunner> = match &self.node {
            NodeKind::Kafka {
                broker_id,
                zookeeper_hosts,
                zookeeper_port,
                overrides,
            } => {
                let mut node = KafkaNode::new(
                    context,
                    *broker_id,
                    Arc::new(StaticPeers(zookeeper_hosts.clone())),
                )
                .with_overrides(scalar_pairs(overrides)?);
                if let Some(port) = zookeeper_port {
                    node = node.with_zookeeper_port(*port);
                }
                Box::new(node)
            }
            NodeKind::ZooKeeper {
                peers,
                my_id,
                client_port,
            } => {
                let mut node = ZooKeeperNode::new(context, Arc::new(StaticPeers(peers.clone())));
                if let Some(my_id) = my_id {
                    node = node.with_my_id(*my_id);
                }
                if let Some(port) = client_port {
                    node = node.with_client_port(*port);
                }
                Box::new(node)
            }
            NodeKind::Custom {
                entry_point,
                arguments,
                classpath,
                defines,
                log,
            } => {
                let mut node = CustomNode::new(context, entry_point.clone())
                    .with_arguments(arguments.clone())
                    .with_classpath(classpath.clone())
                    .with_defines(parse_defines(defines)?);
                if let Some(log) = log {
                    node = node.with_logging(log.config.resolve()?, log.format);
                }
                Box::new(node)
            }
        };
        Ok(node)
    }
}

fn parse_defines(defines: &Mapping) -> Result<Vec<(String, Option<String>)>, ConfigurationError> {
    defines
        .iter()
        .map(|(key, value)| {
            let key = scalar(key)
                .ok_or_else(|| ConfigurationError::NonScalarValue(format!("{key:?}")))?;
            let value = if value.is_null() {
                None
            } else {
                Some(scalar(value).ok_or_else(|| ConfigurationError::NonScalarValue(key.clone()))?)
            };
            Ok((key, value))
        })
        .collect()
}

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("environment variable pattern is valid")
});

/// Expands `${VAR}` references within a string.
///
/// A bare `$` is literal, so nested class names like `Server$Handler` pass
/// through, and `${a.b}` is left alone so log4j variables survive expansion.
fn expand_env_vars(input: &str) -> Result<String, ConfigurationError> {
    let mut missing = None;
    let result = ENV_VAR.replace_all(input, |caps: &regex::Captures| {
        let var_name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        match env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(var_name) => Err(ConfigurationError::MissingEnvVar(var_name)),
        None => Ok(result.into_owned()),
    }
}

/// Parses a duration string in the format `<number>[s|m|h]`.
pub fn parse_duration(raw: &str) -> Result<Duration, ConfigurationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ConfigurationError::InvalidDuration(raw.to_string()));
    }

    let (amount_str, multiplier) = if let Some(stripped) = value.strip_suffix('s') {
        (stripped.trim(), 1)
    } else if let Some(stripped) = value.strip_suffix('m') {
        (stripped.trim(), 60)
    } else if let Some(stripped) = value.strip_suffix('h') {
        (stripped.trim(), 3600)
    } else {
        (value, 1)
    };

    let amount: u64 = amount_str
        .parse()
        .map_err(|_| ConfigurationError::InvalidDuration(raw.to_string()))?;

    Ok(Duration::from_secs(amount.saturating_mul(multiplier)))
}

/// Loads and parses the node manifest, expanding environment variables.
pub fn load_manifest(manifest_path: Option<&Path>) -> Result<NodeManifest, ConfigurationError> {
    let manifest_path = manifest_path.unwrap_or_else(|| Path::new(DEFAULT_MANIFEST));

    let content = fs::read_to_string(manifest_path).map_err(|e| {
        ConfigurationError::ConfigRead(std::io::Error::new(
            e.kind(),
            format!("{} ({})", e, manifest_path.display()),
        ))
    })?;

    let expanded_content = expand_env_vars(&content)?;
    let mut manifest: NodeManifest = serde_yaml::from_str(&expanded_content)?;

    manifest.base_dir = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(manifest)
}
