//! ZooKeeper server node, standalone or as part of a quorum.
use std::{fmt, path::PathBuf, str::FromStr, sync::Arc};

use tracing::info;

use super::{
    EntryPoint, NodeContext, NodeRunner, PeerSource, forward_slashes, log4j_configuration_define,
    write_file,
};
use crate::{
    error::{ConfigurationError, NodeError},
    log_config::{Level, LogConfig, LoggerDefinition, flat::PropertiesRenderer, log4j},
    properties::PropertiesFile,
    supervisor::ProcessMonitor,
};

pub const ENTRY_POINT: &str = "org.apache.zookeeper.server.quorum.QuorumPeerMain";

pub const DEFAULT_CLIENT_PORT: u16 = 2181;
pub const DEFAULT_QUORUM_PORT: u16 = 2888;
pub const DEFAULT_ELECTION_PORT: u16 = 3888;

const ZOOKEEPER_PROPERTIES: &str = "zookeeper.properties";
const LOG4J_PROPERTIES: &str = "log4j.properties";

/// One member of a ZooKeeper ensemble: `host:quorum_port:election_port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumPeer {
    pub host: String,
    pub quorum_port: u16,
    pub election_port: u16,
}

impl QuorumPeer {
    /// A peer on the default quorum and election ports.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            quorum_port: DEFAULT_QUORUM_PORT,
            election_port: DEFAULT_ELECTION_PORT,
        }
    }
}

impl fmt::Display for QuorumPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.host, self.quorum_port, self.election_port)
    }
}

impl FromStr for QuorumPeer {
    type Err = ConfigurationError;

    /// Accepts a bare host (default ports) or all three fields.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        match fields.as_slice() {
            [host] if !host.is_empty() => Ok(Self::new(*host)),
            [host, quorum, election] if !host.is_empty() => Ok(Self {
                host: host.to_string(),
                quorum_port: parse_port(s, quorum)?,
                election_port: parse_port(s, election)?,
            }),
            _ => Err(ConfigurationError::FieldCount {
                value: s.to_string(),
                expected: 3,
                found: fields.len(),
            }),
        }
    }
}

fn parse_port(value: &str, port: &str) -> Result<u16, ConfigurationError> {
    match port.parse::<u16>() {
        Ok(parsed) if parsed != 0 => Ok(parsed),
        _ => Err(ConfigurationError::InvalidPort {
            value: value.to_string(),
            port: port.to_string(),
        }),
    }
}

/// Contents of `zookeeper.properties`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZooKeeperConfig {
    pub data_dir: String,
    pub client_port: u16,
    /// Ensemble members ordered by id. Empty for a standalone server.
    pub peers: Vec<QuorumPeer>,
    /// This server's 1-based position in `peers`.
    pub my_id: u32,
    /// Milliseconds per tick.
    pub tick_time: u32,
    /// Ticks a follower may take to connect and sync to a leader.
    pub init_limit: u32,
    /// Ticks a follower may lag behind a leader.
    pub sync_limit: u32,
}

impl ZooKeeperConfig {
    pub fn new(data_dir: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            client_port: DEFAULT_CLIENT_PORT,
            peers: Vec::new(),
            my_id: 1,
            tick_time: 2000,
            init_limit: 5,
            sync_limit: 2,
        }
    }

    pub fn is_quorum(&self) -> bool {
        !self.peers.is_empty()
    }

    pub fn to_properties_file(&self) -> PropertiesFile {
        let mut entries = vec![
            ("dataDir".to_string(), self.data_dir.replace('\\', "/")),
            ("clientPort".to_string(), self.client_port.to_string()),
        ];
        if self.is_quorum() {
            entries.extend(
                self.peers
                    .iter()
                    .enumerate()
                    .map(|(i, peer)| (format!("server.{}", i + 1), peer.to_string())),
            );
            entries.extend([
                ("tickTime".to_string(), self.tick_time.to_string()),
                ("initLimit".to_string(), self.init_limit.to_string()),
                ("syncLimit".to_string(), self.sync_limit.to_string()),
            ]);
        }
        PropertiesFile::new(entries)
    }
}

/// Root at `INFO` to the console and a daily rolling `zk.log`.
pub fn log_config(logs_dir: &str) -> Result<LogConfig, ConfigurationError> {
    let console = log4j::console_appender("stdout", None);
    let file = log4j::daily_rolling_file_appender(
        "file",
        &format!("{}/zk.log", logs_dir.replace('\\', "/")),
        None,
        None,
    );
    LogConfig::new(
        LoggerDefinition::root(Level::Info, [console, file]),
        Vec::new(),
    )
}

/// A ZooKeeper server.
pub struct ZooKeeperNode {
    context: NodeContext,
    peers: Arc<dyn PeerSource>,
    my_id: u32,
    client_port: u16,
}

impl ZooKeeperNode {
    pub fn new(context: NodeContext, peers: Arc<dyn PeerSource>) -> Self {
        Self {
            context,
            peers,
            my_id: 1,
            client_port: DEFAULT_CLIENT_PORT,
        }
    }

    pub fn with_my_id(mut self, my_id: u32) -> Self {
        self.my_id = my_id;
        self
    }

    pub fn with_client_port(mut self, port: u16) -> Self {
        self.client_port = port;
        self
    }

    pub fn zookeeper_properties_path(&self) -> PathBuf {
        self.context.config_path(ZOOKEEPER_PROPERTIES)
    }

    pub fn log4j_properties_path(&self) -> PathBuf {
        self.context.config_path(LOG4J_PROPERTIES)
    }

    pub fn server_config(&self) -> Result<ZooKeeperConfig, ConfigurationError> {
        let peers = self
            .peers
            .peers()
            .iter()
            .map(|peer| peer.parse())
            .collect::<Result<Vec<QuorumPeer>, _>>()?;
        if !peers.is_empty() && !(1..=peers.len()).contains(&(self.my_id as usize)) {
            return Err(ConfigurationError::InvalidServerId {
                my_id: self.my_id,
                servers: peers.len(),
            });
        }
        Ok(ZooKeeperConfig {
            client_port: self.client_port,
            peers,
            my_id: self.my_id,
            ..ZooKeeperConfig::new(forward_slashes(&self.context.layout.data))
        })
    }
}

impl NodeRunner for ZooKeeperNode {
    fn setup(&self) -> Result<(), NodeError> {
        let config = self.server_config()?;
        self.context.prepare()?;

        config
            .to_properties_file()
            .write_to_file(&self.zookeeper_properties_path())?;
        if config.is_quorum() {
            info!("Joining a {}-server ensemble as server {}", config.peers.len(), config.my_id);
            write_file(
                &self.context.layout.data.join("myid"),
                &config.my_id.to_string(),
            )?;
        }

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
            arguments: vec![
                self.zookeeper_properties_path()
                    .to_string_lossy()
                    .into_owned(),
            ],
            defines: vec![log4j_configuration_define(&self.log4j_properties_path())],
            ..EntryPoint::default()
        };
        self.context.run_entry_point(launch, run_continuous, monitor)
    }
}
