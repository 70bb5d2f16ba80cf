//! Node lifecycle: prepare a machine for a Java daemon, then keep it running.
//!
//! Every technology follows the same two phases. `setup` creates the node's
//! directories, unpacks its jars and writes its configuration files. `run`
//! launches the entry point through a [`JavaRunner`] and, when asked to run
//! continuously, never returns.
pub mod custom;
pub mod kafka;
pub mod zookeeper;

use std::{
    error::Error,
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Local};
use tracing::{debug, error, info};
use zip::ZipArchive;

pub use custom::CustomNode;
pub use kafka::KafkaNode;
pub use zookeeper::ZooKeeperNode;

use crate::{
    error::NodeError,
    supervisor::{
        JavaRunner, LaunchSpec, ProcessMonitor, RestartPolicy, classpath_for_jars_in,
        debug_options,
    },
};

/// The two lifecycle phases every node exposes.
pub trait NodeRunner: Send + Sync {
    /// Creates directories, unpacks jars and writes configuration files.
    fn setup(&self) -> Result<(), NodeError>;

    /// Launches the node. With `run_continuous` set this only returns on error.
    fn run(
        &self,
        run_continuous: bool,
        monitor: Option<Arc<dyn ProcessMonitor>>,
    ) -> Result<i32, NodeError>;
}

impl<N: NodeRunner + ?Sized> NodeRunner for Box<N> {
    fn setup(&self) -> Result<(), NodeError> {
        (**self).setup()
    }

    fn run(
        &self,
        run_continuous: bool,
        monitor: Option<Arc<dyn ProcessMonitor>>,
    ) -> Result<i32, NodeError> {
        (**self).run(run_continuous, monitor)
    }
}

/// Unpacks a vendored archive.
pub trait ArchiveExtractor: Send + Sync {
    fn extract(&self, archive: &Path, destination: &Path) -> std::io::Result<()>;
}

/// Extracts zip archives in-process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive: &Path, destination: &Path) -> std::io::Result<()> {
        let mut zip = ZipArchive::new(File::open(archive)?)?;
        debug!("Unpacking {} entries from {}", zip.len(), archive.display());
        zip.extract(destination)?;
        Ok(())
    }
}

/// Ordered list of peer addresses making up the node's cluster.
pub trait PeerSource: Send + Sync {
    fn peers(&self) -> Vec<String>;
}

/// A fixed peer list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPeers(pub Vec<String>);

impl PeerSource for StaticPeers {
    fn peers(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// Sink for errors that abort a node's lifecycle.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, label: &str, error: &(dyn Error + 'static));
}

/// Logs reported errors, with their source chain, at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, label: &str, error: &(dyn Error + 'static)) {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        error!("{label}: {message}");
    }
}

/// Label an error report is filed under.
pub fn exception_label(node_id: &str, at: DateTime<Local>) -> String {
    format!("Exception from {node_id} on {}", at.format("%Y-%m-%d %H:%M:%S"))
}

/// Wraps a node so any setup or run failure is reported before it is returned.
pub struct GuardedNode<N> {
    node: N,
    node_id: String,
    reporter: Arc<dyn ErrorReporter>,
}

impl<N: NodeRunner> GuardedNode<N> {
    pub fn new(node: N, node_id: impl Into<String>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            node,
            node_id: node_id.into(),
            reporter,
        }
    }

    fn guard<T>(&self, result: Result<T, NodeError>) -> Result<T, NodeError> {
        if let Err(err) = &result {
            self.reporter
                .report(&exception_label(&self.node_id, Local::now()), err);
        }
        result
    }
}

impl<N: NodeRunner> NodeRunner for GuardedNode<N> {
    fn setup(&self) -> Result<(), NodeError> {
        self.guard(self.node.setup())
    }

    fn run(
        &self,
        run_continuous: bool,
        monitor: Option<Arc<dyn ProcessMonitor>>,
    ) -> Result<i32, NodeError> {
        self.guard(self.node.run(run_continuous, monitor))
    }
}

/// Filesystem roots of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLayout {
    /// Persistent data (snapshots, message logs).
    pub data: PathBuf,
    /// Generated configuration files.
    pub configs: PathBuf,
    /// Daemon log files.
    pub logs: PathBuf,
    /// Extracted jars; the classpath points here.
    pub jars: PathBuf,
}

impl NodeLayout {
    /// `data/`, `config/`, `logs/` and `jars/` below `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data: root.join("data"),
            configs: root.join("config"),
            logs: root.join("logs"),
            jars: root.join("jars"),
        }
    }

    pub fn directories(&self) -> [&Path; 4] {
        [&self.data, &self.configs, &self.logs, &self.jars]
    }
}

/// JVM settings shared by every node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaSettings {
    pub java_home: PathBuf,
    pub max_memory_mb: u32,
    pub extra_options: Vec<String>,
    pub environment: Vec<(String, String)>,
    /// Pause between a daemon exiting and its relaunch.
    pub restart_delay: Duration,
    /// Lets a debugger attach on this port when set.
    pub debug_port: Option<u16>,
}

impl JavaSettings {
    pub fn new(java_home: impl Into<PathBuf>) -> Self {
        Self {
            java_home: java_home.into(),
            max_memory_mb: crate::supervisor::DEFAULT_MAX_MEMORY_MB,
            extra_options: Vec::new(),
            environment: Vec::new(),
            restart_delay: Duration::ZERO,
            debug_port: None,
        }
    }

    fn launch_spec(&self, entry_point: &str, run_continuous: bool) -> LaunchSpec {
        let mut extra_options = self.extra_options.clone();
        if let Some(port) = self.debug_port {
            extra_options.extend(debug_options(port));
        }
        let restart_policy = if run_continuous {
            RestartPolicy::RunForever {
                delay: self.restart_delay,
            }
        } else {
            RestartPolicy::RunOnce
        };
        LaunchSpec {
            max_memory_mb: self.max_memory_mb,
            extra_options,
            environment: self.environment.clone(),
            restart_policy,
            ..LaunchSpec::new(entry_point)
        }
    }
}

/// Everything a node needs besides its technology-specific settings.
#[derive(Clone)]
pub struct NodeContext {
    pub layout: NodeLayout,
    pub java: JavaSettings,
    /// Zip of jars unpacked into `layout.jars` during setup.
    pub archive: Option<PathBuf>,
    pub extractor: Arc<dyn ArchiveExtractor>,
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("layout", &self.layout)
            .field("java", &self.java)
            .field("archive", &self.archive)
            .finish_non_exhaustive()
    }
}

impl NodeContext {
    pub fn new(layout: NodeLayout, java: JavaSettings) -> Self {
        Self {
            layout,
            java,
            archive: None,
            extractor: Arc::new(ZipExtractor),
        }
    }

    pub fn with_archive(mut self, archive: impl Into<PathBuf>) -> Self {
        self.archive = Some(archive.into());
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Creates every layout directory, then unpacks the archive if there is one.
    pub(crate) fn prepare(&self) -> Result<(), NodeError> {
        for dir in self.layout.directories() {
            create_directory(dir)?;
        }

        if let Some(archive) = &self.archive {
            info!(
                "Extracting {} into {}",
                archive.display(),
                self.layout.jars.display()
            );
            self.extractor
                .extract(archive, &self.layout.jars)
                .map_err(|source| NodeError::Extraction {
                    archive: archive.clone(),
                    destination: self.layout.jars.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    pub(crate) fn config_path(&self, file_name: &str) -> PathBuf {
        self.layout.configs.join(file_name)
    }

    /// Runs `entry_point` with every jar in the jars directory on the classpath.
    pub(crate) fn run_entry_point(
        &self,
        launch: EntryPoint<'_>,
        run_continuous: bool,
        monitor: Option<Arc<dyn ProcessMonitor>>,
    ) -> Result<i32, NodeError> {
        let mut runner = JavaRunner::new(&self.java.java_home)?;
        if let Some(monitor) = monitor {
            runner = runner.with_monitor(monitor);
        }

        let mut classpath = classpath_for_jars_in(&[&self.layout.jars]);
        classpath.extend(launch.classpath);
        let spec = LaunchSpec {
            arguments: launch.arguments,
            classpath,
            defines: launch.defines,
            ..self.java.launch_spec(launch.class_name, run_continuous)
        };
        Ok(runner.run_class(&spec)?)
    }
}

/// The per-technology half of a launch.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntryPoint<'a> {
    pub class_name: &'a str,
    pub arguments: Vec<String>,
    pub classpath: Vec<String>,
    pub defines: Vec<(String, Option<String>)>,
}

pub(crate) fn create_directory(path: &Path) -> Result<(), NodeError> {
    debug!("Creating directory {}", path.display());
    fs::create_dir_all(path).map_err(|source| NodeError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<(), NodeError> {
    info!("Writing {}", path.display());
    fs::write(path, contents).map_err(|source| NodeError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// `log4j.configuration` value pointing at a properties file.
pub(crate) fn log4j_configuration_define(path: &Path) -> (String, Option<String>) {
    (
        "log4j.configuration".to_string(),
        Some(format!("file:{}", path.display())),
    )
}

/// Forward slashes only; JVM config files treat `\` as an escape.
pub(crate) fn forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
