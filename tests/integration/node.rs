#[path = "common/mod.rs"]
mod common;

use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use common::{read_lines, recording_java_home};
use jvmnode::{
    error::{ConfigurationError, NodeError},
    node::{
        ArchiveExtractor, ErrorReporter, GuardedNode, JavaSettings, KafkaNode, NodeContext,
        NodeLayout, NodeRunner, StaticPeers, ZooKeeperNode,
    },
    properties::PropertiesFile,
};
use tempfile::tempdir;

/// Drops a single jar into the destination instead of unzipping anything.
#[derive(Default)]
struct FakeExtractor {
    calls: Mutex<Vec<(String, String)>>,
}

impl ArchiveExtractor for FakeExtractor {
    fn extract(&self, archive: &Path, destination: &Path) -> std::io::Result<()> {
        self.calls.lock().unwrap().push((
            archive.display().to_string(),
            destination.display().to_string(),
        ));
        fs::write(destination.join("daemon.jar"), b"jar")
    }
}

struct FailingExtractor;

impl ArchiveExtractor for FailingExtractor {
    fn extract(&self, _: &Path, _: &Path) -> std::io::Result<()> {
        Err(std::io::Error::other("corrupt archive"))
    }
}

#[derive(Default)]
struct RecordingReporter {
    reports: Mutex<Vec<String>>,
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, label: &str, error: &(dyn std::error::Error + 'static)) {
        self.reports
            .lock()
            .unwrap()
            .push(format!("{label}: {error}"));
    }
}

fn read_properties(path: &Path) -> PropertiesFile {
    PropertiesFile::parse(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn kafka_setup_writes_server_and_log4j_properties() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path().join("kafka");
    let extractor = Arc::new(FakeExtractor::default());
    let context = NodeContext::new(
        NodeLayout::under(&root),
        JavaSettings::new(temp.path().join("java")),
    )
    .with_archive(temp.path().join("Jars.zip"))
    .with_extractor(extractor.clone());

    let node = KafkaNode::new(
        context,
        7,
        Arc::new(StaticPeers(vec!["zk1".into(), "zk2".into()])),
    )
    .with_overrides(vec![("num.partitions".into(), "8".into())]);
    node.setup().unwrap();

    assert!(root.join("jars").join("daemon.jar").is_file());
    assert_eq!(extractor.calls.lock().unwrap().len(), 1);
    for dir in ["data", "config", "logs", "jars"] {
        assert!(root.join(dir).is_dir(), "{dir} was not created");
    }

    let server = read_properties(&node.server_properties_path());
    assert_eq!(server.get("broker.id"), Some("7"));
    assert_eq!(server.get("port"), Some("9092"));
    assert_eq!(server.get("zookeeper.connect"), Some("zk1:2181,zk2:2181"));
    assert_eq!(
        server.get("log.dirs").map(str::to_string),
        Some(root.join("data").display().to_string())
    );
    assert_eq!(server.get("num.partitions"), Some("8"));

    let log4j = read_properties(&node.log4j_properties_path());
    assert_eq!(
        log4j.get("kafka.logs.dir").map(str::to_string),
        Some(root.join("logs").display().to_string())
    );
    assert_eq!(log4j.get("log4j.rootLogger"), Some("INFO,stdout"));
    assert_eq!(
        log4j.get("log4j.logger.kafka.state.change.logger"),
        Some("TRACE,stateChangeAppender")
    );
}

#[test]
fn kafka_run_once_launches_broker_with_its_configs() {
    let temp = tempdir().expect("failed to create tempdir");
    let args_file = temp.path().join("args");
    let java_home = recording_java_home(temp.path(), &args_file, 0);
    let root = temp.path().join("kafka");

    let context = NodeContext::new(
        NodeLayout::under(&root),
        JavaSettings {
            max_memory_mb: 1024,
            ..JavaSettings::new(&java_home)
        },
    );
    let node = KafkaNode::new(context, 1, Arc::new(StaticPeers(vec!["zk1".into()])));
    node.setup().unwrap();

    assert_eq!(node.run(false, None).unwrap(), 0);

    let args = read_lines(&args_file);
    assert_eq!(args[0], "-cp");
    assert_eq!(args[1], root.join("jars").join("*").display().to_string());
    assert_eq!(
        args[2],
        format!(
            "-Dlog4j.configuration=file:{}",
            node.log4j_properties_path().display()
        )
    );
    assert_eq!(args[3], "-Xmx1024M");
    assert_eq!(args[4], "-server");
    assert_eq!(args[5], "kafka.Kafka");
    assert_eq!(args[6], node.server_properties_path().display().to_string());
}

#[test]
fn zookeeper_quorum_setup_writes_myid() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path().join("zk");
    let context = NodeContext::new(
        NodeLayout::under(&root),
        JavaSettings::new(temp.path().join("java")),
    );
    let node = ZooKeeperNode::new(
        context,
        Arc::new(StaticPeers(vec![
            "zk1".into(),
            "zk2:2889:3889".into(),
            "zk3".into(),
        ])),
    )
    .with_my_id(2);
    node.setup().unwrap();

    let properties = read_properties(&node.zookeeper_properties_path());
    assert_eq!(properties.get("clientPort"), Some("2181"));
    assert_eq!(properties.get("server.2"), Some("zk2:2889:3889"));
    assert_eq!(properties.get("tickTime"), Some("2000"));
    assert_eq!(
        fs::read_to_string(root.join("data").join("myid")).unwrap(),
        "2"
    );

    let log4j = read_properties(&node.log4j_properties_path());
    assert_eq!(log4j.get("log4j.rootLogger"), Some("INFO,stdout,file"));
}

#[test]
fn zookeeper_rejects_malformed_peer_before_touching_disk() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path().join("zk");
    let context = NodeContext::new(
        NodeLayout::under(&root),
        JavaSettings::new(temp.path().join("java")),
    );
    let node = ZooKeeperNode::new(context, Arc::new(StaticPeers(vec!["zk1:2888".into()])));

    match node.setup() {
        Err(NodeError::Configuration(ConfigurationError::FieldCount { found, .. })) => {
            assert_eq!(found, 2)
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!root.exists());
}

#[test]
fn guarded_node_reports_setup_failure_and_returns_it() {
    let temp = tempdir().expect("failed to create tempdir");
    let context = NodeContext::new(
        NodeLayout::under(temp.path().join("zk")),
        JavaSettings::new(temp.path().join("java")),
    )
    .with_archive(temp.path().join("Jars.zip"))
    .with_extractor(Arc::new(FailingExtractor));
    let reporter = Arc::new(RecordingReporter::default());
    let node = GuardedNode::new(
        ZooKeeperNode::new(context, Arc::new(StaticPeers::default())),
        "zk-standalone",
        reporter.clone(),
    );

    let err = node.setup().unwrap_err();
    assert!(matches!(err, NodeError::Extraction { .. }));

    let reports = reporter.reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].starts_with("Exception from zk-standalone on "));
    assert!(reports[0].contains("Jars.zip"));
}

#[test]
fn run_without_java_is_a_configuration_error() {
    let temp = tempdir().expect("failed to create tempdir");
    let context = NodeContext::new(
        NodeLayout::under(temp.path().join("zk")),
        JavaSettings::new(temp.path().join("missing-java")),
    );
    let node = ZooKeeperNode::new(context, Arc::new(StaticPeers::default()));
    assert!(matches!(
        node.run(false, None),
        Err(NodeError::Configuration(ConfigurationError::MissingExecutable(_)))
    ));
}
