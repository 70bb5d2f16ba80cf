#[path = "common/mod.rs"]
mod common;

use std::fs;

use assert_cmd::Command;
use common::{read_lines, recording_java_home};
use predicates::prelude::*;
use tempfile::tempdir;

const LOG_MANIFEST: &str = r#"properties:
  app.logs.dir: /var/log/app
appenders:
  - name: stdout
    class: org.apache.log4j.ConsoleAppender
  - name: file
    class: org.apache.log4j.FileAppender
    properties:
      File: ${app.logs.dir}/app.log
root:
  level: INFO
  appenders: [stdout]
loggers:
  - name: com.example
    level: DEBUG
    appenders: [file]
    additivity: false
"#;

fn jvmnode() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("jvmnode"))
}

#[test]
fn render_prints_log4j_properties() {
    let temp = tempdir().expect("failed to create tempdir");
    let manifest = temp.path().join("logging.yaml");
    fs::write(&manifest, LOG_MANIFEST).expect("failed to write manifest");

    jvmnode()
        .arg("render")
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("app.logs.dir=/var/log/app"))
        .stdout(predicate::str::contains(
            "log4j.appender.file.File=${app.logs.dir}/app.log",
        ))
        .stdout(predicate::str::contains("log4j.rootLogger=INFO,stdout"))
        .stdout(predicate::str::contains(
            "log4j.logger.com.example=DEBUG,file",
        ))
        .stdout(predicate::str::contains(
            "log4j.additivity.com.example=false",
        ));
}

#[test]
fn render_writes_xml_to_output_file() {
    let temp = tempdir().expect("failed to create tempdir");
    let manifest = temp.path().join("logging.yaml");
    let output = temp.path().join("logback.xml");
    fs::write(&manifest, LOG_MANIFEST).expect("failed to write manifest");

    jvmnode()
        .args(["render", "--format", "xml", "--manifest"])
        .arg(&manifest)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let xml = fs::read_to_string(&output).expect("output not written");
    assert!(xml.contains(r#"<appender name="stdout" class="org.apache.log4j.ConsoleAppender""#));
    assert!(xml.contains(r#"<logger name="com.example" additivity="false" level="DEBUG">"#));
}

#[test]
fn render_rejects_unknown_appender() {
    let temp = tempdir().expect("failed to create tempdir");
    let manifest = temp.path().join("logging.yaml");
    fs::write(
        &manifest,
        "root:\n  level: INFO\n  appenders: [missing]\n",
    )
    .expect("failed to write manifest");

    jvmnode()
        .arg("render")
        .arg("-m")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn inspect_prints_entries_in_order() {
    let temp = tempdir().expect("failed to create tempdir");
    let file = temp.path().join("server.properties");
    fs::write(&file, "broker.id=1\n\nport=9092\n").expect("failed to write properties");

    jvmnode()
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stdout("broker.id = 1\nport = 9092\n");
}

#[test]
fn inspect_fails_on_malformed_line() {
    let temp = tempdir().expect("failed to create tempdir");
    let file = temp.path().join("broken.properties");
    fs::write(&file, "broker.id=1\nnot a pair\n").expect("failed to write properties");

    jvmnode()
        .arg("inspect")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a pair"));
}

#[test]
fn setup_prepares_zookeeper_node_from_manifest() {
    let temp = tempdir().expect("failed to create tempdir");
    let manifest = temp.path().join("jvmnode.yaml");
    fs::write(
        &manifest,
        r#"name: zk-2
java_home: ./java
root: ./zk
node:
  kind: zookeeper
  my_id: 2
  peers: [zk1, zk2, zk3]
"#,
    )
    .expect("failed to write manifest");

    jvmnode()
        .arg("setup")
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .success();

    let root = temp.path().join("zk");
    let properties = fs::read_to_string(root.join("config").join("zookeeper.properties"))
        .expect("zookeeper.properties not written");
    assert!(properties.contains("server.3=zk3:2888:3888"));
    assert_eq!(
        fs::read_to_string(root.join("data").join("myid")).unwrap(),
        "2"
    );
    assert!(root.join("config").join("log4j.properties").is_file());
}

#[test]
fn run_once_exits_with_daemon_exit_code() {
    let temp = tempdir().expect("failed to create tempdir");
    let args_file = temp.path().join("args");
    recording_java_home(temp.path(), &args_file, 4);
    let manifest = temp.path().join("jvmnode.yaml");
    fs::write(
        &manifest,
        r#"java_home: ./java
root: ./app
max_memory_mb: 256
node:
  kind: custom
  entry_point: com.example.Main
  arguments: [--verbose]
  defines:
    app.mode: batch
"#,
    )
    .expect("failed to write manifest");

    jvmnode()
        .args(["run", "--once", "--manifest"])
        .arg(&manifest)
        .assert()
        .code(4);

    let args = read_lines(&args_file);
    assert!(args.contains(&"-Dapp.mode=batch".to_string()));
    assert!(args.contains(&"-Xmx256M".to_string()));
    assert_eq!(
        &args[args.len() - 2..],
        ["com.example.Main".to_string(), "--verbose".to_string()]
    );
}

#[test]
fn missing_manifest_is_reported() {
    let temp = tempdir().expect("failed to create tempdir");
    jvmnode()
        .arg("setup")
        .arg("--manifest")
        .arg(temp.path().join("absent.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.yaml"));
}
