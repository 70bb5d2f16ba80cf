//! Any Java entry point, described entirely by the node manifest.
use std::{path::PathBuf, sync::Arc};

use super::{EntryPoint, NodeContext, NodeRunner, log4j_configuration_define, write_file};
use crate::{
    error::NodeError,
    log_config::{LogConfig, LogFormat},
    supervisor::ProcessMonitor,
};

/// A generic JVM daemon with an optional generated logging configuration.
pub struct CustomNode {
    context: NodeContext,
    entry_point: String,
    arguments: Vec<String>,
    classpath: Vec<String>,
    defines: Vec<(String, Option<String>)>,
    logging: Option<(LogConfig, LogFormat)>,
}

impl CustomNode {
    pub fn new(context: NodeContext, entry_point: impl Into<String>) -> Self {
        Self {
            context,
            entry_point: entry_point.into(),
            arguments: Vec::new(),
            classpath: Vec::new(),
            defines: Vec::new(),
            logging: None,
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Entries appended after the jars directory wildcard.
    pub fn with_classpath(mut self, classpath: Vec<String>) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn with_defines(mut self, defines: Vec<(String, Option<String>)>) -> Self {
        self.defines = defines;
        self
    }

    pub fn with_logging(mut self, config: LogConfig, format: LogFormat) -> Self {
        self.logging = Some((config, format));
        self
    }

    /// Where setup writes the logging configuration, if there is one.
    pub fn log_config_path(&self) -> Option<PathBuf> {
        self.logging
            .as_ref()
            .map(|(_, format)| self.context.config_path(format.renderer().file_name()))
    }
}

/// System property that points the logging framework at `path`.
fn logging_define(format: LogFormat, path: &std::path::Path) -> (String, Option<String>) {
    match format {
        LogFormat::Properties | LogFormat::Log4j => log4j_configuration_define(path),
        LogFormat::Xml => (
            "logback.configurationFile".to_string(),
            Some(path.to_string_lossy().into_owned()),
        ),
    }
}

impl NodeRunner for CustomNode {
    fn setup(&self) -> Result<(), NodeError> {
        self.context.prepare()?;

        if let Some((config, format)) = &self.logging {
            let renderer = format.renderer();
            let path = self.context.config_path(renderer.file_name());
            write_file(&path, &renderer.render(config)?)?;
        }
        Ok(())
    }

    fn run(
        &self,
        run_continuous: bool,
        monitor: Option<Arc<dyn ProcessMonitor>>,
    ) -> Result<i32, NodeError> {
        let mut defines = self.defines.clone();
        if let (Some((_, format)), Some(path)) = (&self.logging, self.log_config_path()) {
            defines.push(logging_define(*format, &path));
        }

        let launch = EntryPoint {
            class_name: &self.entry_point,
            arguments: self.arguments.clone(),
            classpath: self.classpath.clone(),
            defines,
        };
        self.context.run_entry_point(launch, run_continuous, monitor)
    }
}
