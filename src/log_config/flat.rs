//! Flat `key=value` rendering of a [`LogConfig`].
use super::{LogConfig, LogConfigRenderer, LoggerScope};
use crate::{error::LogConfigError, properties::PropertiesFile};

/// Compiles a [`LogConfig`] into a [`PropertiesFile`].
///
/// Output order: extra properties, each unique appender (declaration line then
/// its properties), the root logger, then child loggers in declaration order.
/// `additivity.<scope>=false` is written only for non-additive children; an
/// additive child gets no additivity key at all.
#[derive(Debug, Clone, Default)]
pub struct PropertiesRenderer {
    namespace: Option<String>,
}

impl PropertiesRenderer {
    /// Bare keys: `appender.x`, `rootLogger`, `logger.x`, `additivity.x`.
    pub fn new() -> Self {
        Self { namespace: None }
    }

    /// log4j 1.x keys: `log4j.appender.x`, `log4j.rootLogger`, ...
    pub fn log4j() -> Self {
        Self::with_namespace("log4j")
    }

    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
        }
    }

    fn key(&self, suffix: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}.{suffix}"),
            None => suffix.to_string(),
        }
    }

    pub fn compile(&self, config: &LogConfig) -> PropertiesFile {
        let mut entries: Vec<(String, String)> = config.properties().to_vec();

        for appender in config.unique_appenders() {
            let prefix = self.key(&format!("appender.{}", appender.name()));
            entries.push((prefix.clone(), appender.class_name().to_string()));
            entries.extend(
                appender
                    .properties()
                    .iter()
                    .map(|(key, value)| (format!("{prefix}.{key}"), value.clone())),
            );
        }

        entries.push((self.key("rootLogger"), config.root().definition_line()));

        for child in config.children() {
            if let LoggerScope::Child { name, additivity } = child.scope() {
                entries.push((
                    self.key(&format!("logger.{name}")),
                    child.definition_line(),
                ));
                if !additivity {
                    entries.push((self.key(&format!("additivity.{name}")), "false".into()));
                }
            }
        }

        PropertiesFile::new(entries)
    }
}

impl LogConfigRenderer for PropertiesRenderer {
    fn file_name(&self) -> &'static str {
        "log4j.properties"
    }

    fn render(&self, config: &LogConfig) -> Result<String, LogConfigError> {
        Ok(self.compile(config).to_text())
    }
}
