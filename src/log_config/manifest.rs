//! YAML description of a [`LogConfig`].
//!
//! ```yaml
//! properties:
//!   app.logs.dir: /var/log/app
//! appenders:
//!   - name: stdout
//!     class: org.apache.log4j.ConsoleAppender
//!     properties:
//!       layout: org.apache.log4j.PatternLayout
//!       layout.ConversionPattern: "[%d] %p %m (%c)%n"
//! root:
//!   level: INFO
//!   appenders: [stdout]
//! loggers:
//!   - name: org.apache.zookeeper
//!     level: WARN
//!     appenders: [stdout]
//!     additivity: false
//! ```
use std::{fs, path::Path};

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::{AppenderDefinition, Level, LogConfig, LoggerDefinition};
use crate::error::ConfigurationError;

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfigManifest {
    /// Extra top-level properties, in file order.
    #[serde(default)]
    pub properties: Mapping,
    #[serde(default)]
    pub appenders: Vec<AppenderManifest>,
    pub root: RootManifest,
    #[serde(default)]
    pub loggers: Vec<LoggerManifest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppenderManifest {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub properties: Mapping,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RootManifest {
    pub level: Level,
    #[serde(default)]
    pub appenders: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggerManifest {
    pub name: String,
    pub level: Level,
    #[serde(default)]
    pub appenders: Vec<String>,
    #[serde(default = "additive")]
    pub additivity: bool,
}

fn additive() -> bool {
    true
}

impl LogConfigManifest {
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigurationError::ConfigRead(std::io::Error::new(
                e.kind(),
                format!("{} ({})", e, path.display()),
            ))
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Resolves appender names into definitions and builds the configuration.
    pub fn resolve(&self) -> Result<LogConfig, ConfigurationError> {
        let mut appenders = Vec::with_capacity(self.appenders.len());
        for appender in &self.appenders {
            appenders.push(AppenderDefinition::new(
                appender.name.clone(),
                appender.class.clone(),
                scalar_pairs(&appender.properties)?,
            ));
        }

        let lookup = |logger: &str, names: &[String]| {
            names
                .iter()
                .map(|name| {
                    appenders
                        .iter()
                        .find(|a| a.name() == name)
                        .cloned()
                        .ok_or_else(|| ConfigurationError::UnknownAppender {
                            logger: logger.to_string(),
                            appender: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()
        };

        let root = LoggerDefinition::root(self.root.level, lookup("root", &self.root.appenders)?);
        let mut children = Vec::with_capacity(self.loggers.len());
        for logger in &self.loggers {
            children.push(
                LoggerDefinition::child(
                    logger.name.clone(),
                    logger.level,
                    lookup(&logger.name, &logger.appenders)?,
                )
                .with_additivity(logger.additivity),
            );
        }

        let mut config = LogConfig::new(root, children)?;
        for (key, value) in scalar_pairs(&self.properties)? {
            config = config.with_property(key, value);
        }
        Ok(config)
    }
}

pub(crate) fn scalar_pairs(mapping: &Mapping) -> Result<Vec<(String, String)>, ConfigurationError> {
    mapping
        .iter()
        .map(|(key, value)| {
            let key = scalar(key).ok_or_else(|| {
                ConfigurationError::NonScalarValue(format!("{key:?}"))
            })?;
            let value = scalar(value)
                .ok_or_else(|| ConfigurationError::NonScalarValue(key.clone()))?;
            Ok((key, value))
        })
        .collect()
}

pub(crate) fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}
