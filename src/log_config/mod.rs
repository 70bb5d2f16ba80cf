//! Declarative logging configuration for JVM daemons.
//!
//! A [`LogConfig`] is a small graph: one root logger, any number of scoped
//! child loggers, and the appenders they reference. Renderers turn it into the
//! text format a logging framework reads at startup: flat log4j properties
//! ([`flat::PropertiesRenderer`]) or a logback XML tree ([`xml::XmlRenderer`]).
use std::str::FromStr;

use serde::Deserialize;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::{ConfigurationError, LogConfigError};

pub mod flat;
pub mod log4j;
pub mod logback;
pub mod manifest;
pub mod xml;

/// Severity threshold of a logger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(try_from = "String")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl TryFrom<String> for Level {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        Level::from_str(value.trim()).map_err(|_| format!("invalid log level '{value}'"))
    }
}

/// A formatting scheme for log records: a framework class plus its settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutDefinition {
    class_name: String,
    properties: Vec<(String, String)>,
}

impl LayoutDefinition {
    pub fn new<I, K, V>(class_name: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            class_name: class_name.into(),
            properties: collect_pairs(properties),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }
}

/// A named output sink.
///
/// Two appenders are the same appender when name, class and properties are all
/// equal; that equality drives deduplication when several loggers share one.
/// A [`LogConfig`] rejects two different appenders under one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppenderDefinition {
    name: String,
    class_name: String,
    properties: Vec<(String, String)>,
}

impl AppenderDefinition {
    pub fn new<I, K, V>(
        name: impl Into<String>,
        class_name: impl Into<String>,
        properties: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            properties: collect_pairs(properties),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }
}

/// What part of the logger hierarchy a [`LoggerDefinition`] applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggerScope {
    /// Everything not matched by a more specific logger.
    Root,
    /// Loggers whose name starts with `name`.
    Child {
        /// Class or package prefix.
        name: String,
        /// When false, records stop here instead of also reaching ancestor appenders.
        additivity: bool,
    },
}

/// A severity threshold and the appenders attached to one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerDefinition {
    scope: LoggerScope,
    level: Level,
    appenders: Vec<AppenderDefinition>,
}

impl LoggerDefinition {
    /// The root logger.
    pub fn root(level: Level, appenders: impl IntoIterator<Item = AppenderDefinition>) -> Self {
        Self {
            scope: LoggerScope::Root,
            level,
            appenders: appenders.into_iter().collect(),
        }
    }

    /// A child logger for `name`, additive by default.
    pub fn child(
        name: impl Into<String>,
        level: Level,
        appenders: impl IntoIterator<Item = AppenderDefinition>,
    ) -> Self {
        Self {
            scope: LoggerScope::Child {
                name: name.into(),
                additivity: true,
            },
            level,
            appenders: appenders.into_iter().collect(),
        }
    }

    /// Returns a copy with the given additivity. Has no effect on the root.
    pub fn with_additivity(&self, additivity: bool) -> Self {
        let mut copy = self.clone();
        if let LoggerScope::Child {
            additivity: current,
            ..
        } = &mut copy.scope
        {
            *current = additivity;
        }
        copy
    }

    pub fn scope(&self) -> &LoggerScope {
        &self.scope
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn appenders(&self) -> &[AppenderDefinition] {
        &self.appenders
    }

    pub fn is_root(&self) -> bool {
        matches!(self.scope, LoggerScope::Root)
    }

    /// `LEVEL,appender1,appender2`, the value both formats derive a logger from.
    pub fn definition_line(&self) -> String {
        std::iter::once(self.level.as_ref())
            .chain(self.appenders.iter().map(AppenderDefinition::name))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A complete logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    root: LoggerDefinition,
    children: Vec<LoggerDefinition>,
    properties: Vec<(String, String)>,
}

impl LogConfig {
    /// Builds a configuration from exactly one root logger and zero or more children.
    pub fn new(
        root: LoggerDefinition,
        children: impl IntoIterator<Item = LoggerDefinition>,
    ) -> Result<Self, ConfigurationError> {
        if let LoggerScope::Child { name, .. } = root.scope() {
            return Err(ConfigurationError::InvalidLoggerTree(format!(
                "child logger '{name}' given as the root logger"
            )));
        }

        let children: Vec<_> = children.into_iter().collect();
        if children.iter().any(LoggerDefinition::is_root) {
            return Err(ConfigurationError::InvalidLoggerTree(
                "a configuration has exactly one root logger".into(),
            ));
        }

        let config = Self {
            root,
            children,
            properties: Vec::new(),
        };
        config.check_appender_names()?;
        Ok(config)
    }

    /// Appenders are shared by name, so one name must mean one definition.
    fn check_appender_names(&self) -> Result<(), ConfigurationError> {
        let unique = self.unique_appenders();
        for (i, appender) in unique.iter().enumerate() {
            if unique[..i].iter().any(|seen| seen.name() == appender.name()) {
                return Err(ConfigurationError::InvalidLoggerTree(format!(
                    "appender '{}' has conflicting definitions",
                    appender.name()
                )));
            }
        }
        Ok(())
    }

    /// Returns a copy with an extra top-level property (e.g. a log directory variable).
    pub fn with_property(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.properties.push((key.into(), value.into()));
        copy
    }

    pub fn root(&self) -> &LoggerDefinition {
        &self.root
    }

    pub fn children(&self) -> &[LoggerDefinition] {
        &self.children
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    /// Every appender referenced by any logger, root first, each declared once.
    pub fn unique_appenders(&self) -> Vec<&AppenderDefinition> {
        let mut unique: Vec<&AppenderDefinition> = Vec::new();
        let referenced = std::iter::once(&self.root)
            .chain(self.children.iter())
            .flat_map(|logger| logger.appenders.iter());
        for appender in referenced {
            if !unique.contains(&appender) {
                unique.push(appender);
            }
        }
        unique
    }
}

/// Turns a [`LogConfig`] into the text a logging framework reads.
pub trait LogConfigRenderer {
    /// Conventional file name for the rendered output.
    fn file_name(&self) -> &'static str;

    fn render(&self, config: &LogConfig) -> Result<String, LogConfigError>;
}

/// The output formats a node can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, AsRefStr, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Flat properties with bare keys (`rootLogger=...`).
    Properties,
    /// Flat properties with log4j 1.x keys (`log4j.rootLogger=...`).
    #[default]
    Log4j,
    /// Logback XML.
    Xml,
}

impl LogFormat {
    pub fn renderer(&self) -> Box<dyn LogConfigRenderer> {
        match self {
            LogFormat::Properties => Box::new(flat::PropertiesRenderer::new()),
            LogFormat::Log4j => Box::new(flat::PropertiesRenderer::log4j()),
            LogFormat::Xml => Box::new(xml::XmlRenderer::new()),
        }
    }
}

fn collect_pairs<I, K, V>(pairs: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}
