//! Common logback appenders.
//!
//! Logback is configured through nested XML elements, so these appenders use
//! dotted property keys (`rollingPolicy.maxIndex`) that [`super::xml::XmlRenderer`]
//! expands into element trees. A trailing `class` segment becomes an attribute.
use super::AppenderDefinition;

pub const DEFAULT_PATTERN: &str = "%d{yyyy-MM-dd HH:mm:ss} %c{1} [%p] %m%n";

pub const CONSOLE_APPENDER_CLASS: &str = "ch.qos.logback.core.ConsoleAppender";
pub const ROLLING_FILE_APPENDER_CLASS: &str = "ch.qos.logback.core.rolling.RollingFileAppender";
const FIXED_WINDOW_POLICY_CLASS: &str = "ch.qos.logback.core.rolling.FixedWindowRollingPolicy";
const SIZE_TRIGGER_POLICY_CLASS: &str =
    "ch.qos.logback.core.rolling.SizeBasedTriggeringPolicy";

pub fn console_appender(name: &str, pattern: Option<&str>) -> AppenderDefinition {
    AppenderDefinition::new(name, CONSOLE_APPENDER_CLASS, [encoder(pattern)])
}

/// Rolls over once the file reaches `max_file_size_mb`, keeping nine numbered backups.
pub fn rolling_file_appender(
    name: &str,
    file_path: &str,
    max_file_size_mb: u32,
    pattern: Option<&str>,
) -> AppenderDefinition {
    let file_path = file_path.replace('\\', "/");
    AppenderDefinition::new(
        name,
        ROLLING_FILE_APPENDER_CLASS,
        [
            encoder(pattern),
            ("file".to_string(), file_path.clone()),
            (
                "rollingPolicy.class".to_string(),
                FIXED_WINDOW_POLICY_CLASS.to_string(),
            ),
            (
                "rollingPolicy.fileNamePattern".to_string(),
                format!("{file_path}.%i"),
            ),
            ("rollingPolicy.minIndex".to_string(), "1".to_string()),
            ("rollingPolicy.maxIndex".to_string(), "9".to_string()),
            (
                "triggeringPolicy.class".to_string(),
                SIZE_TRIGGER_POLICY_CLASS.to_string(),
            ),
            (
                "triggeringPolicy.maxFileSize".to_string(),
                format!("{max_file_size_mb}MB"),
            ),
        ],
    )
}

fn encoder(pattern: Option<&str>) -> (String, String) {
    (
        "encoder.pattern".to_string(),
        pattern.unwrap_or(DEFAULT_PATTERN).to_string(),
    )
}
