//! Common log4j 1.x layouts and appenders.
use super::{AppenderDefinition, LayoutDefinition};

/// Pattern used when no layout is given.
pub const DEFAULT_PATTERN: &str = "[%d] %p %m (%c)%n";

/// Date pattern used by [`daily_rolling_file_appender`] when none is given.
pub const DEFAULT_DATE_PATTERN: &str = "'.'yyyy-MM-dd-HH";

pub const PATTERN_LAYOUT_CLASS: &str = "org.apache.log4j.PatternLayout";
pub const CONSOLE_APPENDER_CLASS: &str = "org.apache.log4j.ConsoleAppender";
pub const FILE_APPENDER_CLASS: &str = "org.apache.log4j.FileAppender";
pub const ROLLING_FILE_APPENDER_CLASS: &str = "org.apache.log4j.RollingFileAppender";
pub const DAILY_ROLLING_FILE_APPENDER_CLASS: &str = "org.apache.log4j.DailyRollingFileAppender";

/// A `PatternLayout` with the given conversion pattern.
pub fn pattern_layout(pattern: &str) -> LayoutDefinition {
    LayoutDefinition::new(PATTERN_LAYOUT_CLASS, [("ConversionPattern", pattern)])
}

/// Writes to stdout. Log4j conventionally names this appender `stdout`.
pub fn console_appender(name: &str, layout: Option<&LayoutDefinition>) -> AppenderDefinition {
    AppenderDefinition::new(name, CONSOLE_APPENDER_CLASS, layout_properties(layout))
}

/// Appends to a single file without rotation.
pub fn file_appender(
    name: &str,
    file_path: &str,
    layout: Option<&LayoutDefinition>,
) -> AppenderDefinition {
    let properties = [("File".to_string(), file_path.to_string())]
        .into_iter()
        .chain(layout_properties(layout));
    AppenderDefinition::new(name, FILE_APPENDER_CLASS, properties)
}

/// Rotates the file once it reaches `max_file_size_mb`, keeping `max_backup_index` old files.
pub fn rolling_file_appender(
    name: &str,
    file_path: &str,
    max_file_size_mb: u32,
    max_backup_index: u32,
    layout: Option<&LayoutDefinition>,
) -> AppenderDefinition {
    let properties = [
        ("maxFileSize".to_string(), format!("{max_file_size_mb}MB")),
        ("maxBackupIndex".to_string(), max_backup_index.to_string()),
        ("File".to_string(), file_path.to_string()),
    ]
    .into_iter()
    .chain(layout_properties(layout));
    AppenderDefinition::new(name, ROLLING_FILE_APPENDER_CLASS, properties)
}

/// Rotates the file whenever the formatted `date_pattern` changes.
pub fn daily_rolling_file_appender(
    name: &str,
    file_path: &str,
    date_pattern: Option<&str>,
    layout: Option<&LayoutDefinition>,
) -> AppenderDefinition {
    let properties = [
        (
            "DatePattern".to_string(),
            date_pattern.unwrap_or(DEFAULT_DATE_PATTERN).to_string(),
        ),
        ("File".to_string(), file_path.to_string()),
    ]
    .into_iter()
    .chain(layout_properties(layout));
    AppenderDefinition::new(name, DAILY_ROLLING_FILE_APPENDER_CLASS, properties)
}

/// `layout=<class>` followed by the layout's own properties under `layout.`.
fn layout_properties(layout: Option<&LayoutDefinition>) -> Vec<(String, String)> {
    let default_layout;
    let layout = match layout {
        Some(layout) => layout,
        None => {
            default_layout = pattern_layout(DEFAULT_PATTERN);
            &default_layout
        }
    };

    std::iter::once(("layout".to_string(), layout.class_name().to_string()))
        .chain(
            layout
                .properties()
                .iter()
                .map(|(key, value)| (format!("layout.{key}"), value.clone())),
        )
        .collect()
}
