//! Command-line and environment assembly for a Java launch.
use std::{collections::BTreeMap, ffi::OsString, path::Path};

use super::LaunchSpec;

/// Separator the JVM expects between classpath entries.
pub const CLASSPATH_SEPARATOR: &str = ":";

/// Port [`debug_options`] listens on unless told otherwise.
pub const DEFAULT_DEBUG_PORT: u16 = 1044;

/// Builds the JVM argument list for `spec`.
///
/// The order is fixed because the JVM lets later flags of the same kind
/// override earlier ones: classpath, system properties, heap bound, extra
/// options, `-server`, the entry point, then the program arguments.
pub fn command_line(spec: &LaunchSpec) -> Vec<String> {
    let mut args = vec!["-cp".to_string(), spec.classpath.join(CLASSPATH_SEPARATOR)];
    args.extend(
        spec.defines
            .iter()
            .map(|(key, value)| format_define(key, value.as_deref())),
    );
    args.push(format!("-Xmx{}M", spec.max_memory_mb));
    args.extend(spec.extra_options.iter().cloned());
    if spec.server {
        args.push("-server".to_string());
    }
    args.push(spec.entry_point.clone());
    args.extend(spec.arguments.iter().cloned());
    args
}

/// `-Dkey` for a bare flag, `-Dkey=value` otherwise.
pub fn format_define(key: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!("-D{key}={value}"),
        None => format!("-D{key}"),
    }
}

/// Layers `overrides` over an inherited environment. Overrides win.
pub fn merge_environment<I, K, V>(
    inherited: I,
    overrides: &[(String, String)],
) -> BTreeMap<OsString, OsString>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<OsString>,
    V: Into<OsString>,
{
    let mut merged: BTreeMap<OsString, OsString> = inherited
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect();
    for (key, value) in overrides {
        merged.insert(key.into(), value.into());
    }
    merged
}

/// One `<dir>/*` wildcard entry per directory, picking up every jar inside it.
pub fn classpath_for_jars_in<P: AsRef<Path>>(directories: &[P]) -> Vec<String> {
    directories
        .iter()
        .map(|dir| dir.as_ref().join("*").to_string_lossy().into_owned())
        .collect()
}

/// JVM flags that let a debugger attach on `port` without suspending startup.
pub fn debug_options(port: u16) -> Vec<String> {
    vec![
        "-Xdebug".to_string(),
        format!("-Xrunjdwp:transport=dt_socket,server=y,suspend=n,address={port}"),
    ]
}
