use jvmnode::{
    log_config::{
        AppenderDefinition, Level, LogConfig, LogConfigRenderer, LoggerDefinition,
        flat::PropertiesRenderer, log4j, xml::XmlRenderer,
    },
    properties::PropertiesFile,
};

fn controller_config() -> LogConfig {
    let console = AppenderDefinition::new(
        "console",
        log4j::CONSOLE_APPENDER_CLASS,
        Vec::<(String, String)>::new(),
    );
    let controller = AppenderDefinition::new(
        "controllerAppender",
        log4j::FILE_APPENDER_CLASS,
        Vec::<(String, String)>::new(),
    );
    LogConfig::new(
        LoggerDefinition::root(Level::Info, [console]),
        [LoggerDefinition::child("kafka.controller", Level::Trace, [controller]).with_additivity(false)],
    )
    .unwrap()
}

#[test]
fn root_and_non_additive_child_compile_to_five_entries() {
    let document = PropertiesRenderer::new().compile(&controller_config());

    assert_eq!(
        document.entries(),
        [
            (
                "appender.console".to_string(),
                "org.apache.log4j.ConsoleAppender".to_string()
            ),
            (
                "appender.controllerAppender".to_string(),
                "org.apache.log4j.FileAppender".to_string()
            ),
            ("rootLogger".to_string(), "INFO,console".to_string()),
            (
                "logger.kafka.controller".to_string(),
                "TRACE,controllerAppender".to_string()
            ),
            (
                "additivity.kafka.controller".to_string(),
                "false".to_string()
            ),
        ]
    );
}

#[test]
fn shared_appenders_are_declared_once() {
    let shared = log4j::file_appender("shared", "/logs/shared.log", None);
    let console = log4j::console_appender("stdout", None);
    let config = LogConfig::new(
        LoggerDefinition::root(Level::Info, [console.clone(), shared.clone()]),
        [
            LoggerDefinition::child("a", Level::Debug, [shared.clone()]),
            LoggerDefinition::child("b", Level::Warn, [shared.clone(), console]),
            LoggerDefinition::child("c", Level::Error, [shared]),
        ],
    )
    .unwrap();

    let text = PropertiesRenderer::log4j().compile(&config).to_text();
    assert_eq!(text.matches("log4j.appender.shared=").count(), 1);
    assert_eq!(text.matches("log4j.appender.stdout=").count(), 1);

    let xml = XmlRenderer::new().render(&config).unwrap();
    assert_eq!(xml.matches("<appender name=\"shared\"").count(), 1);
    assert_eq!(xml.matches("<appender name=").count(), 2);
}

#[test]
fn additive_children_have_no_flat_additivity_key() {
    let console = log4j::console_appender("stdout", None);
    let config = LogConfig::new(
        LoggerDefinition::root(Level::Info, [console.clone()]),
        [
            LoggerDefinition::child("quiet", Level::Warn, [console.clone()]).with_additivity(false),
            LoggerDefinition::child("chatty", Level::Debug, [console]),
        ],
    )
    .unwrap();

    let document = PropertiesRenderer::new().compile(&config);
    assert_eq!(document.get("additivity.quiet"), Some("false"));
    assert_eq!(document.get("additivity.chatty"), None);

    let xml = XmlRenderer::new().render(&config).unwrap();
    assert!(xml.contains(r#"<logger name="chatty" additivity="true" level="DEBUG">"#));
    assert!(xml.contains(r#"<logger name="quiet" additivity="false" level="WARN">"#));
}

#[test]
fn compiled_document_round_trips_through_text() {
    let document = PropertiesRenderer::log4j().compile(&controller_config());
    let reparsed = PropertiesFile::parse(&document.to_text()).unwrap();
    assert_eq!(reparsed, document);
}

#[test]
fn renderer_output_matches_compiled_text() {
    let renderer = PropertiesRenderer::new();
    let config = controller_config();
    assert_eq!(renderer.render(&config).unwrap(), renderer.compile(&config).to_text());
    assert_eq!(renderer.file_name(), "log4j.properties");
    assert_eq!(XmlRenderer::new().file_name(), "logback.xml");
}

#[test]
fn extra_properties_come_first_and_are_never_prefixed() {
    let config = controller_config().with_property("kafka.logs.dir", "/var/log/kafka");
    let document = PropertiesRenderer::log4j().compile(&config);
    assert_eq!(
        document.entries()[0],
        ("kafka.logs.dir".to_string(), "/var/log/kafka".to_string())
    );
    assert_eq!(document.get("log4j.rootLogger"), Some("INFO,console"));
}
