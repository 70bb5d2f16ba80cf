//! Logback XML rendering of a [`LogConfig`].
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use super::{AppenderDefinition, LogConfig, LogConfigRenderer, LoggerDefinition, LoggerScope};
use crate::error::LogConfigError;

/// Renders a `<configuration>` document.
///
/// Appender and logger ordering follows the flat format. Unlike the flat
/// format, every `<logger>` carries an explicit `additivity` attribute.
#[derive(Debug, Clone)]
pub struct XmlRenderer {
    indent: usize,
}

impl Default for XmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlRenderer {
    pub fn new() -> Self {
        Self { indent: 2 }
    }

    fn write_logger(
        writer: &mut Writer<Vec<u8>>,
        logger: &LoggerDefinition,
    ) -> Result<(), LogConfigError> {
        let level = logger.level().to_string();
        let (tag, mut start) = match logger.scope() {
            LoggerScope::Root => ("root", BytesStart::new("root")),
            LoggerScope::Child { name, additivity } => {
                let mut start = BytesStart::new("logger");
                start.push_attribute(("name", name.as_str()));
                start.push_attribute(("additivity", if *additivity { "true" } else { "false" }));
                ("logger", start)
            }
        };
        start.push_attribute(("level", level.as_str()));

        if logger.appenders().is_empty() {
            return emit(writer, Event::Empty(start));
        }

        emit(writer, Event::Start(start))?;
        for appender in logger.appenders() {
            let mut reference = BytesStart::new("appender-ref");
            reference.push_attribute(("ref", appender.name()));
            emit(writer, Event::Empty(reference))?;
        }
        emit(writer, Event::End(BytesEnd::new(tag)))
    }
}

impl LogConfigRenderer for XmlRenderer {
    fn file_name(&self) -> &'static str {
        "logback.xml"
    }

    fn render(&self, config: &LogConfig) -> Result<String, LogConfigError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', self.indent);
        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
        )?;
        emit(&mut writer, Event::Start(BytesStart::new("configuration")))?;

        for (name, value) in config.properties() {
            let mut property = BytesStart::new("property");
            property.push_attribute(("name", name.as_str()));
            property.push_attribute(("value", value.as_str()));
            emit(&mut writer, Event::Empty(property))?;
        }

        for appender in config.unique_appenders() {
            appender_node(appender).write(&mut writer)?;
        }

        Self::write_logger(&mut writer, config.root())?;
        for child in config.children() {
            Self::write_logger(&mut writer, child)?;
        }

        emit(&mut writer, Event::End(BytesEnd::new("configuration")))?;
        Ok(String::from_utf8(writer.into_inner())?)
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), LogConfigError> {
    writer
        .write_event(event)
        .map_err(|err| LogConfigError::Xml(err.to_string()))
}

/// Element tree built from an appender's dotted property keys.
#[derive(Debug, Default, PartialEq)]
struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Node>,
}

impl Node {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Finds or creates the container child `name`. Leaf (text) children are never reused.
    fn container(&mut self, name: &str) -> &mut Node {
        let index = match self
            .children
            .iter()
            .position(|child| child.name == name && child.text.is_none())
        {
            Some(index) => index,
            None => {
                self.children.push(Node::named(name));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    fn insert(&mut self, key: &str, value: &str) {
        let segments: Vec<&str> = key.split('.').collect();
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => return,
        };

        let mut node = self;
        for segment in parents {
            node = node.container(segment);
        }

        if *last == "class" && !parents.is_empty() {
            node.attributes.push(("class".into(), value.into()));
        } else {
            node.children.push(Node {
                text: Some(value.to_string()),
                ..Node::named(last)
            });
        }
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), LogConfigError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if let Some(text) = &self.text {
            emit(writer, Event::Start(start))?;
            emit(writer, Event::Text(BytesText::new(text)))?;
            return emit(writer, Event::End(BytesEnd::new(self.name.as_str())));
        }

        if self.children.is_empty() {
            return emit(writer, Event::Empty(start));
        }

        emit(writer, Event::Start(start))?;
        for child in &self.children {
            child.write(writer)?;
        }
        emit(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}

fn appender_node(appender: &AppenderDefinition) -> Node {
    let mut node = Node::named("appender");
    node.attributes.push(("name".into(), appender.name().into()));
    node.attributes
        .push(("class".into(), appender.class_name().into()));
    for (key, value) in appender.properties() {
        node.insert(key, value);
    }
    node
}
