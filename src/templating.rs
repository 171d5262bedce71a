use crate::error::AnnotationError;
use std::{collections::BTreeMap, fmt};
use tracing::debug;

/// A string that may contain liquid placeholders, resolved against a
/// [`TemplateContext`] before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template(String);

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn source(&self) -> &str {
        &self.0
    }

    /// True when the source has no tags or output markup and renders to itself.
    pub fn is_static(&self) -> bool {
        !self.0.contains("{{") && !self.0.contains("{%")
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for Template {
    fn from(source: String) -> Self {
        Self(source)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-provided globals visible to every template.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    globals: liquid::Object,
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self::new(liquid::Object::new())
    }
}

impl TemplateContext {
    pub fn new(globals: liquid::Object) -> Self {
        Self { globals }
    }

    pub fn from_variables(variables: &BTreeMap<String, String>) -> Self {
        let mut globals = liquid::Object::new();
        for (name, value) in variables {
            globals.insert(
                name.clone().into(),
                liquid::model::Value::Scalar(value.clone().into()),
            );
        }
        Self { globals }
    }

    pub fn globals(&self) -> &liquid::Object {
        &self.globals
    }
}

pub trait TemplateResolver: Send + Sync {
    fn resolve(
        &self,
        template: &Template,
        context: &TemplateContext,
    ) -> Result<String, AnnotationError>;
}

/// Renders templates with the liquid standard library.
pub struct LiquidResolver {
    parser: liquid::Parser,
}

impl LiquidResolver {
    pub fn new() -> Result<Self, liquid::Error> {
        let parser = liquid::ParserBuilder::with_stdlib().build()?;
        Ok(Self { parser })
    }
}

impl TemplateResolver for LiquidResolver {
    fn resolve(
        &self,
        template: &Template,
        context: &TemplateContext,
    ) -> Result<String, AnnotationError> {
        if template.is_static() {
            return Ok(template.source().to_string());
        }

        let parsed = self.parser.parse(template.source())?;

        let mut globals = context.globals().clone();
        if !globals.contains_key("now") {
            let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            globals.insert("now".into(), liquid::model::Value::Scalar(now.into()));
        }

        let rendered = parsed.render(&globals)?;
        debug!("Rendered template {:?} to {:?}", template.source(), rendered);
        Ok(rendered)
    }
}
