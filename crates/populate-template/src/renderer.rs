//! template rendering
//!
//! Templates use jinja2 syntax as implemented by [minijinja]:
//!
//! ```text
//! name: {{ app.name }}
//! {% if app.debug == "true" %}log_level: debug{% endif %}
//! {% for host in hosts %}
//! - {{ host }}
//! {% endfor %}
//! ```
//!
//! Referencing a value that does not exist is an error rather than an empty string.
//! The whole template is rendered before the first byte is written, so a failing
//! template never leaves partial output behind.
use crate::value::Mapping;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use std::io::Write;

/// Compiles and executes templates against a resolved [Mapping]
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Environment borrowing the template source for the duration of one render
    fn environment<'source>() -> Environment<'source> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        // a template without any tags must come out unchanged
        env.set_keep_trailing_newline(true);
        // output is written verbatim whatever the file extension
        env.set_auto_escape_callback(|_name| AutoEscape::None);
        env
    }

    /// Render `body` and write the result to `out`
    ///
    /// `name` identifies the template in error messages, usually its source path.
    pub fn render(
        &self,
        name: &str,
        body: &str,
        data: &Mapping,
        out: &mut dyn Write,
    ) -> Result<(), RenderError> {
        let rendered = self.render_to_string(name, body, data)?;
        out.write_all(rendered.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    pub fn render_to_string(
        &self,
        name: &str,
        body: &str,
        data: &Mapping,
    ) -> Result<String, RenderError> {
        let env = Self::environment();
        let template = env
            .template_from_named_str(name, body)
            .map_err(|source| RenderError::TemplateSyntax {
                name: name.to_string(),
                source,
            })?;

        let rendered = template
            .render(data)
            .map_err(|source| RenderError::TemplateExecution {
                name: name.to_string(),
                source,
            })?;

        tracing::trace!(name, bytes = rendered.len(), "template rendered");
        Ok(rendered)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("Error creating template for \"{name}\"")]
    TemplateSyntax {
        name: String,
        source: minijinja::Error,
    },
    #[error("Error executing template for \"{name}\"")]
    TemplateExecution {
        name: String,
        source: minijinja::Error,
    },
    #[error("Unable to write rendered output")]
    Io(#[from] std::io::Error),
}
