//! This module provides a service for rendering alert message templates
//! using the minijinja templating engine.

use minijinja::Environment;
use thiserror::Error;

/// A service for rendering alert message templates.
pub struct TemplateService {
    env: Environment<'static>,
}

/// Error type for the TemplateService.
#[derive(Debug, Error)]
pub enum TemplateServiceError {
    /// The template failed to render against the given context.
    #[error("Failed to render template")]
    RenderError(#[from] minijinja::Error),
}

impl TemplateService {
    /// Creates a new instance of `TemplateService` with a strict
    /// environment: a template referencing a variable missing from the
    /// context is an error, not silently empty output.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);

        Self { env }
    }

    /// Renders a template with the given context.
    pub fn render(
        &self,
        template_str: &str,
        context: serde_json::Value,
    ) -> Result<String, TemplateServiceError> {
        match self.env.render_str(template_str, context) {
            Ok(rendered_string) => Ok(rendered_string),
            Err(e) => {
                tracing::warn!("Failed to render template '{}': {}", template_str, e);
                Err(TemplateServiceError::RenderError(e))
            }
        }
    }
}

impl Default for TemplateService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_render_template_with_context() {
        let service = TemplateService::new();
        let template = "TDS {{ value }} ppm exceeded the threshold of {{ threshold }} ppm";
        let context = json!({ "value": 152.0, "threshold": 150.0 });

        let result = service.render(template, context).unwrap();
        assert_eq!(result, "TDS 152.0 ppm exceeded the threshold of 150.0 ppm");
    }

    #[test]
    fn test_render_template_with_missing_variable() {
        let service = TemplateService::new();
        let template = "Reading: {{ value }}";
        let context = json!({});

        let result = service.render(template, context);
        assert!(matches!(result, Err(TemplateServiceError::RenderError(_))));
    }
}
