//! Placeholder substitution into a stored config body
//!
//! Only the project type and the app env values are templated. A placeholder
//! is written `{{.NAME}}` and must have a substitution.

use super::schema::PipelineDefinition;
use crate::error::TemplateError;
use crate::options::Substitutions;
use crate::steps::EnvItem;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex")
    })
}

/// Parses `template_body` and applies `substitutions` to it
pub fn render_config(
    template_body: &str,
    substitutions: &Substitutions,
) -> Result<PipelineDefinition, TemplateError> {
    let definition: PipelineDefinition =
        serde_yaml::from_str(template_body).map_err(|e| TemplateError::Parse(e.to_string()))?;
    render_definition(definition, substitutions)
}

/// Expands placeholders and exports every substitution as an app env.
///
/// Envs already present keep their value, so rendering twice changes nothing.
pub fn render_definition(
    mut definition: PipelineDefinition,
    substitutions: &Substitutions,
) -> Result<PipelineDefinition, TemplateError> {
    definition.project_type = expand("project_type", &definition.project_type, substitutions)?;

    for env in definition.app.envs.iter_mut() {
        let field = format!("app.envs.{}", env.key);
        env.value = expand(&field, &env.value, substitutions)?;
    }

    for (key, value) in substitutions.iter() {
        if !definition.app.contains_key(key) {
            definition.app.envs.push(EnvItem::new(key, value));
        }
    }

    debug!(
        project_type = %definition.project_type,
        envs = definition.app.envs.len(),
        "Rendered config"
    );
    Ok(definition)
}

fn expand(field: &str, text: &str, substitutions: &Substitutions) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for captures in placeholder_regex().captures_iter(text) {
        let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        check_literal(field, &text[last..whole.start()])?;
        let value = substitutions
            .get(key.as_str())
            .ok_or_else(|| TemplateError::MissingSubstitution {
                field: field.to_string(),
                key: key.as_str().to_string(),
            })?;
        output.push_str(&text[last..whole.start()]);
        output.push_str(value);
        last = whole.end();
    }

    check_literal(field, &text[last..])?;
    output.push_str(&text[last..]);
    Ok(output)
}

fn check_literal(field: &str, literal: &str) -> Result<(), TemplateError> {
    if literal.contains("{{") {
        return Err(TemplateError::Malformed {
            field: field.to_string(),
            message: format!("unsupported placeholder in '{}'", literal),
        });
    }
    Ok(())
}
