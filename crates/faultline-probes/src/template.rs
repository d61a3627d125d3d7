use crate::error::{ProbeError, Result};
use faultline_core::ProbeArtifact;
use serde_json::Value;
use std::collections::BTreeMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Render `{{.<probe>.<field>}}` references in a probe parameter against the
/// artifacts registered by earlier probes.
///
/// Lookups are strict: a missing probe, a missing field or a null value is an
/// error, never an empty substitution. Nested objects can be walked with
/// longer paths (`{{.probe.outer.inner}}`). Strings without markers are
/// returned unchanged.
pub fn render_command(
    template: &str,
    artifacts: &BTreeMap<String, ProbeArtifact>,
) -> Result<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    // Text outside an action is literal, stray '}}' included
    while let Some(open) = rest.find(OPEN) {
        rendered.push_str(&rest[..open]);
        let after_open = &rest[open + OPEN.len()..];
        let end = after_open
            .find(CLOSE)
            .ok_or_else(|| ProbeError::render_failed(template, "unclosed action, missing '}}'"))?;

        let action = after_open[..end].trim();
        rendered.push_str(&resolve_action(template, action, artifacts)?);
        rest = &after_open[end + CLOSE.len()..];
    }

    rendered.push_str(rest);
    Ok(rendered)
}

fn resolve_action(
    template: &str,
    action: &str,
    artifacts: &BTreeMap<String, ProbeArtifact>,
) -> Result<String> {
    if action.is_empty() {
        return Err(ProbeError::render_failed(template, "empty action"));
    }

    let path = action.strip_prefix('.').ok_or_else(|| {
        ProbeError::render_failed(
            template,
            format!("unsupported action '{}', only field references are allowed", action),
        )
    })?;

    let segments: Vec<&str> = path.split('.').collect();
    if segments.len() < 2 {
        return Err(ProbeError::render_failed(
            template,
            format!("reference '{}' must name a probe and a field", action),
        ));
    }
    if let Some(bad) = segments
        .iter()
        .find(|s| s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '{' || c == '}'))
    {
        return Err(ProbeError::render_failed(
            template,
            format!("malformed path segment '{}' in '{}'", bad, action),
        ));
    }

    let probe_name = segments[0];
    let bundle = artifacts.get(probe_name).ok_or_else(|| {
        ProbeError::render_failed(
            template,
            format!("no artifacts registered for probe '{}'", probe_name),
        )
    })?;

    let mut value = bundle.get(segments[1]).ok_or_else(|| {
        ProbeError::render_failed(
            template,
            format!("probe '{}' has no field '{}'", probe_name, segments[1]),
        )
    })?;

    for segment in &segments[2..] {
        value = value.get(*segment).ok_or_else(|| {
            ProbeError::render_failed(
                template,
                format!("no field '{}' in '{}'", segment, action),
            )
        })?;
    }

    match value {
        Value::Null => Err(ProbeError::render_failed(
            template,
            format!("'{}' resolved to null", action),
        )),
        Value::String(s) => Ok(s.clone()),
        other => Ok(other.to_string()),
    }
}
