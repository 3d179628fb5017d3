//! Parameter substitution for command templates.
//!
//! Templates use `${name}` placeholders. Caller-supplied parameters override
//! same-named defaults. A placeholder with no value in the merged map is a
//! hard failure so a half-substituted command line can never reach a remote
//! host.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ExecuteError;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder regex is valid"));

/// Renders `template` against defaults merged with caller parameters
/// (caller wins on name clashes).
pub fn render(
    template: &str,
    defaults: &HashMap<String, String>,
    caller: &HashMap<String, String>,
) -> Result<String, ExecuteError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;
    for captures in PLACEHOLDER.captures_iter(template) {
        let whole = captures.get(0).expect("capture 0 always present");
        let name = &captures[1];
        let value = caller
            .get(name)
            .or_else(|| defaults.get(name))
            .ok_or_else(|| ExecuteError::UndefinedParameter {
                name: name.to_string(),
                template: template.to_string(),
            })?;
        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(value);
        last = whole.end();
    }
    rendered.push_str(&template[last..]);
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_from_defaults() {
        let rendered = render("echo ${msg}", &params(&[("msg", "hello")]), &params(&[])).unwrap();
        assert_eq!(rendered, "echo hello");
    }

    #[test]
    fn caller_parameters_override_defaults() {
        let rendered = render(
            "${x}",
            &params(&[("x", "default")]),
            &params(&[("x", "caller")]),
        )
        .unwrap();
        assert_eq!(rendered, "caller");
    }

    #[test]
    fn undefined_placeholder_is_a_hard_failure() {
        let result = render("ls ${dir}/${file}", &params(&[("dir", "/tmp")]), &params(&[]));
        match result {
            Err(ExecuteError::UndefinedParameter { name, template }) => {
                assert_eq!(name, "file");
                assert_eq!(template, "ls ${dir}/${file}");
            }
            other => panic!("expected undefined parameter, got {other:?}"),
        }
    }

    #[test]
    fn never_returns_unresolved_placeholders() {
        let defaults = params(&[("a", "1"), ("b", "2")]);
        let rendered = render("${a} ${b} ${a}", &defaults, &params(&[])).unwrap();
        assert!(!rendered.contains("${"));
        assert_eq!(rendered, "1 2 1");
    }

    #[test]
    fn leaves_non_placeholder_braces_alone() {
        let rendered = render(
            "awk '{print $1}' ${file}",
            &params(&[("file", "/var/log/syslog")]),
            &params(&[]),
        )
        .unwrap();
        assert_eq!(rendered, "awk '{print $1}' /var/log/syslog");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let rendered = render("uptime", &params(&[]), &params(&[])).unwrap();
        assert_eq!(rendered, "uptime");
    }
}
