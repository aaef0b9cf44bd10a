//! Placeholder expansion for command templates
//!
//! Arguments and environment values may contain `{name}` placeholders that
//! are filled in once directories and ports are resolved. Unknown
//! placeholders are left untouched so literal braces survive.

use std::collections::BTreeMap;

/// Values available to a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<&'static str, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn expand(&self, template: &str) -> String {
        expand(template, self)
    }

    pub fn expand_all(&self, templates: &[String]) -> Vec<String> {
        templates.iter().map(|t| self.expand(t)).collect()
    }
}

/// Expand `{name}` placeholders in `template`
pub fn expand(template: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let key = &after_open[..close];
        match vars.get(key) {
            Some(value) => out.push_str(value),
            None => {
                out.push('{');
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after_open[close + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars {
        TemplateVars::new()
            .with("host", "0.0.0.0")
            .with("port", "8188")
    }

    #[test]
    fn expands_known_placeholders() {
        assert_eq!(vars().expand("{host}:{port}"), "0.0.0.0:8188");
        assert_eq!(vars().expand("--port={port}"), "--port=8188");
    }

    #[test]
    fn leaves_unknown_placeholders() {
        assert_eq!(vars().expand("{nope}-{port}"), "{nope}-8188");
    }

    #[test]
    fn keeps_unterminated_brace() {
        assert_eq!(vars().expand("a{port"), "a{port");
        assert_eq!(vars().expand("{\"k\": 1"), "{\"k\": 1");
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(vars().expand("main.py"), "main.py");
        assert_eq!(vars().expand(""), "");
    }

    #[test]
    fn expand_all_preserves_order() {
        let args = vec!["--listen".to_string(), "{host}".to_string()];
        assert_eq!(vars().expand_all(&args), vec!["--listen", "0.0.0.0"]);
    }
}
