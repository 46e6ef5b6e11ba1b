use askama::Template;
use askama_web::WebTemplate;

#[derive(Template)]
#[template(path = "manifest.json", escape = "none")]
pub(crate) struct ManifestTemplate<'a> {
    pub(crate) app_name: &'a str,
}

#[derive(Template)]
#[template(path = "sw.js", escape = "none")]
pub(crate) struct ServiceWorkerTemplate<'a> {
    pub(crate) app_name: &'a str,
}

#[derive(Template, WebTemplate)]
#[template(path = "push.html")]
pub(crate) struct PushSettingsTemplate {
    pub(crate) app_name: String,
}

mod filters {
    use std::fmt::Write;

    pub fn json_escape(value: &str, _values: &dyn askama::Values) -> askama::Result<String> {
        let mut escaped = String::with_capacity(value.len());
        for ch in value.chars() {
            match ch {
                '"' => escaped.push_str("\\\""),
                '\\' => escaped.push_str("\\\\"),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                '\t' => escaped.push_str("\\t"),
                '\u{08}' => escaped.push_str("\\b"),
                '\u{0C}' => escaped.push_str("\\f"),
                '<' => escaped.push_str("\\u003c"),
                ch if ch < '\u{20}' => {
                    write!(escaped, "\\u{:04x}", ch as u32)?;
                }
                _ => escaped.push(ch),
            }
        }
        Ok(escaped)
    }
}
