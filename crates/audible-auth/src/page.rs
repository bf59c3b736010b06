//! Login page extraction primitives
//!
//! The sign-in pages are scraped for exactly three things: hidden form
//! fields, the CAPTCHA image, and the error banner. Plain string scanning is
//! enough for those, so there is no HTML tree in the dependency stack.

use std::collections::HashMap;

/// Collect `name → value` for every hidden `<input>` on the page.
pub fn hidden_inputs(html: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for tag in tags(html, "<input") {
        if attr(tag, "type").as_deref() != Some("hidden") {
            continue;
        }
        if let Some(name) = attr(tag, "name") {
            fields.insert(name, attr(tag, "value").unwrap_or_default());
        }
    }
    fields
}

/// URL of the CAPTCHA image, if the page presents one.
pub fn captcha_image_url(html: &str) -> Option<String> {
    tags(html, "<img")
        .filter_map(|tag| attr(tag, "src"))
        .find(|src| src.contains("captcha"))
}

/// Text of the login error banner, whitespace-collapsed.
pub fn error_box_text(html: &str) -> Option<String> {
    let idx = html.find("auth-error-message-box")?;
    let after = &html[idx..];
    let content_start = after.find('>')? + 1;
    let content = &after[content_start..];
    let content = &content[..content.find("</div>").unwrap_or(content.len())];
    let text = collapse_whitespace(&strip_tags(content));
    (!text.is_empty()).then_some(text)
}

/// Iterate over raw tag texts starting with `open` (e.g. `<input`).
fn tags<'a>(html: &'a str, open: &'a str) -> impl Iterator<Item = &'a str> {
    let mut rest = html;
    std::iter::from_fn(move || {
        let idx = rest.find(open)?;
        let tag_start = &rest[idx..];
        let end = tag_start.find('>').map(|e| e + 1).unwrap_or(tag_start.len());
        let tag = &tag_start[..end];
        rest = &tag_start[end..];
        Some(tag)
    })
}

/// Extract a quoted attribute value from a single tag's text.
fn attr(tag: &str, name: &str) -> Option<String> {
    let needle = format!("{name}=");
    let mut search = tag;
    loop {
        let idx = search.find(&needle)?;
        // `name=` must not match the tail of e.g. `data-name=`
        let boundary = idx == 0 || search.as_bytes()[idx - 1].is_ascii_whitespace();
        let after = &search[idx + needle.len()..];
        if boundary {
            let quote = after.chars().next()?;
            if quote == '"' || quote == '\'' {
                let inner = &after[1..];
                let end = inner.find(quote)?;
                return Some(inner[..end].to_string());
            }
        }
        search = after;
    }
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_inputs_are_collected() {
        let html = r#"
            <form name="signIn" method="post">
              <input type="hidden" name="appActionToken" value="tok-1"/>
              <input type="hidden" name="workflowState" value="state-2">
              <input type="text" name="email" value="ignored"/>
              <input type="hidden" name="prevRID"/>
            </form>
        "#;
        let fields = hidden_inputs(html);
        assert_eq!(fields.get("appActionToken").map(String::as_str), Some("tok-1"));
        assert_eq!(fields.get("workflowState").map(String::as_str), Some("state-2"));
        assert_eq!(fields.get("prevRID").map(String::as_str), Some(""));
        assert!(!fields.contains_key("email"));
    }

    #[test]
    fn data_attributes_do_not_shadow_names() {
        let html = r#"<input type="hidden" data-name="decoy" name="real" value="v"/>"#;
        let fields = hidden_inputs(html);
        assert_eq!(fields.get("real").map(String::as_str), Some("v"));
        assert!(!fields.contains_key("decoy"));
    }

    #[test]
    fn captcha_image_is_found() {
        let html = r#"
            <img src="https://images.example/logo.png"/>
            <img id="auth-captcha-image"
                 src="https://opfcaptcha-prod.s3.amazonaws.com/captcha-1.jpg" alt="captcha"/>
        "#;
        assert_eq!(
            captcha_image_url(html).as_deref(),
            Some("https://opfcaptcha-prod.s3.amazonaws.com/captcha-1.jpg")
        );
        assert_eq!(captcha_image_url("<img src=\"x.png\"/>"), None);
    }

    #[test]
    fn error_banner_text_is_trimmed() {
        let html = r#"
            <div id="auth-error-message-box">
              <div class="a-alert-content">
                <span>
                  Incorrect email or password
                </span>
              </div>
            </div>
        "#;
        assert_eq!(error_box_text(html).as_deref(), Some("Incorrect email or password"));
    }

    #[test]
    fn missing_error_banner_is_none() {
        assert_eq!(error_box_text("<html><body>fine</body></html>"), None);
    }
}
