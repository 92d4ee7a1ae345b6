//! HTML output for embedded forms.
//!
//! One page layout with two states: the form (fresh, or redisplayed with
//! errors) and the message shown after a valid submission.

use crate::forms::form::FormInstance;
use crate::models::content::FormContent;

pub const CSRF_FIELD_NAME: &str = "csrfmiddlewaretoken";

/// Escape text for use in element content and quoted attributes.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Everything the page layout needs besides the form or message.
pub struct PageContext<'a> {
    pub content: &'a FormContent,
    pub form_title: &'a str,
    pub action: &'a str,
    pub csrf_token: Option<&'a str>,
}

impl PageContext<'_> {
    fn open(&self) -> String {
        let mut html = format!(r#"<div class="form-content" id="form-content-{}">"#, self.content.id);
        html.push('\n');
        if self.content.show_form_title {
            html.push_str(&format!("<h2>{}</h2>\n", escape(self.form_title)));
        }
        html
    }
}

pub fn render_form(ctx: &PageContext<'_>, form: &FormInstance) -> String {
    let mut html = ctx.open();
    html.push_str(&format!(r#"<form method="post" action="{}">"#, escape(ctx.action)));
    html.push('\n');
    if let Some(token) = ctx.csrf_token {
        html.push_str(&format!(
            r#"<input type="hidden" name="{}" value="{}">"#,
            CSRF_FIELD_NAME,
            escape(token)
        ));
        html.push('\n');
    }
    html.push_str(&form.as_p());
    html.push_str("<input type=\"submit\" value=\"Submit\">\n</form>\n</div>\n");
    html
}

pub fn render_message(ctx: &PageContext<'_>, message: &str) -> String {
    let mut html = ctx.open();
    html.push_str(&format!(r#"<p class="message">{}</p>"#, escape(message)));
    html.push_str("\n</div>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::bases::default_bases;
    use crate::forms::form::RuntimeForm;

    fn content(show_form_title: bool) -> FormContent {
        FormContent {
            id: 4,
            form_id: 1,
            show_form_title,
            success_message: String::new(),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;");
    }

    #[test]
    fn test_render_form_includes_title_and_token() {
        let c = content(true);
        let ctx = PageContext {
            content: &c,
            form_title: "Contact <us>",
            action: "/content/4",
            csrf_token: Some("tok"),
        };
        let form = RuntimeForm::new(Vec::new(), default_bases()).unbound(Some("fc4"));
        let html = render_form(&ctx, &form);
        assert!(html.contains("<h2>Contact &lt;us&gt;</h2>"));
        assert!(html.contains(r#"name="csrfmiddlewaretoken" value="tok""#));
        assert!(html.contains(r#"action="/content/4""#));
    }

    #[test]
    fn test_render_message_without_title() {
        let c = content(false);
        let ctx = PageContext {
            content: &c,
            form_title: "Contact",
            action: "/content/4",
            csrf_token: None,
        };
        let html = render_message(&ctx, "Thanks!");
        assert!(!html.contains("<h2>"));
        assert!(html.contains(r#"<p class="message">Thanks!</p>"#));
    }
}
