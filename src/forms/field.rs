use regex::Regex;
use std::sync::LazyLock;

use crate::models::values::FieldValue;
use crate::render::escape;

/// `(value, label)` pair offered by a choice widget.
pub type Choice = (String, String);

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_EMAIL_MESSAGE: &str = "Enter a valid e-mail address.";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("static e-mail pattern is valid")
});

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// The uniform keyword surface accepted by every field constructor.
/// `None` keeps the constructor's own default.
#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    pub label: Option<String>,
    pub required: Option<bool>,
    pub choices: Option<Vec<Choice>>,
    pub help_text: Option<String>,
}

/// How a value is cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Char,
    Email,
    Boolean,
    Choice,
    MultipleChoice,
}

/// How a field is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    TextInput,
    EmailInput,
    Textarea,
    CheckboxInput,
    Select,
    RadioSelect,
    SelectMultiple,
}

/// A validator/widget pair built for one request cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeField {
    pub kind: FieldKind,
    pub widget: Widget,
    pub label: String,
    pub required: bool,
    pub choices: Vec<Choice>,
    pub help_text: Option<String>,
}

impl RuntimeField {
    pub fn new(kind: FieldKind, widget: Widget, default_required: bool, options: FieldOptions) -> Self {
        Self {
            kind,
            widget,
            label: options.label.unwrap_or_default(),
            required: options.required.unwrap_or(default_required),
            choices: options.choices.unwrap_or_default(),
            help_text: options.help_text.filter(|text| !text.is_empty()),
        }
    }

    fn invalid_choice(value: &str) -> String {
        format!(
            "Select a valid choice. {} is not one of the available choices.",
            value
        )
    }

    fn is_listed(&self, value: &str) -> bool {
        self.choices.iter().any(|(choice, _)| choice == value)
    }

    /// Clean the raw submitted values for this field.
    ///
    /// `raw` holds every value posted under the field's name; single-valued
    /// kinds only look at the first one.
    pub fn clean(&self, raw: &[String]) -> Result<FieldValue, String> {
        let first = raw.first().map(String::as_str).unwrap_or("");

        match self.kind {
            FieldKind::Char | FieldKind::Email => {
                let value = first.trim();
                if value.is_empty() {
                    return if self.required {
                        Err(REQUIRED_MESSAGE.to_string())
                    } else {
                        Ok(FieldValue::Text(String::new()))
                    };
                }
                if self.kind == FieldKind::Email && !is_valid_email(value) {
                    return Err(INVALID_EMAIL_MESSAGE.to_string());
                }
                Ok(FieldValue::Text(value.to_string()))
            }
            FieldKind::Boolean => {
                let lowered = first.trim().to_lowercase();
                let checked = !(lowered.is_empty() || lowered == "false" || lowered == "0");
                if !checked && self.required {
                    return Err(REQUIRED_MESSAGE.to_string());
                }
                Ok(FieldValue::Bool(checked))
            }
            FieldKind::Choice => {
                if first.is_empty() {
                    return if self.required {
                        Err(REQUIRED_MESSAGE.to_string())
                    } else {
                        Ok(FieldValue::Text(String::new()))
                    };
                }
                if !self.is_listed(first) {
                    return Err(Self::invalid_choice(first));
                }
                Ok(FieldValue::Text(first.to_string()))
            }
            FieldKind::MultipleChoice => {
                let values: Vec<String> = raw.iter().filter(|v| !v.is_empty()).cloned().collect();
                if values.is_empty() {
                    return if self.required {
                        Err(REQUIRED_MESSAGE.to_string())
                    } else {
                        Ok(FieldValue::List(Vec::new()))
                    };
                }
                if let Some(bad) = values.iter().find(|value| !self.is_listed(value)) {
                    return Err(Self::invalid_choice(bad));
                }
                Ok(FieldValue::List(values))
            }
        }
    }

    /// Markup for the input itself. `values` are the raw values to redisplay.
    pub fn render_widget(&self, html_name: &str, values: &[String]) -> String {
        let id = format!("id_{}", html_name);
        let first = values.first().map(String::as_str).unwrap_or("");
        let required = if self.required { " required" } else { "" };

        match self.widget {
            Widget::TextInput | Widget::EmailInput => {
                let input_type = if self.widget == Widget::EmailInput { "email" } else { "text" };
                format!(
                    r#"<input type="{}" name="{}" id="{}" value="{}"{}>"#,
                    input_type,
                    escape(html_name),
                    escape(&id),
                    escape(first),
                    required
                )
            }
            Widget::Textarea => format!(
                r#"<textarea name="{}" id="{}" rows="10" cols="40"{}>{}</textarea>"#,
                escape(html_name),
                escape(&id),
                required,
                escape(first)
            ),
            Widget::CheckboxInput => {
                let lowered = first.to_lowercase();
                let checked = !(lowered.is_empty() || lowered == "false" || lowered == "0");
                format!(
                    r#"<input type="checkbox" name="{}" id="{}"{}{}>"#,
                    escape(html_name),
                    escape(&id),
                    if checked { " checked" } else { "" },
                    required
                )
            }
            Widget::Select | Widget::SelectMultiple => {
                let multiple = if self.widget == Widget::SelectMultiple { " multiple" } else { "" };
                let mut html = format!(
                    r#"<select name="{}" id="{}"{}{}>"#,
                    escape(html_name),
                    escape(&id),
                    multiple,
                    required
                );
                for (value, label) in &self.choices {
                    let selected = values.iter().any(|v| v == value);
                    html.push_str(&format!(
                        r#"<option value="{}"{}>{}</option>"#,
                        escape(value),
                        if selected { " selected" } else { "" },
                        escape(label)
                    ));
                }
                html.push_str("</select>");
                html
            }
            Widget::RadioSelect => {
                let mut html = format!(r#"<ul id="{}">"#, escape(&id));
                for (index, (value, label)) in self.choices.iter().enumerate() {
                    let checked = first == value;
                    html.push_str(&format!(
                        r#"<li><label for="{id}_{index}"><input type="radio" name="{name}" value="{value}" id="{id}_{index}"{checked}{required}> {label}</label></li>"#,
                        id = escape(&id),
                        index = index,
                        name = escape(html_name),
                        value = escape(value),
                        checked = if checked { " checked" } else { "" },
                        required = required,
                        label = escape(label),
                    ));
                }
                html.push_str("</ul>");
                html
            }
        }
    }
}
