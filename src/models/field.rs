use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

use crate::error::FormError;
use crate::forms::field::{Choice, FieldOptions, RuntimeField};
use crate::models::field_types::{lookup, FieldType};

pub const BLANK_CHOICE_LABEL: &str = "---------";

const MAX_TITLE: usize = 100;
const MAX_NAME: usize = 100;
const MAX_CHOICES: usize = 1024;
const MAX_HELP_TEXT: usize = 1024;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("static slug pattern is valid"));
static SLUG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("static slug pattern is valid"));

/// Lowercase ASCII slug: punctuation dropped, runs of spaces and hyphens
/// collapsed into one hyphen. Accented letters fold to their NFKD base;
/// anything with no ASCII decomposition is dropped.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let cleaned = NON_SLUG_CHARS.replace_all(&ascii, "");
    let lowered = cleaned.trim().to_lowercase();
    SLUG_SEPARATORS.replace_all(&lowered, "-").into_owned()
}

fn default_required() -> bool {
    true
}

/// One input definition belonging to a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub form_id: u64,
    #[serde(default)]
    pub ordering: i32,
    pub title: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub choices: String,
    #[serde(default)]
    pub help_text: String,
    #[serde(default = "default_required")]
    pub is_required: bool,
}

impl FormField {
    /// The `(value, label)` options for this field, in declared order.
    pub fn get_choices(&self) -> Vec<Choice> {
        let mut choices: Vec<Choice> = Vec::new();
        if !self.is_required && self.field_type == FieldType::Select {
            choices.push((String::new(), BLANK_CHOICE_LABEL.to_string()));
        }
        if self.choices.trim().is_empty() {
            return choices;
        }
        choices.extend(self.choices.split(',').map(|raw| {
            let label = raw.trim();
            (slugify(label), label.to_string())
        }));
        choices
    }

    /// Row-level validation, run before every insert or update.
    pub fn validate(&self) -> Result<(), FormError> {
        if !self.choices.is_empty() && !self.field_type.is_choice_type() {
            return Err(FormError::ChoicesNotAllowed(self.field_type.tag().to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(FormError::Required { field: "title" });
        }
        if self.name.is_empty() {
            return Err(FormError::Required { field: "name" });
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(FormError::InvalidFieldName(self.name.clone()));
        }

        let limits = [
            ("title", &self.title, MAX_TITLE),
            ("name", &self.name, MAX_NAME),
            ("choices", &self.choices, MAX_CHOICES),
            ("help_text", &self.help_text, MAX_HELP_TEXT),
        ];
        for (field, value, max) in limits {
            if value.chars().count() > max {
                return Err(FormError::TooLong { field, max });
            }
        }
        Ok(())
    }

    /// Build the validator/widget for this row.
    pub fn as_runtime_field(&self) -> Result<RuntimeField, FormError> {
        let entry = lookup(self.field_type.tag())?;
        let options = FieldOptions {
            label: Some(self.title.clone()),
            required: Some(self.is_required),
            choices: (!self.choices.is_empty()).then(|| self.get_choices()),
            help_text: (!self.help_text.is_empty()).then(|| self.help_text.clone()),
        };
        Ok((entry.build)(options))
    }

    /// Sort key used everywhere fields are listed.
    pub fn sort_key(&self) -> (i32, u64) {
        (self.ordering, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::field::Widget;

    fn field(field_type: FieldType, choices: &str, is_required: bool) -> FormField {
        FormField {
            id: 1,
            form_id: 1,
            ordering: 0,
            title: "Colour".to_string(),
            name: "colour".to_string(),
            field_type,
            choices: choices.to_string(),
            help_text: String::new(),
            is_required,
        }
    }

    fn pair(value: &str, label: &str) -> Choice {
        (value.to_string(), label.to_string())
    }

    #[test]
    fn test_get_choices_trims_and_slugifies() {
        let f = field(FieldType::Radio, "A, b ,C", true);
        assert_eq!(
            f.get_choices(),
            vec![pair("a", "A"), pair("b", "b"), pair("c", "C")]
        );
    }

    #[test]
    fn test_optional_select_gets_blank_choice() {
        let f = field(FieldType::Select, "", false);
        assert_eq!(f.get_choices(), vec![pair("", BLANK_CHOICE_LABEL)]);

        let f = field(FieldType::Select, "Red", false);
        assert_eq!(
            f.get_choices(),
            vec![pair("", BLANK_CHOICE_LABEL), pair("red", "Red")]
        );

        // Only plain selects get the blank option.
        let f = field(FieldType::MultipleSelect, "Red", false);
        assert_eq!(f.get_choices(), vec![pair("red", "Red")]);
    }

    #[test]
    fn test_choices_only_on_choice_types() {
        let err = field(FieldType::Text, "A,B", true).validate().unwrap_err();
        assert_eq!(err, FormError::ChoicesNotAllowed("text".to_string()));
        assert_eq!(err.to_string(), "You can't specify choices for text fields");

        assert!(field(FieldType::Select, "A,B", true).validate().is_ok());
        assert!(field(FieldType::Text, "", true).validate().is_ok());
    }

    #[test]
    fn test_validate_name_and_lengths() {
        let mut f = field(FieldType::Text, "", true);
        f.name = "first name".to_string();
        assert_eq!(
            f.validate(),
            Err(FormError::InvalidFieldName("first name".to_string()))
        );

        f.name = "first_name".to_string();
        f.title = "x".repeat(101);
        assert_eq!(
            f.validate(),
            Err(FormError::TooLong { field: "title", max: 100 })
        );
    }

    #[test]
    fn test_as_runtime_field() {
        let mut f = field(FieldType::Select, "Red, Dark Blue", true);
        f.help_text = "Pick one".to_string();
        let runtime = f.as_runtime_field().unwrap();
        assert_eq!(runtime.label, "Colour");
        assert!(runtime.required);
        assert_eq!(runtime.widget, Widget::Select);
        assert_eq!(runtime.choices, vec![pair("red", "Red"), pair("dark-blue", "Dark Blue")]);
        assert_eq!(runtime.help_text.as_deref(), Some("Pick one"));
    }

    #[test]
    fn test_optional_select_without_choices_has_no_options() {
        // Choices are only handed over when the column is non-empty.
        let runtime = field(FieldType::Select, "", false).as_runtime_field().unwrap();
        assert!(runtime.choices.is_empty());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Dark  Blue"), "dark-blue");
        assert_eq!(slugify(" Hello, World! "), "hello-world");
        assert_eq!(slugify("a--b_c"), "a-b_c");
        assert_eq!(slugify("Café"), "cafe");
        assert_eq!(slugify("Crème Brûlée"), "creme-brulee");
        assert_eq!(slugify("ﬁne Ｘ"), "fine-x");
        assert_eq!(slugify("日本"), "");
    }
}
