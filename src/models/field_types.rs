use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FormError;
use crate::forms::field::{FieldKind, FieldOptions, RuntimeField, Widget};

/// The closed set of field types an administrator can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "longtext")]
    LongText,
    #[serde(rename = "checkbox")]
    Checkbox,
    #[serde(rename = "select")]
    Select,
    #[serde(rename = "radio")]
    Radio,
    #[serde(rename = "multiple-select")]
    MultipleSelect,
}

/// One registry row: tag, human label and constructor.
pub struct FieldTypeEntry {
    pub field_type: FieldType,
    pub tag: &'static str,
    pub label: &'static str,
    pub build: fn(FieldOptions) -> RuntimeField,
}

fn text(options: FieldOptions) -> RuntimeField {
    RuntimeField::new(FieldKind::Char, Widget::TextInput, true, options)
}

fn email(options: FieldOptions) -> RuntimeField {
    RuntimeField::new(FieldKind::Email, Widget::EmailInput, true, options)
}

fn long_text(options: FieldOptions) -> RuntimeField {
    RuntimeField::new(FieldKind::Char, Widget::Textarea, true, options)
}

fn checkbox(options: FieldOptions) -> RuntimeField {
    RuntimeField::new(FieldKind::Boolean, Widget::CheckboxInput, false, options)
}

fn select(options: FieldOptions) -> RuntimeField {
    RuntimeField::new(FieldKind::Choice, Widget::Select, false, options)
}

fn radio(options: FieldOptions) -> RuntimeField {
    RuntimeField::new(FieldKind::Choice, Widget::RadioSelect, true, options)
}

fn multiple_select(options: FieldOptions) -> RuntimeField {
    RuntimeField::new(FieldKind::MultipleChoice, Widget::SelectMultiple, true, options)
}

pub static FIELD_TYPES: &[FieldTypeEntry] = &[
    FieldTypeEntry { field_type: FieldType::Text, tag: "text", label: "text", build: text },
    FieldTypeEntry { field_type: FieldType::Email, tag: "email", label: "e-mail address", build: email },
    FieldTypeEntry { field_type: FieldType::LongText, tag: "longtext", label: "long text", build: long_text },
    FieldTypeEntry { field_type: FieldType::Checkbox, tag: "checkbox", label: "checkbox", build: checkbox },
    FieldTypeEntry { field_type: FieldType::Select, tag: "select", label: "select", build: select },
    FieldTypeEntry { field_type: FieldType::Radio, tag: "radio", label: "radio", build: radio },
    FieldTypeEntry {
        field_type: FieldType::MultipleSelect,
        tag: "multiple-select",
        label: "multiple select",
        build: multiple_select,
    },
];

/// Find the registry row for a type tag.
pub fn lookup(tag: &str) -> Result<&'static FieldTypeEntry, FormError> {
    FIELD_TYPES
        .iter()
        .find(|entry| entry.tag == tag)
        .ok_or_else(|| FormError::UnknownFieldType(tag.to_string()))
}

impl FieldType {
    pub fn tag(&self) -> &'static str {
        self.entry().tag
    }

    pub fn label(&self) -> &'static str {
        self.entry().label
    }

    fn entry(&self) -> &'static FieldTypeEntry {
        FIELD_TYPES
            .iter()
            .find(|entry| entry.field_type == *self)
            .unwrap_or(&FIELD_TYPES[0])
    }

    pub fn is_choice_type(&self) -> bool {
        matches!(
            self,
            FieldType::Select | FieldType::Radio | FieldType::MultipleSelect
        )
    }

    pub fn build(&self, options: FieldOptions) -> RuntimeField {
        (self.entry().build)(options)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FieldType {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(s).map(|entry| entry.field_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_is_registered_once() {
        let all = [
            FieldType::Text,
            FieldType::Email,
            FieldType::LongText,
            FieldType::Checkbox,
            FieldType::Select,
            FieldType::Radio,
            FieldType::MultipleSelect,
        ];
        assert_eq!(FIELD_TYPES.len(), all.len());
        for field_type in all {
            let parsed: FieldType = field_type.tag().parse().unwrap();
            assert_eq!(parsed, field_type);
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            lookup("date").err(),
            Some(FormError::UnknownFieldType("date".to_string()))
        );
    }

    #[test]
    fn test_constructor_defaults_are_overridable() {
        let optional = FieldType::Checkbox.build(FieldOptions::default());
        assert!(!optional.required);

        let required = FieldType::Checkbox.build(FieldOptions {
            required: Some(true),
            ..Default::default()
        });
        assert!(required.required);

        assert_eq!(FieldType::LongText.build(FieldOptions::default()).widget, Widget::Textarea);
        assert_eq!(FieldType::Radio.build(FieldOptions::default()).widget, Widget::RadioSelect);
    }

    #[test]
    fn test_serde_uses_tags() {
        let json = serde_json::to_string(&FieldType::MultipleSelect).unwrap();
        assert_eq!(json, "\"multiple-select\"");
        let parsed: FieldType = serde_json::from_str("\"longtext\"").unwrap();
        assert_eq!(parsed, FieldType::LongText);
    }
}
