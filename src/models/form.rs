use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::FormError;
use crate::forms::bases::SharedBase;
use crate::forms::field::is_valid_email;
use crate::forms::form::RuntimeForm;
use crate::models::field::FormField;

const MAX_TITLE: usize = 100;

/// Processing options a form may switch on.
pub struct ConfigOption {
    pub key: &'static str,
    pub title: &'static str,
    /// `(setting name, label)` pairs the option expects.
    pub settings: &'static [(&'static str, &'static str)],
}

pub static CONFIG_OPTIONS: &[ConfigOption] = &[ConfigOption {
    key: "email",
    title: "E-mail",
    settings: &[("email", "e-mail address")],
}];

/// Parsed form config: option name to option settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormConfig(Map<String, Value>);

impl FormConfig {
    pub fn parse(raw: &str) -> Result<Self, FormError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(_) => Err(FormError::InvalidConfig("config must be a JSON object".to_string())),
            Err(e) => Err(FormError::InvalidConfig(e.to_string())),
        }
    }

    pub fn contains(&self, option: &str) -> bool {
        self.0.contains_key(option)
    }

    pub fn option(&self, option: &str) -> Option<&Value> {
        self.0.get(option)
    }

    /// The notification address, when the `email` option is switched on.
    pub fn email_recipient(&self) -> Option<&str> {
        self.option("email")?.get("email")?.as_str()
    }

    /// Check every recognized option carries usable settings.
    pub fn validate(&self) -> Result<(), FormError> {
        for (key, settings) in &self.0 {
            let Some(option) = Form::config_options().iter().find(|option| option.key == key) else {
                return Err(FormError::InvalidConfig(format!("unknown option '{}'", key)));
            };
            for (setting, label) in option.settings {
                let value = settings.get(*setting).and_then(Value::as_str).unwrap_or("");
                if value.is_empty() {
                    return Err(FormError::InvalidConfig(format!(
                        "{} needs a {}",
                        option.title, label
                    )));
                }
            }
        }
        if let Some(address) = self.email_recipient() {
            if !is_valid_email(address) {
                return Err(FormError::InvalidConfig(format!(
                    "'{}' is not a valid e-mail address",
                    address
                )));
            }
        }
        Ok(())
    }
}

/// An administrator-defined form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    #[serde(default)]
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub config_json: String,
}

impl Form {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            config_json: String::new(),
        }
    }

    /// Lazily parsed config. A stored value that no longer parses reads as empty.
    pub fn config(&self) -> FormConfig {
        FormConfig::parse(&self.config_json).unwrap_or_else(|e| {
            warn!("Ignoring unreadable config on form {}: {}", self.id, e);
            FormConfig::default()
        })
    }

    /// Processing options an admin may configure on a form.
    pub fn config_options() -> &'static [ConfigOption] {
        CONFIG_OPTIONS
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.title.trim().is_empty() {
            return Err(FormError::Required { field: "title" });
        }
        if self.title.chars().count() > MAX_TITLE {
            return Err(FormError::TooLong { field: "title", max: MAX_TITLE });
        }
        FormConfig::parse(&self.config_json)?.validate()
    }

    /// Synthesize the runtime form from this form's fields.
    ///
    /// `fields` may arrive in any order; they are laid out by
    /// `(ordering, id)`. Rows belonging to another form are skipped.
    pub fn as_runtime_form(
        &self,
        fields: &[FormField],
        bases: &[SharedBase],
    ) -> Result<RuntimeForm, FormError> {
        let mut ordered: Vec<&FormField> = fields.iter().filter(|f| f.form_id == self.id).collect();
        ordered.sort_by_key(|f| f.sort_key());

        let runtime_fields = ordered
            .into_iter()
            .map(|field| Ok((field.name.clone(), field.as_runtime_field()?)))
            .collect::<Result<Vec<_>, FormError>>()?;

        Ok(RuntimeForm::new(runtime_fields, bases.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::bases::default_bases;
    use crate::models::field_types::FieldType;

    fn field(id: u64, ordering: i32, name: &str) -> FormField {
        FormField {
            id,
            form_id: 1,
            ordering,
            title: name.to_uppercase(),
            name: name.to_string(),
            field_type: FieldType::Text,
            choices: String::new(),
            help_text: String::new(),
            is_required: true,
        }
    }

    fn form() -> Form {
        Form {
            id: 1,
            title: "Contact".to_string(),
            config_json: String::new(),
        }
    }

    #[test]
    fn test_runtime_form_follows_ordering() {
        let fields = vec![field(1, 2, "b"), field(2, 1, "a")];
        let runtime = form().as_runtime_form(&fields, &default_bases()).unwrap();
        assert_eq!(runtime.field_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_runtime_form_ties_break_on_id() {
        let fields = vec![field(9, 0, "late"), field(3, 0, "early")];
        let runtime = form().as_runtime_form(&fields, &default_bases()).unwrap();
        assert_eq!(runtime.field_names(), vec!["early", "late"]);
    }

    #[test]
    fn test_runtime_form_is_rebuilt_equivalently() {
        let fields = vec![field(1, 0, "name"), field(2, 1, "email")];
        let first = form().as_runtime_form(&fields, &default_bases()).unwrap();
        let second = form().as_runtime_form(&fields, &default_bases()).unwrap();
        assert_eq!(first.fields(), second.fields());
    }

    #[test]
    fn test_config_email_recipient() {
        let mut f = form();
        assert!(!f.config().contains("email"));

        f.config_json = r#"{"email": {"email": "team@example.com"}}"#.to_string();
        assert_eq!(f.config().email_recipient(), Some("team@example.com"));
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut f = form();
        f.config_json = "not json".to_string();
        assert!(matches!(f.validate(), Err(FormError::InvalidConfig(_))));
        assert_eq!(f.config(), FormConfig::default());

        f.config_json = r#"{"email": {"email": "nope"}}"#.to_string();
        assert!(matches!(f.validate(), Err(FormError::InvalidConfig(_))));

        f.config_json = r#"{"email": {}}"#.to_string();
        assert!(matches!(f.validate(), Err(FormError::InvalidConfig(_))));

        f.config_json = r#"{"fax": {}}"#.to_string();
        assert!(matches!(f.validate(), Err(FormError::InvalidConfig(_))));
    }
}
