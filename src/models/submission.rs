use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::models::field::FormField;
use crate::models::values::{CapturedData, FieldValue};
use crate::render::escape;

/// Extra columns `sorted_data` can append after the field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMeta {
    DateTime,
    Date,
    Time,
    Path,
}

impl FromStr for SubmissionMeta {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "datetime" => Ok(SubmissionMeta::DateTime),
            "date" => Ok(SubmissionMeta::Date),
            "time" => Ok(SubmissionMeta::Time),
            "path" => Ok(SubmissionMeta::Path),
            other => Err(format!("Unknown submission meta '{}'", other)),
        }
    }
}

/// Display key to value, in output order. `None` marks a field that has
/// no captured value. A key seen twice keeps its first position.
pub type SortedData = IndexMap<String, Option<FieldValue>>;

/// Text shown for a sorted value; a missing value shows as empty.
pub fn display(value: &Option<FieldValue>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

/// One completed form, captured as it was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub id: u64,
    pub form_id: u64,
    pub submitted: DateTime<Utc>,
    pub path: String,
    pub data: CapturedData,
}

impl FormSubmission {
    /// Captured values keyed by field title, in the form's current field
    /// order.
    ///
    /// Values whose field has since been removed or renamed follow under
    /// their machine name. Requested meta entries come last.
    pub fn sorted_data(&self, fields: &[FormField], include: &BTreeSet<SubmissionMeta>) -> SortedData {
        let mut current: Vec<&FormField> = fields.iter().filter(|f| f.form_id == self.form_id).collect();
        current.sort_by_key(|f| f.sort_key());

        let mut data = SortedData::new();
        for field in &current {
            data.insert(field.title.clone(), self.data.get(&field.name).cloned());
        }

        for (name, value) in self.data.iter() {
            if !current.iter().any(|field| field.name == name) {
                data.insert(name.to_string(), Some(value.clone()));
            }
        }

        for meta in include {
            let (key, value) = match meta {
                SubmissionMeta::DateTime => ("submitted", self.submitted.format("%Y-%m-%d %H:%M:%S").to_string()),
                SubmissionMeta::Date => ("date submitted", self.submitted.format("%Y-%m-%d").to_string()),
                SubmissionMeta::Time => ("time submitted", self.submitted.format("%H:%M:%S").to_string()),
                SubmissionMeta::Path => ("form path", self.path.clone()),
            };
            data.insert(key.to_string(), Some(FieldValue::Text(value)));
        }
        data
    }

    /// Plain `key: value` lines, or an HTML definition list. Keys listed in
    /// `hidden_fields` are left out of both.
    pub fn formatted_data(&self, fields: &[FormField], as_markup: bool, hidden_fields: &[String]) -> String {
        let visible = self
            .sorted_data(fields, &BTreeSet::new())
            .into_iter()
            .filter(|(key, _)| !hidden_fields.iter().any(|hidden| hidden == key));

        if as_markup {
            let entries: String = visible
                .map(|(key, value)| format!("<dt>{}</dt><dd>{}</dd>\n", escape(&key), escape(&display(&value))))
                .collect();
            format!("<dl>{}</dl>", entries)
        } else {
            visible
                .map(|(key, value)| format!("{}: {}\n", key, display(&value)))
                .collect()
        }
    }

    pub fn formatted_data_html(&self, fields: &[FormField], hidden_fields: &[String]) -> String {
        self.formatted_data(fields, true, hidden_fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field_types::FieldType;
    use chrono::TimeZone;

    fn field(id: u64, ordering: i32, name: &str, title: &str) -> FormField {
        FormField {
            id,
            form_id: 1,
            ordering,
            title: title.to_string(),
            name: name.to_string(),
            field_type: FieldType::Text,
            choices: String::new(),
            help_text: String::new(),
            is_required: true,
        }
    }

    fn text(value: &str) -> FieldValue {
        FieldValue::Text(value.to_string())
    }

    fn submission(data: CapturedData) -> FormSubmission {
        FormSubmission {
            id: 1,
            form_id: 1,
            submitted: Utc.with_ymd_and_hms(2024, 5, 17, 14, 30, 5).unwrap(),
            path: "/contact/".to_string(),
            data,
        }
    }

    fn keys(data: &SortedData) -> Vec<&str> {
        data.keys().map(String::as_str).collect()
    }

    fn entries(data: SortedData) -> Vec<(String, Option<FieldValue>)> {
        data.into_iter().collect()
    }

    #[test]
    fn test_sorted_data_uses_titles_and_field_order() {
        let fields = vec![field(1, 2, "email", "E-mail"), field(2, 1, "name", "Name")];
        let mut data = CapturedData::new();
        data.insert("email", text("a@b.com"));
        data.insert("name", text("X"));

        let sorted = submission(data).sorted_data(&fields, &BTreeSet::new());
        assert_eq!(
            entries(sorted),
            vec![
                ("Name".to_string(), Some(text("X"))),
                ("E-mail".to_string(), Some(text("a@b.com"))),
            ]
        );
    }

    #[test]
    fn test_sorted_data_appends_leftover_keys() {
        let fields = vec![field(1, 0, "name", "Name"), field(2, 1, "phone", "Phone")];
        let mut data = CapturedData::new();
        data.insert("old_field", text("kept"));
        data.insert("name", text("X"));

        let sorted = submission(data).sorted_data(&fields, &BTreeSet::new());
        assert_eq!(keys(&sorted), vec!["Name", "Phone", "old_field"]);
        assert_eq!(sorted["Phone"], None);
        assert_eq!(sorted["old_field"], Some(text("kept")));
    }

    #[test]
    fn test_sorted_data_meta() {
        let include: BTreeSet<SubmissionMeta> = ["path", "time", "datetime", "date"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let sorted = submission(CapturedData::new()).sorted_data(&[], &include);
        assert_eq!(
            entries(sorted),
            vec![
                ("submitted".to_string(), Some(text("2024-05-17 14:30:05"))),
                ("date submitted".to_string(), Some(text("2024-05-17"))),
                ("time submitted".to_string(), Some(text("14:30:05"))),
                ("form path".to_string(), Some(text("/contact/"))),
            ]
        );
        assert!("weekday".parse::<SubmissionMeta>().is_err());
    }

    #[test]
    fn test_formatted_data_hides_fields() {
        let fields = vec![field(1, 0, "email", "E-mail")];
        let mut data = CapturedData::new();
        data.insert("email", text("a@b.com"));
        data.insert("Name", text("X"));

        let hidden = vec!["E-mail".to_string()];
        let s = submission(data);
        assert_eq!(s.formatted_data(&fields, false, &hidden), "Name: X\n");
        assert_eq!(
            s.formatted_data_html(&fields, &hidden),
            "<dl><dt>Name</dt><dd>X</dd>\n</dl>"
        );
        assert_eq!(
            s.formatted_data(&fields, false, &[]),
            "E-mail: a@b.com\nName: X\n"
        );
    }

    #[test]
    fn test_leftover_key_matching_a_title_keeps_title_position() {
        let fields = vec![field(1, 0, "email", "E-mail"), field(2, 1, "name", "Name")];
        let mut data = CapturedData::new();
        data.insert("Name", text("stale"));
        data.insert("email", text("a@b.com"));

        let sorted = submission(data).sorted_data(&fields, &BTreeSet::new());
        assert_eq!(keys(&sorted), vec!["E-mail", "Name"]);
        assert_eq!(sorted["Name"], Some(text("stale")));
    }

    #[test]
    fn test_formatted_data_values() {
        let mut checkbox = field(1, 0, "agree", "Agree");
        checkbox.field_type = FieldType::Checkbox;
        let fields = vec![checkbox, field(2, 1, "topics", "Topics"), field(3, 2, "missing", "Missing")];
        let mut data = CapturedData::new();
        data.insert("agree", FieldValue::Bool(true));
        data.insert("topics", FieldValue::List(vec!["a".into(), "b".into()]));

        assert_eq!(
            submission(data).formatted_data(&fields, false, &[]),
            "Agree: True\nTopics: a, b\nMissing: \n"
        );
    }

    #[test]
    fn test_sorted_data_survives_storage_round_trip() {
        let fields = vec![field(1, 0, "name", "Name"), field(2, 1, "email", "E-mail")];
        let mut data = CapturedData::new();
        data.insert("name", text("Ada"));
        data.insert("email", text("ada@example.com"));
        data.insert("legacy", FieldValue::List(vec!["x".into()]));
        let original = submission(data);

        let restored = submission(CapturedData::decode(&original.data.encode().unwrap()).unwrap());
        let include: BTreeSet<SubmissionMeta> = [SubmissionMeta::Path].into_iter().collect();
        assert_eq!(
            entries(restored.sorted_data(&fields, &include)),
            entries(original.sorted_data(&fields, &include))
        );
    }
}
