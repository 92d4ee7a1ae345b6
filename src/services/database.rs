use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::error::StoreError;
use crate::models::content::FormContent;
use crate::models::field::FormField;
use crate::models::form::Form;
use crate::models::submission::FormSubmission;
use crate::models::values::CapturedData;

const FORMS_FILE: &str = "forms.csv";
const FIELDS_FILE: &str = "form_fields.csv";
const SUBMISSIONS_FILE: &str = "submissions.csv";
const CONTENTS_FILE: &str = "form_contents.csv";
const SEQUENCES_FILE: &str = "sequences.csv";

const FORM_HEADERS: &[&str] = &["id", "title", "config_json"];
const FIELD_HEADERS: &[&str] = &[
    "id",
    "form_id",
    "ordering",
    "title",
    "name",
    "type",
    "choices",
    "help_text",
    "is_required",
];
const SUBMISSION_HEADERS: &[&str] = &["id", "form_id", "submitted", "path", "data"];
const CONTENT_HEADERS: &[&str] = &["id", "form_id", "show_form_title", "success_message"];
const SEQUENCE_HEADERS: &[&str] = &["table", "last_id"];

const MAX_PATH: usize = 255;

// Row stored in submissions.csv; `data` holds the JSON-encoded captured values
#[derive(Debug, Serialize, Deserialize, Clone)]
struct SubmissionRecord {
    id: u64,
    form_id: u64,
    submitted: String, // RFC 3339
    path: String,
    data: String,
}

impl SubmissionRecord {
    fn from_submission(submission: &FormSubmission) -> Result<Self, StoreError> {
        Ok(Self {
            id: submission.id,
            form_id: submission.form_id,
            submitted: submission.submitted.to_rfc3339(),
            path: submission.path.clone(),
            data: submission.data.encode()?,
        })
    }

    fn into_submission(self) -> Result<FormSubmission, StoreError> {
        let submitted = DateTime::parse_from_rfc3339(&self.submitted)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Corrupt(format!("bad timestamp on submission {}: {}", self.id, e)))?;
        Ok(FormSubmission {
            id: self.id,
            form_id: self.form_id,
            submitted,
            path: self.path,
            data: CapturedData::decode(&self.data)?,
        })
    }
}

// Highest id ever handed out per table; never decreases, so deleted ids stay retired
#[derive(Debug, Serialize, Deserialize)]
struct SequenceRecord {
    table: String,
    last_id: u64,
}

trait Keyed {
    fn key(&self) -> u64;
}

impl Keyed for Form {
    fn key(&self) -> u64 {
        self.id
    }
}

impl Keyed for FormField {
    fn key(&self) -> u64 {
        self.id
    }
}

impl Keyed for SubmissionRecord {
    fn key(&self) -> u64 {
        self.id
    }
}

impl Keyed for FormContent {
    fn key(&self) -> u64 {
        self.id
    }
}

// Persistence for forms, fields, submissions and embedded contents
pub struct DatabaseService {
    data_dir: PathBuf,
    file_mutex: Mutex<()>,
}

impl DatabaseService {
    /// Open a store rooted at `data_dir`, creating missing tables with headers.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let tables = [
            (FORMS_FILE, FORM_HEADERS),
            (FIELDS_FILE, FIELD_HEADERS),
            (SUBMISSIONS_FILE, SUBMISSION_HEADERS),
            (CONTENTS_FILE, CONTENT_HEADERS),
            (SEQUENCES_FILE, SEQUENCE_HEADERS),
        ];
        for (file_name, headers) in tables {
            let path = data_dir.join(file_name);
            if !path.exists() {
                info!("Creating new database file at {}", path.display());
                let file = File::create(&path)?;
                let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
                writer.write_record(headers)?;
                writer.flush()?;
            }
        }

        Ok(Self {
            data_dir,
            file_mutex: Mutex::new(()),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.file_mutex.lock().map_err(|e| {
            error!("Failed to acquire database mutex: {}", e);
            StoreError::Poisoned
        })
    }

    fn path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    fn read_all<T: DeserializeOwned>(&self, file_name: &str) -> Result<Vec<T>, StoreError> {
        let file = match File::open(self.path(file_name)) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut rows = Vec::new();
        for result in reader.deserialize() {
            rows.push(result?);
        }
        Ok(rows)
    }

    fn write_all<T: Serialize>(&self, file_name: &str, headers: &[&str], rows: &[T]) -> Result<(), StoreError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.path(file_name))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(headers)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn append<T: Serialize>(&self, file_name: &str, row: &T) -> Result<(), StoreError> {
        let file = OpenOptions::new().append(true).open(self.path(file_name))?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }

    /// Allocate the next id for `table`. Caller must hold the file lock.
    ///
    /// Tables written before the sequence file existed seed from their
    /// highest stored id.
    fn next_id<T: Keyed>(&self, table: &str, rows: &[T]) -> Result<u64, StoreError> {
        let mut sequences: Vec<SequenceRecord> = self.read_all(SEQUENCES_FILE)?;
        let in_use = rows.iter().map(Keyed::key).max().unwrap_or(0);

        let id = match sequences.iter_mut().find(|sequence| sequence.table == table) {
            Some(sequence) => {
                sequence.last_id = sequence.last_id.max(in_use) + 1;
                sequence.last_id
            }
            None => {
                sequences.push(SequenceRecord {
                    table: table.to_string(),
                    last_id: in_use + 1,
                });
                in_use + 1
            }
        };
        self.write_all(SEQUENCES_FILE, SEQUENCE_HEADERS, &sequences)?;
        Ok(id)
    }

    // ---- forms ----

    pub fn create_form(&self, mut form: Form) -> Result<Form, StoreError> {
        form.validate()?;
        let _lock = self.lock()?;

        let forms: Vec<Form> = self.read_all(FORMS_FILE)?;
        form.id = self.next_id(FORMS_FILE, &forms)?;
        self.append(FORMS_FILE, &form)?;

        info!("Stored form {} ({})", form.id, form.title);
        Ok(form)
    }

    pub fn get_form(&self, id: u64) -> Result<Form, StoreError> {
        let _lock = self.lock()?;
        self.find_form(id)
    }

    fn find_form(&self, id: u64) -> Result<Form, StoreError> {
        self.read_all::<Form>(FORMS_FILE)?
            .into_iter()
            .find(|form| form.id == id)
            .ok_or(StoreError::NotFound { resource: "form", id })
    }

    pub fn list_forms(&self) -> Result<Vec<Form>, StoreError> {
        let _lock = self.lock()?;
        let mut forms: Vec<Form> = self.read_all(FORMS_FILE)?;
        forms.sort_by_key(|form| form.id);
        Ok(forms)
    }

    pub fn update_form(&self, id: u64, mut form: Form) -> Result<Form, StoreError> {
        form.validate()?;
        let _lock = self.lock()?;

        let mut forms: Vec<Form> = self.read_all(FORMS_FILE)?;
        let slot = forms
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or(StoreError::NotFound { resource: "form", id })?;
        form.id = id;
        *slot = form.clone();
        self.write_all(FORMS_FILE, FORM_HEADERS, &forms)?;

        info!("Updated form {}", id);
        Ok(form)
    }

    /// Delete a form together with its fields, submissions and embeddings.
    pub fn delete_form(&self, id: u64) -> Result<(), StoreError> {
        let _lock = self.lock()?;

        let mut forms: Vec<Form> = self.read_all(FORMS_FILE)?;
        let before = forms.len();
        forms.retain(|form| form.id != id);
        if forms.len() == before {
            return Err(StoreError::NotFound { resource: "form", id });
        }

        let mut fields: Vec<FormField> = self.read_all(FIELDS_FILE)?;
        fields.retain(|field| field.form_id != id);
        let mut submissions: Vec<SubmissionRecord> = self.read_all(SUBMISSIONS_FILE)?;
        submissions.retain(|submission| submission.form_id != id);
        let mut contents: Vec<FormContent> = self.read_all(CONTENTS_FILE)?;
        contents.retain(|content| content.form_id != id);

        self.write_all(FIELDS_FILE, FIELD_HEADERS, &fields)?;
        self.write_all(SUBMISSIONS_FILE, SUBMISSION_HEADERS, &submissions)?;
        self.write_all(CONTENTS_FILE, CONTENT_HEADERS, &contents)?;
        self.write_all(FORMS_FILE, FORM_HEADERS, &forms)?;

        info!("Deleted form {} and its dependent rows", id);
        Ok(())
    }

    // ---- fields ----

    fn ensure_unique_name(fields: &[FormField], candidate: &FormField) -> Result<(), StoreError> {
        let taken = fields.iter().any(|field| {
            field.form_id == candidate.form_id && field.name == candidate.name && field.id != candidate.id
        });
        if taken {
            warn!(
                "Rejecting duplicate field name '{}' on form {}",
                candidate.name, candidate.form_id
            );
            return Err(StoreError::Conflict(format!(
                "form {} already has a field named '{}'",
                candidate.form_id, candidate.name
            )));
        }
        Ok(())
    }

    pub fn create_field(&self, form_id: u64, mut field: FormField) -> Result<FormField, StoreError> {
        field.validate()?;
        let _lock = self.lock()?;
        self.find_form(form_id)?;

        let fields: Vec<FormField> = self.read_all(FIELDS_FILE)?;
        field.form_id = form_id;
        Self::ensure_unique_name(&fields, &field)?;
        field.id = self.next_id(FIELDS_FILE, &fields)?;
        self.append(FIELDS_FILE, &field)?;

        info!("Stored field '{}' ({}) on form {}", field.name, field.field_type, form_id);
        Ok(field)
    }

    pub fn get_field(&self, id: u64) -> Result<FormField, StoreError> {
        let _lock = self.lock()?;
        self.read_all::<FormField>(FIELDS_FILE)?
            .into_iter()
            .find(|field| field.id == id)
            .ok_or(StoreError::NotFound { resource: "field", id })
    }

    /// Update a field in place. The owning form never changes.
    pub fn update_field(&self, id: u64, mut field: FormField) -> Result<FormField, StoreError> {
        field.validate()?;
        let _lock = self.lock()?;

        let mut fields: Vec<FormField> = self.read_all(FIELDS_FILE)?;
        let form_id = fields
            .iter()
            .find(|existing| existing.id == id)
            .map(|existing| existing.form_id)
            .ok_or(StoreError::NotFound { resource: "field", id })?;
        field.id = id;
        field.form_id = form_id;
        Self::ensure_unique_name(&fields, &field)?;

        if let Some(slot) = fields.iter_mut().find(|existing| existing.id == id) {
            *slot = field.clone();
        }
        self.write_all(FIELDS_FILE, FIELD_HEADERS, &fields)?;

        info!("Updated field {} on form {}", id, form_id);
        Ok(field)
    }

    pub fn delete_field(&self, id: u64) -> Result<(), StoreError> {
        let _lock = self.lock()?;
        let mut fields: Vec<FormField> = self.read_all(FIELDS_FILE)?;
        let before = fields.len();
        fields.retain(|field| field.id != id);
        if fields.len() == before {
            return Err(StoreError::NotFound { resource: "field", id });
        }
        self.write_all(FIELDS_FILE, FIELD_HEADERS, &fields)?;
        info!("Deleted field {}", id);
        Ok(())
    }

    /// Fields of one form, ordered by `(ordering, id)`.
    pub fn fields_for_form(&self, form_id: u64) -> Result<Vec<FormField>, StoreError> {
        let _lock = self.lock()?;
        let mut fields: Vec<FormField> = self
            .read_all::<FormField>(FIELDS_FILE)?
            .into_iter()
            .filter(|field| field.form_id == form_id)
            .collect();
        fields.sort_by_key(FormField::sort_key);
        Ok(fields)
    }

    // ---- submissions ----

    pub fn create_submission(
        &self,
        form_id: u64,
        path: &str,
        data: CapturedData,
        submitted: DateTime<Utc>,
    ) -> Result<FormSubmission, StoreError> {
        let _lock = self.lock()?;
        self.find_form(form_id)?;

        let records: Vec<SubmissionRecord> = self.read_all(SUBMISSIONS_FILE)?;
        let submission = FormSubmission {
            id: self.next_id(SUBMISSIONS_FILE, &records)?,
            form_id,
            submitted,
            path: path.chars().take(MAX_PATH).collect(),
            data,
        };
        self.append(SUBMISSIONS_FILE, &SubmissionRecord::from_submission(&submission)?)?;

        info!(
            "Stored submission {} for form {} from {}",
            submission.id, form_id, submission.path
        );
        Ok(submission)
    }

    /// Submissions of one form, newest first.
    pub fn submissions_for_form(&self, form_id: u64) -> Result<Vec<FormSubmission>, StoreError> {
        let _lock = self.lock()?;
        let mut submissions = self
            .read_all::<SubmissionRecord>(SUBMISSIONS_FILE)?
            .into_iter()
            .filter(|record| record.form_id == form_id)
            .map(SubmissionRecord::into_submission)
            .collect::<Result<Vec<_>, _>>()?;
        submissions.sort_by(|a, b| b.submitted.cmp(&a.submitted).then(b.id.cmp(&a.id)));
        Ok(submissions)
    }

    // ---- embedded contents ----

    pub fn create_content(&self, mut content: FormContent) -> Result<FormContent, StoreError> {
        let _lock = self.lock()?;
        self.find_form(content.form_id)?;

        let contents: Vec<FormContent> = self.read_all(CONTENTS_FILE)?;
        content.id = self.next_id(CONTENTS_FILE, &contents)?;
        self.append(CONTENTS_FILE, &content)?;

        info!("Stored form content {} for form {}", content.id, content.form_id);
        Ok(content)
    }

    pub fn get_content(&self, id: u64) -> Result<FormContent, StoreError> {
        let _lock = self.lock()?;
        self.read_all::<FormContent>(CONTENTS_FILE)?
            .into_iter()
            .find(|content| content.id == id)
            .ok_or(StoreError::NotFound { resource: "content", id })
    }

    pub fn list_contents(&self) -> Result<Vec<FormContent>, StoreError> {
        let _lock = self.lock()?;
        let mut contents: Vec<FormContent> = self.read_all(CONTENTS_FILE)?;
        contents.sort_by_key(|content| content.id);
        Ok(contents)
    }

    pub fn delete_content(&self, id: u64) -> Result<(), StoreError> {
        let _lock = self.lock()?;
        let mut contents: Vec<FormContent> = self.read_all(CONTENTS_FILE)?;
        let before = contents.len();
        contents.retain(|content| content.id != id);
        if contents.len() == before {
            return Err(StoreError::NotFound { resource: "content", id });
        }
        self.write_all(CONTENTS_FILE, CONTENT_HEADERS, &contents)?;
        Ok(())
    }
}
