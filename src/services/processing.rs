use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::models::field::FormField;
use crate::models::form::Form;
use crate::models::submission::FormSubmission;
use crate::models::values::CapturedData;
use crate::services::database::DatabaseService;
use crate::services::mailer::{Mailer, OutgoingMail};

pub const EMAIL_RECEIVED_MESSAGE: &str = "Thank you, your input has been received.";

/// What a hook did with a valid submission.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub submission: FormSubmission,
    /// Message for the submitter, if the hook has one.
    pub message: Option<String>,
}

/// Runs after a submission validated.
#[async_trait]
pub trait SubmissionHook: Send + Sync {
    async fn process(
        &self,
        form: &Form,
        fields: &[FormField],
        data: CapturedData,
        path: &str,
    ) -> Result<ProcessOutcome, StoreError>;
}

/// Stores the submission, then mails it when the form asks for that.
///
/// Mail delivery is best effort: a failed send is logged and the stored
/// submission stands.
pub struct FormProcessor {
    database: Arc<DatabaseService>,
    mailer: Arc<dyn Mailer>,
    from_email: String,
    hidden_fields: Vec<String>,
}

impl FormProcessor {
    pub fn new(
        database: Arc<DatabaseService>,
        mailer: Arc<dyn Mailer>,
        from_email: impl Into<String>,
        hidden_fields: Vec<String>,
    ) -> Self {
        Self {
            database,
            mailer,
            from_email: from_email.into(),
            hidden_fields,
        }
    }

    async fn notify(&self, form: &Form, fields: &[FormField], submission: &FormSubmission, recipient: &str) {
        let mail = OutgoingMail {
            subject: form.title.clone(),
            body: submission.formatted_data(fields, false, &self.hidden_fields),
            from: self.from_email.clone(),
            to: vec![recipient.to_string()],
        };
        match self.mailer.send_mail(&mail).await {
            Ok(()) => info!("Sent notification for submission {} to {}", submission.id, recipient),
            Err(e) => warn!(
                "Failed to send notification for submission {}: {}",
                submission.id, e
            ),
        }
    }
}

#[async_trait]
impl SubmissionHook for FormProcessor {
    async fn process(
        &self,
        form: &Form,
        fields: &[FormField],
        data: CapturedData,
        path: &str,
    ) -> Result<ProcessOutcome, StoreError> {
        let submission = self.database.create_submission(form.id, path, data, Utc::now())?;

        let config = form.config();
        if !config.contains("email") {
            return Ok(ProcessOutcome {
                submission,
                message: None,
            });
        }

        // Rows stored before addresses were validated can lack one
        let Some(recipient) = config.email_recipient() else {
            warn!("Form {} has e-mail enabled but no address", form.id);
            return Ok(ProcessOutcome {
                submission,
                message: None,
            });
        };
        self.notify(form, fields, &submission, recipient).await;

        Ok(ProcessOutcome {
            submission,
            message: Some(EMAIL_RECEIVED_MESSAGE.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MailError;
    use crate::models::field_types::FieldType;
    use crate::models::values::FieldValue;
    use crate::services::mailer::MockMailer;
    use tempfile::{tempdir, TempDir};

    fn setup(config_json: &str) -> (TempDir, Arc<DatabaseService>, Form, Vec<FormField>) {
        let dir = tempdir().unwrap();
        let db = Arc::new(DatabaseService::new(dir.path()).unwrap());
        let mut form = Form::new("Contact");
        form.config_json = config_json.to_string();
        let form = db.create_form(form).unwrap();
        let field = db
            .create_field(
                form.id,
                FormField {
                    id: 0,
                    form_id: 0,
                    ordering: 0,
                    title: "Name".to_string(),
                    name: "name".to_string(),
                    field_type: FieldType::Text,
                    choices: String::new(),
                    help_text: String::new(),
                    is_required: true,
                },
            )
            .unwrap();
        (dir, db, form, vec![field])
    }

    fn data() -> CapturedData {
        let mut data = CapturedData::new();
        data.insert("name", FieldValue::Text("Ada".to_string()));
        data
    }

    #[tokio::test]
    async fn test_failed_mail_still_stores_one_submission() {
        let (_dir, db, form, fields) = setup(r#"{"email": {"email": "team@example.com"}}"#);

        let mut mailer = MockMailer::new();
        mailer
            .expect_send_mail()
            .withf(|mail| {
                mail.subject == "Contact"
                    && mail.body == "Name: Ada\n"
                    && mail.from == "noreply@example.com"
                    && mail.to == vec!["team@example.com".to_string()]
            })
            .times(1)
            .returning(|_| Err(MailError::Rejected(502)));

        let processor = FormProcessor::new(db.clone(), Arc::new(mailer), "noreply@example.com", Vec::new());
        let outcome = processor.process(&form, &fields, data(), "/contact/").await.unwrap();

        assert_eq!(outcome.message.as_deref(), Some(EMAIL_RECEIVED_MESSAGE));
        let stored = db.submissions_for_form(form.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].path, "/contact/");
        assert_eq!(stored[0].data, data());
    }

    #[tokio::test]
    async fn test_successful_mail_sends_once() {
        let (_dir, db, form, fields) = setup(r#"{"email": {"email": "team@example.com"}}"#);

        let mut mailer = MockMailer::new();
        mailer.expect_send_mail().times(1).returning(|_| Ok(()));

        let processor = FormProcessor::new(db.clone(), Arc::new(mailer), "noreply@example.com", Vec::new());
        processor.process(&form, &fields, data(), "/contact/").await.unwrap();
        assert_eq!(db.submissions_for_form(form.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_hidden_fields_stay_out_of_mail() {
        let (_dir, db, form, fields) = setup(r#"{"email": {"email": "team@example.com"}}"#);

        let mut mailer = MockMailer::new();
        mailer
            .expect_send_mail()
            .withf(|mail| mail.body.is_empty())
            .times(1)
            .returning(|_| Ok(()));

        let processor = FormProcessor::new(db, Arc::new(mailer), "noreply@example.com", vec!["Name".to_string()]);
        processor.process(&form, &fields, data(), "/contact/").await.unwrap();
    }

    #[tokio::test]
    async fn test_no_email_config_means_no_mail_and_no_message() {
        let (_dir, db, form, fields) = setup("");

        let mut mailer = MockMailer::new();
        mailer.expect_send_mail().times(0);

        let processor = FormProcessor::new(db.clone(), Arc::new(mailer), "noreply@example.com", Vec::new());
        let outcome = processor.process(&form, &fields, data(), "/contact/").await.unwrap();

        assert_eq!(outcome.message, None);
        assert_eq!(outcome.submission.form_id, form.id);
        assert_eq!(db.submissions_for_form(form.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_email_option_without_address_sends_nothing_and_acknowledges_nothing() {
        let (_dir, db, stored, fields) = setup("");
        // Shaped like a row saved before addresses were validated
        let form = Form {
            config_json: r#"{"email": {}}"#.to_string(),
            ..stored
        };

        let mut mailer = MockMailer::new();
        mailer.expect_send_mail().times(0);

        let processor = FormProcessor::new(db.clone(), Arc::new(mailer), "noreply@example.com", Vec::new());
        let outcome = processor.process(&form, &fields, data(), "/contact/").await.unwrap();

        assert_eq!(outcome.message, None);
        assert_eq!(db.submissions_for_form(form.id).unwrap().len(), 1);
    }
}
