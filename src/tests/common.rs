use axum_test::{TestServer, TestServerConfig};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::models::content::FormContent;
use crate::models::field::FormField;
use crate::models::field_types::FieldType;
use crate::models::form::Form;
use crate::render::CSRF_FIELD_NAME;
use crate::routes::create_router;
use crate::services::database::DatabaseService;
use crate::services::mailer::{LogMailer, Mailer};

pub struct TestApp {
    pub server: TestServer,
    pub database: Arc<DatabaseService>,
    // Keeps the CSV directory alive for the test's duration
    _dir: TempDir,
}

// Helper function to set up a test server around a fresh CSV store
pub fn setup_app(config: AppConfig, mailer: Arc<dyn Mailer>) -> TestApp {
    let dir = tempdir().unwrap();
    let database = Arc::new(DatabaseService::new(dir.path()).unwrap());

    let app_state = Arc::new(AppState::new(&config, Arc::clone(&database), mailer));
    let router = create_router(app_state, config.is_production);

    let server_config = TestServerConfig::builder().mock_transport().build();
    let server = TestServer::new_with_config(router, server_config).unwrap();

    TestApp {
        server,
        database,
        _dir: dir,
    }
}

pub fn setup_default_app() -> TestApp {
    setup_app(AppConfig::default(), Arc::new(LogMailer))
}

pub fn field(ordering: i32, name: &str, title: &str, field_type: FieldType, choices: &str) -> FormField {
    FormField {
        id: 0,
        form_id: 0,
        ordering,
        title: title.to_string(),
        name: name.to_string(),
        field_type,
        choices: choices.to_string(),
        help_text: String::new(),
        is_required: true,
    }
}

/// A contact form with e-mail, name and topic fields, embedded once.
pub fn seed_contact_form(database: &DatabaseService, config_json: &str) -> (Form, FormContent) {
    let mut form = Form::new("Contact");
    form.config_json = config_json.to_string();
    let form = database.create_form(form).unwrap();

    database
        .create_field(form.id, field(1, "email", "E-mail", FieldType::Email, ""))
        .unwrap();
    database
        .create_field(form.id, field(0, "name", "Name", FieldType::Text, ""))
        .unwrap();
    database
        .create_field(form.id, field(2, "topic", "Topic", FieldType::Select, "Sales, Support"))
        .unwrap();

    let content = database
        .create_content(FormContent {
            id: 0,
            form_id: form.id,
            show_form_title: true,
            success_message: String::new(),
        })
        .unwrap();
    (form, content)
}

/// Pull the hidden CSRF token out of a rendered page.
pub fn csrf_token(html: &str) -> String {
    let marker = format!(r#"name="{}" value=""#, CSRF_FIELD_NAME);
    let start = html.find(&marker).expect("page carries a CSRF token") + marker.len();
    let end = html[start..].find('"').unwrap() + start;
    html[start..end].to_string()
}
