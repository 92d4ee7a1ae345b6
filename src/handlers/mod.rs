pub mod admin;
pub mod health;
pub mod pages;

use std::sync::Arc;

use crate::config::{AppConfig, FormDesignerSettings};
use crate::csrf::CsrfSigner;
use crate::services::binding::ContentBinding;
use crate::services::database::DatabaseService;
use crate::services::mailer::Mailer;
use crate::services::processing::FormProcessor;

// AppState struct containing shared resources
pub struct AppState {
    pub database: Arc<DatabaseService>,
    pub binding: ContentBinding,
    pub settings: Arc<FormDesignerSettings>,
    pub csrf: CsrfSigner,
    pub admin_auth_token: Option<String>,
}

impl AppState {
    /// Wire the store, processor and binding together from startup config.
    pub fn new(config: &AppConfig, database: Arc<DatabaseService>, mailer: Arc<dyn Mailer>) -> Self {
        let settings = Arc::new(config.designer.clone());
        let processor = FormProcessor::new(
            database.clone(),
            mailer,
            settings.default_from_email.clone(),
            settings.hidden_fields.clone(),
        );
        let binding = ContentBinding::new(database.clone(), Arc::new(processor), settings.clone());
        let csrf = match &config.csrf_secret {
            Some(secret) => CsrfSigner::new(secret),
            None => CsrfSigner::ephemeral(),
        };

        Self {
            database,
            binding,
            settings,
            csrf,
            admin_auth_token: config.admin_auth_token.clone(),
        }
    }
}
