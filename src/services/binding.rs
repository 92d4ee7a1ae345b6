use std::sync::Arc;
use tracing::{debug, info};

use crate::config::FormDesignerSettings;
use crate::error::StoreError;
use crate::forms::request::{FormPayload, RequestInfo};
use crate::models::content::FormContent;
use crate::render::{render_form, render_message, PageContext};
use crate::services::database::DatabaseService;
use crate::services::processing::SubmissionHook;

/// A page request aimed at one embedded form.
#[derive(Debug, Clone, Default)]
pub struct ContentRequest {
    pub info: RequestInfo,
    pub payload: FormPayload,
    /// Token to embed in a rendered form, if the page uses one.
    pub csrf_token: Option<String>,
}

/// Which state the embedded form ended up in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The form, fresh or with inline errors.
    Display(String),
    /// The post-submission message.
    Submitted(String),
}

impl RenderOutcome {
    pub fn html(&self) -> &str {
        match self {
            RenderOutcome::Display(html) | RenderOutcome::Submitted(html) => html,
        }
    }

    pub fn into_html(self) -> String {
        match self {
            RenderOutcome::Display(html) | RenderOutcome::Submitted(html) => html,
        }
    }
}

/// Drives display, validation and processing for embedded forms.
pub struct ContentBinding {
    database: Arc<DatabaseService>,
    hook: Arc<dyn SubmissionHook>,
    settings: Arc<FormDesignerSettings>,
}

impl ContentBinding {
    pub fn new(
        database: Arc<DatabaseService>,
        hook: Arc<dyn SubmissionHook>,
        settings: Arc<FormDesignerSettings>,
    ) -> Self {
        Self {
            database,
            hook,
            settings,
        }
    }

    pub async fn render(
        &self,
        content: &FormContent,
        request: &ContentRequest,
    ) -> Result<RenderOutcome, StoreError> {
        let form = self.database.get_form(content.form_id)?;
        let fields = self.database.fields_for_form(form.id)?;

        let mut runtime = form.as_runtime_form(&fields, &self.settings.form_bases)?;
        if self.settings.pass_request {
            runtime = runtime.with_request(request.info.clone());
        }
        let prefix = content.prefix();

        let ctx = PageContext {
            content,
            form_title: &form.title,
            action: &request.info.path,
            csrf_token: request.csrf_token.as_deref(),
        };

        let instance = if request.info.is_submission() {
            let instance = runtime.bind(&request.payload, Some(&prefix));
            if let Some(data) = instance.cleaned_data() {
                let outcome = self
                    .hook
                    .process(&form, &fields, data.clone(), &request.info.path)
                    .await?;
                info!(
                    "Content {} accepted submission {} for form {}",
                    content.id, outcome.submission.id, form.id
                );

                let message = if content.success_message.is_empty() {
                    outcome.message.unwrap_or_default()
                } else {
                    content.success_message.clone()
                };
                return Ok(RenderOutcome::Submitted(render_message(&ctx, &message)));
            }
            debug!("Content {} redisplaying form {} with errors", content.id, form.id);
            instance
        } else {
            runtime.unbound(Some(&prefix))
        };

        Ok(RenderOutcome::Display(render_form(&ctx, &instance)))
    }
}
