use indexmap::IndexMap;
use tracing::debug;

use crate::forms::bases::SharedBase;
use crate::forms::field::RuntimeField;
use crate::forms::request::{FormPayload, RequestInfo};
use crate::models::values::CapturedData;
use crate::render::escape;

/// The validator set synthesized from a form's stored fields.
///
/// Fields keep the order they were supplied in; that order drives both
/// rendering and the key order of the cleaned data.
#[derive(Debug, Clone)]
pub struct RuntimeForm {
    fields: IndexMap<String, RuntimeField>,
    bases: Vec<SharedBase>,
    request: Option<RequestInfo>,
}

impl RuntimeForm {
    pub fn new(fields: impl IntoIterator<Item = (String, RuntimeField)>, bases: Vec<SharedBase>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            bases,
            request: None,
        }
    }

    /// Thread the inbound request into the form so bases can inspect it.
    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = Some(request);
        self
    }

    pub fn fields(&self) -> &IndexMap<String, RuntimeField> {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn field(&self, name: &str) -> Option<&RuntimeField> {
        self.fields.get(name)
    }

    pub fn bases(&self) -> &[SharedBase] {
        &self.bases
    }

    pub fn request(&self) -> Option<&RequestInfo> {
        self.request.as_ref()
    }

    pub fn unbound(self, prefix: Option<&str>) -> FormInstance {
        FormInstance {
            form: self,
            prefix: prefix.map(str::to_string),
            raw: IndexMap::new(),
            bound: false,
            errors: IndexMap::new(),
            non_field_errors: Vec::new(),
            cleaned: None,
        }
    }

    /// Bind posted values and validate them right away.
    pub fn bind(self, payload: &FormPayload, prefix: Option<&str>) -> FormInstance {
        let mut instance = self.unbound(prefix);
        instance.bound = true;

        let mut cleaned = CapturedData::new();
        for (name, field) in &instance.form.fields {
            let raw = payload.get_all(&instance.html_name(name));
            match field.clean(&raw) {
                Ok(value) => cleaned.insert(name.clone(), value),
                Err(message) => {
                    instance.errors.insert(name.clone(), vec![message]);
                }
            }
            instance.raw.insert(name.clone(), raw);
        }

        if instance.errors.is_empty() {
            for base in &instance.form.bases {
                if let Err(messages) = base.clean(&cleaned, instance.form.request.as_ref()) {
                    debug!("Form base '{}' rejected submission", base.name());
                    instance.non_field_errors = messages;
                    break;
                }
            }
        }

        if instance.errors.is_empty() && instance.non_field_errors.is_empty() {
            instance.cleaned = Some(cleaned);
        }
        instance
    }
}

/// One bound or unbound form, as handed to the renderer.
#[derive(Debug, Clone)]
pub struct FormInstance {
    form: RuntimeForm,
    prefix: Option<String>,
    raw: IndexMap<String, Vec<String>>,
    bound: bool,
    errors: IndexMap<String, Vec<String>>,
    non_field_errors: Vec<String>,
    cleaned: Option<CapturedData>,
}

impl FormInstance {
    pub fn html_name(&self, field_name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}-{}", prefix, field_name),
            None => field_name.to_string(),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn is_valid(&self) -> bool {
        self.bound && self.cleaned.is_some()
    }

    pub fn cleaned_data(&self) -> Option<&CapturedData> {
        self.cleaned.as_ref()
    }

    pub fn into_cleaned_data(self) -> Option<CapturedData> {
        self.cleaned
    }

    pub fn errors_for(&self, field_name: &str) -> &[String] {
        self.errors.get(field_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || !self.non_field_errors.is_empty()
    }

    pub fn non_field_errors(&self) -> &[String] {
        &self.non_field_errors
    }

    pub fn form(&self) -> &RuntimeForm {
        &self.form
    }

    fn raw_values(&self, field_name: &str) -> &[String] {
        self.raw.get(field_name).map(Vec::as_slice).unwrap_or(&[])
    }

    fn error_list(class: &str, messages: &[String]) -> String {
        if messages.is_empty() {
            return String::new();
        }
        let items: String = messages
            .iter()
            .map(|message| format!("<li>{}</li>", escape(message)))
            .collect();
        format!(r#"<ul class="{}">{}</ul>"#, class, items)
    }

    /// Render every field as a paragraph, errors inline.
    pub fn as_p(&self) -> String {
        let mut html = Self::error_list("errorlist nonfield", &self.non_field_errors);

        for (name, field) in self.form.fields() {
            let html_name = self.html_name(name);
            html.push_str(&Self::error_list("errorlist", self.errors_for(name)));
            html.push_str(&format!(
                r#"<p><label for="id_{}">{}:</label> {}"#,
                escape(&html_name),
                escape(&field.label),
                field.render_widget(&html_name, self.raw_values(name))
            ));
            if let Some(help_text) = &field.help_text {
                html.push_str(&format!(
                    r#" <span class="helptext">{}</span>"#,
                    escape(help_text)
                ));
            }
            html.push_str("</p>\n");
        }
        html
    }
}
