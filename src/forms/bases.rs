//! Form bases: the behaviors every synthesized form inherits.
//!
//! A deployment lists base names in `FORM_DESIGNER_CLASSES`. At least one of
//! them has to be form-capable; when none is, the generic `form` base is
//! appended.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::ConfigError;
use crate::forms::request::RequestInfo;
use crate::models::values::CapturedData;

pub trait FormBase: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Whether this base provides the full form behavior on its own.
    fn is_form_capable(&self) -> bool {
        false
    }

    /// Form-wide validation run after every field cleaned successfully.
    fn clean(&self, _data: &CapturedData, _request: Option<&RequestInfo>) -> Result<(), Vec<String>> {
        Ok(())
    }
}

pub type SharedBase = Arc<dyn FormBase>;

/// The plain form. No extra checks.
#[derive(Debug, Default)]
pub struct GenericForm;

impl FormBase for GenericForm {
    fn name(&self) -> &'static str {
        "form"
    }

    fn is_form_capable(&self) -> bool {
        true
    }
}

/// Rejects submissions where every field was left empty.
#[derive(Debug, Default)]
pub struct NonEmptyForm;

impl FormBase for NonEmptyForm {
    fn name(&self) -> &'static str {
        "non_empty"
    }

    fn clean(&self, data: &CapturedData, _request: Option<&RequestInfo>) -> Result<(), Vec<String>> {
        if !data.is_empty() && data.iter().all(|(_, value)| value.is_blank()) {
            return Err(vec!["Please fill in at least one field.".to_string()]);
        }
        Ok(())
    }
}

/// Rejects cross-origin posts. Needs the request threaded into the form.
#[derive(Debug, Default)]
pub struct SameOriginForm;

fn origin_host(origin: &str) -> &str {
    let without_scheme = origin.split_once("://").map_or(origin, |(_, rest)| rest);
    without_scheme.split('/').next().unwrap_or(without_scheme)
}

impl FormBase for SameOriginForm {
    fn name(&self) -> &'static str {
        "same_origin"
    }

    fn clean(&self, _data: &CapturedData, request: Option<&RequestInfo>) -> Result<(), Vec<String>> {
        let Some(request) = request else {
            return Ok(());
        };
        match (&request.origin, &request.host) {
            (Some(origin), Some(host)) if !origin_host(origin).eq_ignore_ascii_case(host) => {
                debug!("Rejecting cross-origin post from {} to {}", origin, host);
                Err(vec!["This form can only be submitted from its own site.".to_string()])
            }
            _ => Ok(()),
        }
    }
}

pub fn lookup_base(name: &str) -> Option<SharedBase> {
    match name {
        "form" => Some(Arc::new(GenericForm)),
        "non_empty" => Some(Arc::new(NonEmptyForm)),
        "same_origin" => Some(Arc::new(SameOriginForm)),
        _ => None,
    }
}

pub fn default_bases() -> Vec<SharedBase> {
    vec![Arc::new(GenericForm)]
}

/// Parse a comma-separated list of base names.
pub fn parse_bases(list: &str) -> Result<Vec<SharedBase>, ConfigError> {
    let mut bases = Vec::new();
    for name in list.split(',').map(str::trim) {
        if name.is_empty() {
            return Err(ConfigError::EmptyBaseName);
        }
        let base = lookup_base(name).ok_or_else(|| ConfigError::UnknownBase(name.to_string()))?;
        bases.push(base);
    }

    if !bases.iter().any(|base| base.is_form_capable()) {
        bases.push(Arc::new(GenericForm));
    }
    Ok(bases)
}
