use serde::{Deserialize, Serialize};

fn default_show_form_title() -> bool {
    true
}

/// A form embedded in a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormContent {
    #[serde(default)]
    pub id: u64,
    pub form_id: u64,
    #[serde(default = "default_show_form_title")]
    pub show_form_title: bool,
    /// Shown after a valid submission instead of the processing message.
    #[serde(default)]
    pub success_message: String,
}

impl FormContent {
    /// Prefix applied to every input name, so several embedded forms can
    /// share one page.
    pub fn prefix(&self) -> String {
        format!("fc{}", self.id)
    }
}
