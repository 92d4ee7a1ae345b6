pub mod content;
pub mod field;
pub mod field_types;
pub mod form;
pub mod submission;
pub mod values;
