pub mod bases;
pub mod field;
pub mod form;
pub mod request;
