pub mod binding;
pub mod database;
pub mod mailer;
pub mod processing;
