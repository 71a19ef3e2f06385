pub mod templates;
pub mod workspace;
