pub mod photo_store;
pub mod validation;
