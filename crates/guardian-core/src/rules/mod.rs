pub mod content;
pub mod form;
pub mod hostname;
