pub mod form;

pub use form::{CollectedFields, DialogState, FormDirective, FormStep, Listen};
