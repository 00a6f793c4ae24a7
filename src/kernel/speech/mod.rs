pub mod recovery;

pub use recovery::{RecognitionErrorKind, RecognitionFailure, Recovery};
