pub mod date;
pub mod parser;
pub mod types;

pub use date::parse_date;
pub use parser::{parse, IntentParser};
pub use types::{EventQuery, Intent, IntentKind};
