//! Parsers for the semi-structured text the machine and engine CLIs print.
mod inspect;
mod shell_env;

pub use inspect::{InspectionNode, first_element, lookup, lookup_dotted, parse_inspection};
pub use shell_env::parse_export_script;
