pub mod encoding;
pub mod error;
pub mod filter;
pub mod lines;
pub mod parser;

pub use encoding::classifier::{classify, Detection, Verdict};
pub use encoding::codepage::CodePage;
pub use encoding::{load_lines, DecodedText, TextLine};
pub use error::{Result, TextrakeError};
pub use filter::{filter_lines, FilterOutcome, LineFilter};
pub use lines::split_lines;
pub use parser::schema::{schema_from_json, schema_to_json, FieldDef, FieldFormat, FieldType};
pub use parser::value::{FieldValue, Record};
pub use parser::{read_fields, ParseOutcome};
