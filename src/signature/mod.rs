pub mod diff;
pub mod java;
pub mod types;

pub use java::JavaSignatureParser;
pub use types::{MethodChange, MethodSignature};

use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Signature parser unavailable: {0}")]
    Unavailable(String),

    #[error("Syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
}

/// Capability that turns a block of source text into method signatures.
///
/// Implementations must return signatures in source order; the diff engine
/// relies on encounter order to break ties between overloads.
pub trait SignatureParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<Vec<MethodSignature>, ParseError>;
}

/// Parses two revisions of a file and reports parameter-count growth.
pub struct SignatureDiffer {
    parser: Arc<dyn SignatureParser>,
}

impl SignatureDiffer {
    pub fn new(parser: Arc<dyn SignatureParser>) -> Self {
        Self { parser }
    }

    /// Diff the new revision against the old one.
    ///
    /// A parse failure on either side fails the whole file; the caller
    /// decides whether that is fatal.
    pub fn diff(&self, new_text: &str, old_text: &str) -> Result<Vec<MethodChange>, ParseError> {
        let new_signatures = self.parser.parse(new_text)?;
        let old_signatures = self.parser.parse(old_text)?;
        Ok(diff::diff_signatures(&new_signatures, &old_signatures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OLD: &str = r#"
public class Calculator {
    int add(int a) { return a; }
}
"#;

    const NEW: &str = r#"
public class Calculator {
    int add(int a, int b) { return a + b; }
}
"#;

    fn differ() -> SignatureDiffer {
        SignatureDiffer::new(Arc::new(JavaSignatureParser::new()))
    }

    #[test]
    fn test_diff_reports_added_parameter() {
        let changes = differ().diff(NEW, OLD).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_signature.report_text(), "int:add:int");
        assert_eq!(changes[0].new_signature.report_text(), "int:add:int,int");
        assert_eq!(
            changes[0].old_signature.scope_depth,
            changes[0].new_signature.scope_depth
        );
    }

    #[test]
    fn test_diff_identical_text_has_no_changes() {
        assert!(differ().diff(OLD, OLD).unwrap().is_empty());
    }

    #[test]
    fn test_diff_fails_on_broken_revision() {
        let broken = "public class Calculator { int add(int a { return a; }";
        assert!(matches!(
            differ().diff(broken, OLD),
            Err(ParseError::Syntax { .. })
        ));
        assert!(differ().diff(NEW, broken).is_err());
    }
}
