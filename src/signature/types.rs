use std::fmt;

/// A method declaration as seen by the diff engine.
///
/// Types are kept as their raw textual spelling. `scope_depth` is the number
/// of syntactic ancestors of the declaration and stands in for the owning
/// type, so two methods with different owners at the same depth share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    /// Count of enclosing syntax nodes from the file root
    pub scope_depth: usize,
    /// Declared return type (e.g. "int", "List<String>", "void")
    pub return_type: String,
    /// Simple method name
    pub name: String,
    /// Parameter types in declaration order
    pub parameters: Vec<String>,
}

impl MethodSignature {
    pub fn new(
        scope_depth: usize,
        return_type: impl Into<String>,
        name: impl Into<String>,
        parameters: Vec<String>,
    ) -> Self {
        Self {
            scope_depth,
            return_type: return_type.into(),
            name: name.into(),
            parameters,
        }
    }

    /// The part of the signature used to match a method across revisions.
    pub fn key(&self) -> SignatureKey {
        SignatureKey(format!(
            "{}:{}:{}:",
            self.scope_depth, self.return_type, self.name
        ))
    }

    /// Signature text without the leading depth, as written to the report.
    pub fn report_text(&self) -> String {
        format!(
            "{}:{}:{}",
            self.return_type,
            self.name,
            self.parameters.join(",")
        )
    }
}

/// `depth:returnType:name:param1,param2,...`
impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope_depth, self.report_text())
    }
}

/// Signature text truncated before the parameter segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureKey(String);

impl fmt::Display for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A method whose parameter list grew between two revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodChange {
    pub old_signature: MethodSignature,
    pub new_signature: MethodSignature,
}
