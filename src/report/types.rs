use crate::signature::MethodChange;

/// Header written once at the top of a fresh report.
pub const CSV_HEADER: &str = "Commit SHA,Java File,Old function signature,New function signature";

/// One line of the CSV report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// Commit in which the new signature appears
    pub commit_sha: String,
    /// Repository-relative file path
    pub file_path: String,
    /// Old signature without its depth prefix (e.g. "int:add:int")
    pub old_signature: String,
    /// New signature without its depth prefix (e.g. "int:add:int,int")
    pub new_signature: String,
}

impl ReportRow {
    pub fn from_change(commit_sha: &str, file_path: &str, change: &MethodChange) -> Self {
        Self {
            commit_sha: commit_sha.to_string(),
            file_path: file_path.to_string(),
            old_signature: change.old_signature.report_text(),
            new_signature: change.new_signature.report_text(),
        }
    }

    /// `sha,"path","old","new"` with embedded quotes doubled.
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{}",
            self.commit_sha,
            quoted(&self.file_path),
            quoted(&self.old_signature),
            quoted(&self.new_signature)
        )
    }
}

fn quoted(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::MethodSignature;

    #[test]
    fn test_row_from_change() {
        let change = MethodChange {
            old_signature: MethodSignature::new(3, "int", "add", vec!["int".into()]),
            new_signature: MethodSignature::new(3, "int", "add", vec!["int".into(), "int".into()]),
        };
        let row = ReportRow::from_change("abc123", "src/Calc.java", &change);
        assert_eq!(
            row.to_csv_line(),
            "abc123,\"src/Calc.java\",\"int:add:int\",\"int:add:int,int\""
        );
    }

    #[test]
    fn test_quotes_are_escaped() {
        let row = ReportRow {
            commit_sha: "s".to_string(),
            file_path: "weird\"name.java".to_string(),
            old_signature: "void:f:".to_string(),
            new_signature: "void:f:int".to_string(),
        };
        assert_eq!(
            row.to_csv_line(),
            "s,\"weird\"\"name.java\",\"void:f:\",\"void:f:int\""
        );
    }
}
