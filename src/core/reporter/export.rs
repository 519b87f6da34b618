//! JSON export of analysis reports.

use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Write any report value as pretty JSON followed by a newline
pub fn export_json<T: Serialize + ?Sized, W: Write>(value: &T, mut writer: W) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()
}

/// Export a report value to a file, replacing any existing file
pub fn export_to_file<T: Serialize + ?Sized>(value: &T, path: &Path) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    export_json(value, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reporter::fixtures::report;
    use crate::core::reporter::AnalysisReport;
    use tempfile::TempDir;

    #[test]
    fn json_export_uses_stable_field_names() {
        let mut output = Vec::new();
        export_json(&report(0.8, Some(0.4)), &mut output).unwrap();

        let json = String::from_utf8(output).unwrap();
        for field in [
            "\"confidence\"",
            "\"is_similar\"",
            "\"best_method\"",
            "\"scores\"",
            "\"change_magnitude\"",
            "\"significant_change\"",
            "\"regions\"",
        ] {
            assert!(json.contains(field), "missing {}", field);
        }
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn export_to_file_writes_readable_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let original = report(0.6, None);

        export_to_file(&original, &path).unwrap();

        let restored: AnalysisReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn export_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("report.json");
        assert!(export_to_file(&report(0.6, None), &path).is_err());
    }
}
