use clap::ValueEnum;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::literal::Literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Python data literal for the model importer
    #[default]
    Literal,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Literal => "py",
            OutputFormat::Json => "json",
        }
    }

    pub fn render(&self, document: &Literal) -> Result<String> {
        match self {
            OutputFormat::Literal => Ok(document.render()),
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(document)?;
                json.push('\n');
                Ok(json)
            }
        }
    }
}

/// Where a rendered document goes.
pub enum Destination<'a> {
    Stdout,
    Directory(&'a Path),
}

/// Writes `<bundle>_<kind>.<ext>` into the destination directory, or to
/// stdout. Returns the file path when one was written.
pub fn write_document(
    document: &Literal,
    format: OutputFormat,
    destination: Destination,
    bundle: &str,
    kind: &str,
) -> Result<Option<PathBuf>> {
    let rendered = format.render(document)?;

    match destination {
        Destination::Stdout => {
            print_to(&mut std::io::stdout().lock(), &rendered)?;
            Ok(None)
        }
        Destination::Directory(dir) => {
            let path = dir.join(format!("{bundle}_{kind}.{}", format.extension()));
            std::fs::write(&path, rendered)?;
            info!(path = %path.display(), "wrote {kind}");
            Ok(Some(path))
        }
    }
}

fn print_to<W: Write>(out: &mut W, rendered: &str) -> Result<()> {
    out.write_all(rendered.as_bytes())?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Literal {
        Literal::map().entry("identifier", Literal::str("bt5")).build()
    }

    #[test]
    fn writes_literal_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_document(
            &doc(),
            OutputFormat::Literal,
            Destination::Directory(dir.path()),
            "indie_bundle_7",
            "contentevents",
        )
        .unwrap()
        .unwrap();

        assert_eq!(path, dir.path().join("indie_bundle_7_contentevents.py"));
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(written, "{\n  'identifier': 'bt5',\n}\n");
    }

    #[test]
    fn writes_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_document(
            &doc(),
            OutputFormat::Json,
            Destination::Directory(dir.path()),
            "indie_bundle_7",
            "splits",
        )
        .unwrap()
        .unwrap();

        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["identifier"], "bt5");
    }

    #[test]
    fn stdout_writes_no_file() {
        let written = write_document(
            &doc(),
            OutputFormat::Json,
            Destination::Stdout,
            "indie_bundle_7",
            "splits",
        )
        .unwrap();

        assert_eq!(written, None);
    }

    #[test]
    fn printed_document_matches_rendering() {
        let rendered = OutputFormat::Literal.render(&doc()).unwrap();
        let mut out: Vec<u8> = Vec::new();
        print_to(&mut out, &rendered).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "{\n  'identifier': 'bt5',\n}\n");
    }

    #[test]
    fn missing_directory_is_io_error() {
        let err = write_document(
            &doc(),
            OutputFormat::Literal,
            Destination::Directory(Path::new("/nonexistent/sotb-out")),
            "b",
            "splits",
        )
        .unwrap_err();

        assert!(matches!(err, crate::error::SotbError::Io(_)));
    }
}
