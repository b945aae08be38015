//! Definition file loading

use super::{Definition, LoadError, validate};
use serde::Deserialize;
use std::path::Path;

/// Load a definition file and reject it if validation finds any error
pub fn load(path: &Path) -> Result<Definition, LoadError> {
    let def = load_unvalidated(path)?;

    let errors = validate(&def);
    if !errors.is_empty() {
        tracing::warn!(
            path = %path.display(),
            errors = errors.len(),
            "Workflow definition failed validation"
        );
        return Err(LoadError::Invalid { errors });
    }

    Ok(def)
}

/// Load a definition file without validating it
///
/// Used by tooling that reports validation errors instead of aborting on them.
pub fn load_unvalidated(path: &Path) -> Result<Definition, LoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let def = parse_definition(&contents).map_err(|e| match e {
        ParseFailure::Json(source) => LoadError::Parse {
            path: path.to_path_buf(),
            source,
        },
        ParseFailure::TrailingData => LoadError::TrailingData {
            path: path.to_path_buf(),
        },
    })?;

    tracing::debug!(
        path = %path.display(),
        workflows = def.workflows.len(),
        "Loaded workflow definition"
    );

    Ok(def)
}

#[derive(Debug)]
enum ParseFailure {
    Json(serde_json::Error),
    TrailingData,
}

/// Decode exactly one JSON value, tolerating comments
fn parse_definition(contents: &str) -> Result<Definition, ParseFailure> {
    let json = strip_json_comments(contents);
    let mut de = serde_json::Deserializer::from_str(&json);

    let def = Definition::deserialize(&mut de).map_err(ParseFailure::Json)?;
    de.end().map_err(|_| ParseFailure::TrailingData)?;

    Ok(def)
}

/// Replace `//` and `/* */` comments outside of strings with whitespace
///
/// Newlines are kept so decode errors still point at the right line.
fn strip_json_comments(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut in_string = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
                result.push(c);
            }
            continue;
        }

        if in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block_comment = false;
                result.push(' ');
            } else if c == '\n' {
                result.push(c);
            }
            continue;
        }

        if in_string {
            result.push(c);
            if c == '"' {
                in_string = false;
            } else if c == '\\' {
                if let Some(escaped) = chars.next() {
                    result.push(escaped);
                }
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                result.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                chars.next();
                in_line_comment = true;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                in_block_comment = true;
            }
            _ => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationCode;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("workflow.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", contents).unwrap();
        path
    }

    #[test]
    fn test_load_definition_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            r#"{
                "env": { "APP_ID": "123" },
                "before_all": "echo start",
                "after_all": "echo done",
                "error": "echo failed",
                "workflows": {
                    "beta": {
                        "description": "Ship a beta",
                        "env": { "GROUP": "internal" },
                        "steps": [
                            { "name": "build", "run": "make build" },
                            { "name": "upload", "workflow": "upload", "with": { "TRACK": "beta" }, "if": "UPLOAD" }
                        ]
                    },
                    "upload": {
                        "private": true,
                        "steps": [{ "run": "echo uploading" }]
                    }
                }
            }"#,
        );

        let def = load(&path).unwrap();
        assert_eq!(def.env["APP_ID"], "123");
        assert_eq!(def.before_all, "echo start");
        assert_eq!(def.error, "echo failed");

        let beta = def.get_workflow("beta").unwrap();
        assert_eq!(beta.description, "Ship a beta");
        assert_eq!(beta.steps.len(), 2);
        assert_eq!(beta.steps[1].condition_var(), Some("UPLOAD"));
        assert!(def.get_workflow("upload").unwrap().private);
    }

    #[test]
    fn test_load_with_comments() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            r#"// release automation
            {
                /* shared */
                "workflows": {
                    "beta": {
                        "steps": [
                            { "run": "curl https://example.com/x" } // url stays intact
                        ]
                    }
                }
            }"#,
        );

        let def = load(&path).unwrap();
        assert_eq!(
            def.workflows["beta"].steps[0].run.as_deref(),
            Some("curl https://example.com/x")
        );
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = load_unvalidated(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            r#"{ "workflows": { "beta": { "steps": [{ "run": "x", "timeout": 5 }] } } }"#,
        );
        let err = load_unvalidated(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(err.to_string().contains("timeout"));

        let path = write_file(&dir, r#"{ "workflows": {}, "version": 2 }"#);
        assert!(matches!(
            load_unvalidated(&path).unwrap_err(),
            LoadError::Parse { .. }
        ));

        let path = write_file(
            &dir,
            r#"{ "workflows": { "beta": { "steps": [{ "run": "x" }], "timeout": 1 } } }"#,
        );
        let err = load_unvalidated(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, r#"{ "workflows": "#);
        assert!(matches!(
            load_unvalidated(&path).unwrap_err(),
            LoadError::Parse { .. }
        ));
    }

    #[test]
    fn test_trailing_data_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, r#"{ "workflows": {} } { "workflows": {} }"#);
        assert!(matches!(
            load_unvalidated(&path).unwrap_err(),
            LoadError::TrailingData { .. }
        ));

        // Trailing whitespace and comments are fine
        let path = write_file(&dir, "{ \"workflows\": {} }\n\n// end\n");
        assert!(load_unvalidated(&path).is_ok());
    }

    #[test]
    fn test_load_fails_closed_on_validation() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            r#"{ "workflows": { "beta": { "steps": [] }, "A": { "steps": [{ "workflow": "gone" }] } } }"#,
        );

        let err = load(&path).unwrap_err();
        let codes: Vec<_> = err.validation_errors().iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![ValidationCode::WorkflowNotFound, ValidationCode::EmptySteps]
        );

        // Unvalidated load still hands back the definition
        let def = load_unvalidated(&path).unwrap();
        assert_eq!(def.workflows.len(), 2);
    }

    #[test]
    fn test_strip_json_comments() {
        assert_eq!(strip_json_comments("{} // c"), "{} ");
        assert_eq!(strip_json_comments("{/* a */}"), "{ }");
        assert_eq!(strip_json_comments("[1,/*\n*/2]"), "[1,\n 2]");
        assert_eq!(
            strip_json_comments(r#"{"a": "/* not */ // a comment"}"#),
            r#"{"a": "/* not */ // a comment"}"#
        );
        assert_eq!(
            strip_json_comments(r#"{"a": "quote \" // still string"}"#),
            r#"{"a": "quote \" // still string"}"#
        );
    }
}
