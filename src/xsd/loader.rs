//! Loading schema files from paths.
//!
//! A directory expands to its direct `*.xsd` children in name order. Files
//! are parsed one by one and merged in argument order, so a later file
//! overrides declarations of an earlier one.

use std::fs;
use std::path::{Path, PathBuf};

use super::parse_xsd;
use crate::error::{Error, Result};
use crate::schema::SchemaModel;

fn path_error(path: &Path, reason: impl Into<String>) -> Error {
    Error::SchemaPath { path: path.display().to_string(), reason: reason.into() }
}

fn is_xsd(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xsd"))
}

/// Expands `paths` into the list of schema files to read.
fn expand<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|e| path_error(path, e.to_string()))?;
        if meta.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(path)
                .map_err(|e| path_error(path, e.to_string()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_xsd(p))
                .collect();
            if found.is_empty() {
                return Err(path_error(path, "directory contains no .xsd files"));
            }
            found.sort();
            files.extend(found);
        } else if is_xsd(path) {
            files.push(path.to_path_buf());
        } else {
            return Err(path_error(path, "not an .xsd file"));
        }
    }
    Ok(files)
}

/// Reads and parses every schema file below `paths` into one model.
///
/// Nothing is returned unless every file loads; callers merge the result into
/// their active model only on success.
pub fn load_schema_paths<P: AsRef<Path>>(paths: &[P]) -> Result<SchemaModel> {
    if paths.is_empty() {
        return Err(Error::InvalidArgument("no schema paths given".into()));
    }
    let mut model = SchemaModel::new();
    for file in expand(paths)? {
        let text = fs::read_to_string(&file).map_err(|e| path_error(&file, e.to_string()))?;
        let parsed = parse_xsd(&text).map_err(|e| match e {
            Error::XsdParseError(msg) => {
                Error::XsdParseError(format!("{}: {msg}", file.display()))
            }
            other => other,
        })?;
        log::debug!(
            "loaded {} ({} elements, {} types)",
            file.display(),
            parsed.elements.len(),
            parsed.types.len()
        );
        model.merge(parsed);
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn test_temp_dir(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!(
            "v2gcodec-loader-{name}-{}-{nanos}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    const XSD_A: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:element name="A" type="xs:string"/></xs:schema>"#;
    const XSD_B: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:element name="A" type="xs:int"/><xs:element name="B" type="xs:int"/></xs:schema>"#;

    #[test]
    fn directory_expands_sorted_and_later_file_wins() {
        let dir = test_temp_dir("dir");
        fs::write(dir.join("a.xsd"), XSD_A).unwrap();
        fs::write(dir.join("b.XSD"), XSD_B).unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let model = load_schema_paths(&[&dir]).unwrap();
        assert_eq!(model.elements.len(), 2);
        let a = model.elements.values().find(|d| &*d.name.local_name == "A").unwrap();
        assert_eq!(a.type_ref, Some(crate::schema::TypeRef::builtin("int")));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn bad_paths_are_schema_errors() {
        let dir = test_temp_dir("bad");
        let txt = dir.join("schema.txt");
        fs::write(&txt, XSD_A).unwrap();
        let err = load_schema_paths(&[&txt]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);

        let missing = dir.join("missing.xsd");
        let err = load_schema_paths(&[&missing]).unwrap_err();
        assert!(matches!(err, Error::SchemaPath { .. }));

        let empty = dir.join("empty");
        fs::create_dir_all(&empty).unwrap();
        assert!(load_schema_paths(&[&empty]).is_err());

        let broken = dir.join("broken.xsd");
        fs::write(&broken, "<xs:schema").unwrap();
        let err = load_schema_paths(&[&broken]).unwrap_err();
        assert!(err.to_string().contains("broken.xsd"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn no_paths_is_invalid_argument() {
        let none: [&str; 0] = [];
        assert_eq!(load_schema_paths(&none).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
}
