//! Java-properties-style key/value files, written atomically.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::errors::Result;

/// Read a properties file. Lines starting with `#` or `!` are comments;
/// everything before the first `=` is the key.
pub fn read_properties(path: &Path) -> Result<BTreeMap<String, String>> {
    let raw = std::fs::read_to_string(path)?;
    let mut props = BTreeMap::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            props.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(props)
}

/// Write a properties file via a temporary sibling and rename, so a
/// failure mid-write leaves the previous file intact.
pub fn write_properties(path: &Path, props: &BTreeMap<String, String>) -> Result<()> {
    let tmp = path.with_extension("properties.tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        writeln!(file, "#repository index properties")?;
        for (key, value) in props {
            writeln!(file, "{key}={value}")?;
        }
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.properties");

        let mut props = BTreeMap::new();
        props.insert("nexus.index.id".to_string(), "central".to_string());
        props.insert(
            "nexus.index.timestamp".to_string(),
            "20260802120000.000 +0000".to_string(),
        );

        write_properties(&path, &props).unwrap();
        assert_eq!(read_properties(&path).unwrap(), props);
    }

    #[test]
    fn test_comments_and_blanks_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.properties");
        std::fs::write(&path, "# header\n\n!bang\nkey=value\n").unwrap();

        let props = read_properties(&path).unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props["key"], "value");
    }

    #[test]
    fn test_write_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.properties");

        let mut props = BTreeMap::new();
        props.insert("a".to_string(), "1".to_string());
        write_properties(&path, &props).unwrap();

        // No temporary file is left behind.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["index.properties".to_string()]);
    }
}
