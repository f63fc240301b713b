use std::path::Path;

use anyhow::Result;

use crate::{Diagnostics, Encoding};

pub fn ensure_dir_exists(dir: &Path, diagnostics: &mut dyn Diagnostics) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    if let Err(err) = fs_err::create_dir_all(dir) {
        diagnostics.error(&format!("Couldn't create {}: {err}", dir.display()));
        return Err(err.into());
    }
    diagnostics.info(&format!("Created {}", dir.display()));
    Ok(())
}

/// Writes the whole file to a hidden sibling first, then renames it into place, so readers never
/// see a partial file.
pub fn write_atomically(path: &Path, contents: &[u8], encoding: Encoding) -> Result<()> {
    let file_name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => bail!("{} isn't a file path", path.display()),
    };
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let mut bytes = encoding.preamble().to_vec();
    bytes.extend_from_slice(contents);
    if let Err(err) = fs_err::write(&tmp, bytes) {
        let _ = fs_err::remove_file(&tmp);
        return Err(err.into());
    }
    fs_err::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDiagnostics;

    #[test]
    fn test_write_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        write_atomically(&path, b"a,b\n", Encoding::Utf8).unwrap();
        assert_eq!(fs_err::read(&path).unwrap(), b"a,b\n");

        write_atomically(&path, b"c\n", Encoding::Utf8Sig).unwrap();
        assert_eq!(fs_err::read(&path).unwrap(), b"\xEF\xBB\xBFc\n");

        let leftovers: Vec<_> = fs_err::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.csv");
        assert!(write_atomically(&path, b"x", Encoding::Utf8).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_ensure_dir_exists() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut diagnostics = MemoryDiagnostics::default();

        ensure_dir_exists(&nested, &mut diagnostics).unwrap();
        assert!(nested.is_dir());
        assert_eq!(diagnostics.info.len(), 1);

        ensure_dir_exists(&nested, &mut diagnostics).unwrap();
        assert_eq!(diagnostics.info.len(), 1);
    }
}
