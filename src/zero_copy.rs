//! Zero-copy line input for the command-line sorter
//!
//! Files are memory-mapped and split into `&str` lines borrowing the mapped
//! bytes. Standard input cannot be mapped and is read into an owned buffer.

use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{SortContext, SortError, SortResult};

/// Backing storage for one input
enum Storage {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

/// One input source, either a mapped file or a buffered stream
pub struct InputBuffer {
    name: String,
    storage: Storage,
}

impl InputBuffer {
    /// Memory-map a file
    pub fn open(path: &Path) -> SortResult<Self> {
        let name = path.display().to_string();
        let file = File::open(path).with_file_context(&name)?;
        let len = file.metadata().with_file_context(&name)?.len();

        // Zero-length mappings are rejected on some platforms
        if len == 0 {
            return Ok(Self {
                name,
                storage: Storage::Owned(Vec::new()),
            });
        }

        // SAFETY: the map is read-only and lives as long as the buffer. Another
        // process truncating the file while we sort is outside our control,
        // as for any mmap-based reader.
        let mmap = unsafe { Mmap::map(&file) }.with_file_context(&name)?;
        Ok(Self {
            name,
            storage: Storage::Mapped(mmap),
        })
    }

    /// Read a whole stream into memory
    pub fn from_reader<R: Read>(name: &str, mut reader: R) -> SortResult<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).with_file_context(name)?;
        Ok(Self {
            name: name.to_string(),
            storage: Storage::Owned(data),
        })
    }

    /// Read standard input
    pub fn stdin() -> SortResult<Self> {
        Self::from_reader("-", io::stdin().lock())
    }

    /// Open `-` as stdin and anything else as a file
    pub fn open_named(name: &str) -> SortResult<Self> {
        if name == "-" {
            Self::stdin()
        } else {
            Self::open(Path::new(name))
        }
    }

    /// Name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Mapped(mmap) => &mmap[..],
            Storage::Owned(data) => &data[..],
        }
    }

    /// Split into lines at `terminator`
    ///
    /// A trailing terminator does not start an extra empty line. Every line
    /// must be valid UTF-8.
    pub fn lines(&self, terminator: u8) -> SortResult<Vec<&str>> {
        split_lines(self.bytes(), terminator)
    }
}

impl std::fmt::Debug for InputBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.storage {
            Storage::Mapped(_) => "mapped",
            Storage::Owned(_) => "owned",
        };
        f.debug_struct("InputBuffer")
            .field("name", &self.name)
            .field("storage", &kind)
            .field("len", &self.bytes().len())
            .finish()
    }
}

/// Fast line splitting over raw bytes
fn split_lines(data: &[u8], terminator: u8) -> SortResult<Vec<&str>> {
    let data = data.strip_suffix(&[terminator]).unwrap_or(data);
    if data.is_empty() {
        return Ok(Vec::new());
    }

    data.split(|&b| b == terminator)
        .map(|line| std::str::from_utf8(line).map_err(SortError::from))
        .collect()
}

/// Load a lookup table from tab-separated `key<TAB>value` lines
///
/// Blank lines are skipped. A later line with the same key replaces an
/// earlier one.
pub fn load_lookup_table(path: &Path) -> SortResult<HashMap<String, String>> {
    let input = InputBuffer::open(path)?;
    let mut table = HashMap::new();

    for (number, line) in input.lines(b'\n')?.into_iter().enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = line.split_once('\t').ok_or_else(|| {
            SortError::parse_error(&format!(
                "{}:{}: expected key<TAB>value",
                input.name(),
                number + 1
            ))
        })?;
        table.insert(key.to_string(), value.to_string());
    }

    tracing::debug!(file = input.name(), entries = table.len(), "loaded lookup table");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(contents).expect("Failed to write temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines(b"b\na\nc\n", b'\n').unwrap(), vec!["b", "a", "c"]);
        assert_eq!(split_lines(b"b\na", b'\n').unwrap(), vec!["b", "a"]);
        assert_eq!(split_lines(b"x\n\ny\n", b'\n').unwrap(), vec!["x", "", "y"]);
        assert_eq!(split_lines(b"one\0two\0", b'\0').unwrap(), vec!["one", "two"]);
        assert!(split_lines(b"", b'\n').unwrap().is_empty());
        assert_eq!(split_lines(b"\n", b'\n').unwrap(), Vec::<&str>::new());
    }

    #[test]
    fn test_invalid_utf8() {
        let result = split_lines(b"ok\n\xff\xfe\n", b'\n');
        assert!(matches!(result, Err(SortError::Utf8Error(_))));
    }

    #[test]
    fn test_mapped_file_lines() {
        let file = temp_file(b"1.10\n1.9\n1.2a\n");
        let input = InputBuffer::open(file.path()).expect("Failed to map file");
        assert_eq!(input.lines(b'\n').unwrap(), vec!["1.10", "1.9", "1.2a"]);
    }

    #[test]
    fn test_empty_file() {
        let file = temp_file(b"");
        let input = InputBuffer::open(file.path()).expect("Failed to open empty file");
        assert!(input.lines(b'\n').unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = InputBuffer::open(Path::new("/nonexistent/dtsort-input"));
        assert!(matches!(result, Err(SortError::FileNotFound { .. })));
    }

    #[test]
    fn test_from_reader() {
        let input = InputBuffer::from_reader("-", &b"b\na\n"[..]).unwrap();
        assert_eq!(input.name(), "-");
        assert_eq!(input.lines(b'\n').unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_load_lookup_table() {
        let file = temp_file(b"low\t1\nhigh\t3\r\n\nmid\t2\n");
        let table = load_lookup_table(file.path()).expect("Failed to load table");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("high").map(String::as_str), Some("3"));
        assert_eq!(table.get("mid").map(String::as_str), Some("2"));

        let file = temp_file(b"low 1\n");
        assert!(matches!(
            load_lookup_table(file.path()),
            Err(SortError::ParseError { .. })
        ));
    }
}
