use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Lines, Write},
};

use ers_internals::IssueRecord;
use spin::Mutex;

use crate::{
    Chain, InputStream, Issue, IssueFactory, OutputStream, Severity, builtin_issues::CannotOpenFile,
    here,
};

/// Appends every issue to a file as one JSON [`IssueRecord`] per line, then
/// forwards it.
#[derive(Debug)]
pub struct FileOutStream {
    path: String,
    file: Mutex<File>,
}

impl FileOutStream {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: &str) -> Result<Self, Issue> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|error| cannot_open(path, &error))?;
        Ok(Self {
            path: path.to_owned(),
            file: Mutex::new(file),
        })
    }

    fn append(&self, issue: &Issue) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(&issue.to_record())?;
        line.push(b'\n');
        self.file.lock().write_all(&line)
    }
}

impl OutputStream for FileOutStream {
    fn write(&self, issue: &Issue, next: Chain<'_>) -> Result<(), Issue> {
        if let Err(error) = self.append(issue) {
            tracing::error!(%error, path = %self.path, "cannot write the issue to file");
        }
        next.forward(issue)
    }
}

/// Reads back the issues written by a [`FileOutStream`].
///
/// Records are read lazily. Lines that are not valid records are skipped.
pub struct FileInStream {
    path: String,
    lines: Lines<BufReader<File>>,
}

impl FileInStream {
    /// Opens `path` for reading.
    pub fn open(path: &str) -> Result<Self, Issue> {
        let file = File::open(path).map_err(|error| cannot_open(path, &error))?;
        Ok(Self {
            path: path.to_owned(),
            lines: BufReader::new(file).lines(),
        })
    }
}

impl InputStream for FileInStream {
    fn read(&mut self) -> Option<Issue> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(error) => {
                    tracing::error!(%error, path = %self.path, "cannot read issues from file");
                    return None;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<IssueRecord>(&line) {
                Ok(record) => return Some(IssueFactory::instance().from_record(&record)),
                Err(error) => {
                    tracing::warn!(%error, path = %self.path, "skipping malformed issue record");
                }
            }
        }
    }
}

impl core::fmt::Debug for FileInStream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FileInStream")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn cannot_open(path: &str, error: &std::io::Error) -> Issue {
    Issue::from_type(&here!(), Severity::Error, CannotOpenFile::new(path)).with_cause(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalContext, Pipeline};

    fn temp_path(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("ers-{}-{name}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn test_round_trip_with_typed_cause() {
        let path = temp_path("round-trip");
        let path = path.to_str().unwrap();

        let cause = Issue::from_type(
            &LocalContext::capture(),
            Severity::Error,
            CannotOpenFile::new("/missing"),
        );
        let mut issue = Issue::new(&LocalContext::capture(), Severity::Warning, "outer")
            .with_cause(&cause);
        issue.add_qualifier("io");
        let second = Issue::new(&LocalContext::capture(), Severity::Information, "second");

        let out = Pipeline::new(vec![Box::new(FileOutStream::open(path).unwrap())]);
        out.send(&issue).unwrap();
        out.send(&second).unwrap();

        let mut input = FileInStream::open(path).unwrap();
        let read: Vec<Issue> = input.issues().collect();
        assert_eq!(read, [issue, second]);
        let cause = read[0].cause().unwrap();
        assert_eq!(
            cause.downcast::<CannotOpenFile>().map(|c| c.path().to_owned()),
            Some("/missing".to_owned())
        );
        assert_eq!(read[0].qualifiers(), ["io"]);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let path = temp_path("malformed");
        let issue = Issue::new(&LocalContext::capture(), Severity::Error, "kept");
        let record = serde_json::to_string(&issue.to_record()).unwrap();
        std::fs::write(&path, format!("not json\n\n{record}\n{{\"values\":1}}\n")).unwrap();

        let mut input = FileInStream::open(path.to_str().unwrap()).unwrap();
        assert_eq!(input.read(), Some(issue));
        assert_eq!(input.read(), None);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_file() {
        let error = FileInStream::open("/nonexistent/ers/input").unwrap_err();
        assert!(error.is::<CannotOpenFile>());
        assert!(!error.value(ers_internals::keys::CAUSE_TEXT).is_empty());
    }
}
