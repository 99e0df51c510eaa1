use std::io::Write;

use crate::{Chain, Configuration, Issue, OutputStream, format};

/// Console a [`StandardStream`] prints to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Console {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// Prints issues in human readable form, then forwards them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StandardStream {
    console: Console,
    verbosity: i32,
    time_format: String,
}

impl StandardStream {
    /// Creates a stream printing at the given verbosity.
    pub fn new(console: Console, verbosity: i32, time_format: impl Into<String>) -> Self {
        Self {
            console,
            verbosity,
            time_format: time_format.into(),
        }
    }

    /// Creates a stream from its parameter, an optional verbosity.
    ///
    /// An empty or malformed parameter selects the configured verbosity.
    pub fn from_param(console: Console, param: &str) -> Self {
        let config = Configuration::get();
        let verbosity = match param.trim() {
            "" => config.verbosity_level(),
            value => value.parse().unwrap_or_else(|_| {
                tracing::warn!(%value, "wrong verbosity is given for the console stream");
                config.verbosity_level()
            }),
        };
        Self::new(console, verbosity, config.timestamp_format())
    }

    /// Verbosity of the printed issues.
    pub fn verbosity(&self) -> i32 {
        self.verbosity
    }

    /// Renders `issue` as one printed entry, without the trailing newline.
    pub fn render(&self, issue: &Issue) -> String {
        let mut line = String::new();
        // Writing into a String cannot fail.
        let _ = format::print(&mut line, issue, self.verbosity, &self.time_format);
        line
    }
}

impl OutputStream for StandardStream {
    fn write(&self, issue: &Issue, next: Chain<'_>) -> Result<(), Issue> {
        let line = self.render(issue);
        let result = match self.console {
            Console::Stdout => writeln!(std::io::stdout().lock(), "{line}"),
            Console::Stderr => writeln!(std::io::stderr().lock(), "{line}"),
        };
        if let Err(error) = result {
            tracing::error!(%error, console = ?self.console, "cannot print the issue");
        }
        next.forward(issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalContext, Severity};

    #[test]
    fn test_verbosity_parameter() {
        assert_eq!(StandardStream::from_param(Console::Stdout, "3").verbosity(), 3);
        assert_eq!(StandardStream::from_param(Console::Stderr, " -2 ").verbosity(), -2);
    }

    #[test]
    fn test_render() {
        let stream = StandardStream::new(Console::Stdout, -3, "%H");
        let issue = Issue::new(&LocalContext::capture(), Severity::Information, "hello");
        assert_eq!(stream.render(&issue), "hello");
    }
}
