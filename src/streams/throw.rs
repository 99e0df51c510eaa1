use crate::{Chain, Issue, OutputStream};

/// Forwards the issue, then returns a copy of it as an error.
///
/// The error stops the pipeline and is returned by
/// [`StreamFactory::dispatch`](crate::StreamFactory::dispatch), which is how a
/// severity is configured to abort the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThrowStream;

impl OutputStream for ThrowStream {
    fn write(&self, issue: &Issue, next: Chain<'_>) -> Result<(), Issue> {
        next.forward(issue)?;
        Err(issue.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalContext, Pipeline, Severity, streams::NullStream};

    #[test]
    fn test_rethrows_after_forwarding() {
        let issue = Issue::new(&LocalContext::capture(), Severity::Fatal, "abort");
        let pipeline = Pipeline::new(vec![Box::new(ThrowStream), Box::new(NullStream)]);
        assert_eq!(pipeline.send(&issue), Err(issue));
    }
}
