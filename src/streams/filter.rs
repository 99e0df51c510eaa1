use crate::{Chain, Issue, OutputStream};

/// Forwards only issues with matching qualifiers.
///
/// The parameter is a comma separated list of qualifiers. A qualifier
/// prefixed with `!` excludes the issue. When at least one qualifier is not
/// prefixed, the issue must carry one of them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterStream {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl FilterStream {
    /// Parses a filter parameter such as `net,!test`.
    pub fn new(param: &str) -> Self {
        let mut filter = Self::default();
        for token in param.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.strip_prefix('!') {
                Some(excluded) => filter.exclude.push(excluded.trim().to_owned()),
                None => filter.include.push(token.to_owned()),
            }
        }
        filter
    }

    /// Returns `true` if `issue` passes the filter.
    pub fn accepts(&self, issue: &Issue) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|q| issue.has_qualifier(q));
        included && !self.exclude.iter().any(|q| issue.has_qualifier(q))
    }
}

impl OutputStream for FilterStream {
    fn write(&self, issue: &Issue, next: Chain<'_>) -> Result<(), Issue> {
        if self.accepts(issue) {
            next.forward(issue)
        } else {
            Ok(())
        }
    }
}
