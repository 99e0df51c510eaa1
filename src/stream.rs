//! Output and input streams.
//!
//! Output streams are composed into a [`Pipeline`]. Every stage receives the
//! issue together with a [`Chain`] holding the stages after it and decides on
//! its own whether to [`forward`](Chain::forward) the issue. A stage that
//! returns `Err` stops the pipeline and the error reaches the dispatcher.
//!
//! Pipelines are described by specification strings such as
//! `filter(net,!test),stderr(2),throw`; see [`StreamSpec`] and
//! [`split_pipeline`].

use core::fmt;

use crate::Issue;

/// Destination of issues.
///
/// # Examples
///
/// ```
/// use ers::{Chain, Issue, OutputStream};
///
/// struct Uppercase;
///
/// impl OutputStream for Uppercase {
///     fn write(&self, issue: &Issue, next: Chain<'_>) -> Result<(), Issue> {
///         println!("{}", issue.message().to_uppercase());
///         next.forward(issue)
///     }
/// }
/// ```
pub trait OutputStream: Send + Sync + 'static {
    /// Handles `issue` and decides whether to pass it on to `next`.
    fn write(&self, issue: &Issue, next: Chain<'_>) -> Result<(), Issue>;
}

/// The stages that follow the current one.
#[derive(Clone, Copy)]
pub struct Chain<'a> {
    rest: &'a [Box<dyn OutputStream>],
    then: Option<&'a Chain<'a>>,
}

const NO_STAGES: &[Box<dyn OutputStream>] = &[];

impl Chain<'static> {
    /// A chain with nothing after it.
    pub const fn end() -> Self {
        Self {
            rest: NO_STAGES,
            then: None,
        }
    }
}

impl<'a> Chain<'a> {
    /// Passes `issue` to the next stage, if there is one.
    pub fn forward(self, issue: &Issue) -> Result<(), Issue> {
        match self.rest.split_first() {
            Some((head, rest)) => head.write(
                issue,
                Chain {
                    rest,
                    then: self.then,
                },
            ),
            None => match self.then {
                Some(then) => then.forward(issue),
                None => Ok(()),
            },
        }
    }

    /// Returns `true` if no stage follows.
    pub fn is_end(&self) -> bool {
        self.rest.is_empty() && self.then.is_none_or(Chain::is_end)
    }
}

impl fmt::Debug for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("is_end", &self.is_end())
            .finish_non_exhaustive()
    }
}

/// An ordered list of output stages.
///
/// A pipeline is itself an [`OutputStream`]: when used as a stage, its last
/// stage forwards into the stages that follow the pipeline.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn OutputStream>>,
}

impl Pipeline {
    /// Creates a pipeline from its stages.
    pub fn new(stages: Vec<Box<dyn OutputStream>>) -> Self {
        Self { stages }
    }

    /// Appends a stage.
    pub fn push(&mut self, stage: Box<dyn OutputStream>) {
        self.stages.push(stage);
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` for a pipeline that swallows everything.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The stages, in order.
    pub fn into_stages(self) -> Vec<Box<dyn OutputStream>> {
        self.stages
    }

    /// Sends `issue` through every stage.
    pub fn send(&self, issue: &Issue) -> Result<(), Issue> {
        self.write(issue, Chain::end())
    }
}

impl OutputStream for Pipeline {
    fn write(&self, issue: &Issue, next: Chain<'_>) -> Result<(), Issue> {
        Chain {
            rest: &self.stages,
            then: Some(&next),
        }
        .forward(issue)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

/// Source of issues.
pub trait InputStream: Send {
    /// Returns the next issue, or `None` at the end of data.
    fn read(&mut self) -> Option<Issue>;

    /// Iterator over the remaining issues.
    fn issues(&mut self) -> Issues<'_, Self>
    where
        Self: Sized,
    {
        Issues { stream: self }
    }
}

impl<S: InputStream + ?Sized> InputStream for Box<S> {
    fn read(&mut self) -> Option<Issue> {
        (**self).read()
    }
}

/// Iterator returned by [`InputStream::issues`].
#[derive(Debug)]
pub struct Issues<'a, S> {
    stream: &'a mut S,
}

impl<S: InputStream> Iterator for Issues<'_, S> {
    type Item = Issue;

    fn next(&mut self) -> Option<Issue> {
        self.stream.read()
    }
}

/// Constructor of an output stream from its parameter.
pub trait OutputStreamCreator: Send + Sync + 'static {
    /// Builds the stream.
    fn create(&self, param: &str) -> Result<Box<dyn OutputStream>, Issue>;
}

impl<F> OutputStreamCreator for F
where
    F: Fn(&str) -> Result<Box<dyn OutputStream>, Issue> + Send + Sync + 'static,
{
    fn create(&self, param: &str) -> Result<Box<dyn OutputStream>, Issue> {
        self(param)
    }
}

/// Constructor of an input stream from its parameters.
pub trait InputStreamCreator: Send + Sync + 'static {
    /// Builds the stream.
    fn create(&self, params: &[String]) -> Result<Box<dyn InputStream>, Issue>;
}

impl<F> InputStreamCreator for F
where
    F: Fn(&[String]) -> Result<Box<dyn InputStream>, Issue> + Send + Sync + 'static,
{
    fn create(&self, params: &[String]) -> Result<Box<dyn InputStream>, Issue> {
        self(params)
    }
}

/// One stage of a pipeline specification: `name` or `name(parameter)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamSpec<'a> {
    /// Registered name of the stream.
    pub name: &'a str,
    /// Text between the first `(` and the first `)` after it, empty if absent.
    pub param: &'a str,
}

impl<'a> StreamSpec<'a> {
    /// Parses one stage. Anything after the closing parenthesis is ignored,
    /// an unterminated parameter is empty.
    ///
    /// ```
    /// use ers::StreamSpec;
    ///
    /// let spec = StreamSpec::parse("filter(a,!b)junk");
    /// assert_eq!(spec.name, "filter");
    /// assert_eq!(spec.param, "a,!b");
    /// ```
    pub fn parse(spec: &'a str) -> Self {
        let spec = spec.trim();
        match spec.split_once('(') {
            Some((name, rest)) => Self {
                name: name.trim(),
                param: rest.split_once(')').map_or("", |(param, _)| param),
            },
            None => Self {
                name: spec,
                param: "",
            },
        }
    }
}

/// Splits a pipeline specification into stages.
///
/// Commas inside parentheses belong to the parameter. Blank stages are
/// dropped.
///
/// ```
/// assert_eq!(
///     ers::split_pipeline("filter(a,!b), stderr ,,throw"),
///     ["filter(a,!b)", "stderr", "throw"]
/// );
/// ```
pub fn split_pipeline(spec: &str) -> Vec<&str> {
    let mut stages = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in spec.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                stages.push(&spec[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    stages.push(&spec[start..]);
    stages
        .into_iter()
        .map(str::trim)
        .filter(|stage| !stage.is_empty())
        .collect()
}
