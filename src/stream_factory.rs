//! Registry of stream constructors and routing of issues by severity.
//!
//! The [`StreamFactory`] owns:
//!
//! - the named output and input stream constructors, registered by plugin
//!   modules or directly with [`register_out_stream`] and
//!   [`register_in_stream`];
//! - one pipeline per routed [`Severity`], built on first use from the
//!   configured specification and replaced with [`set_stream`];
//! - the [`IssueCatcher`] slot.
//!
//! Every lock is released before a stream or catcher is called. Dispatching
//! clones the pipeline's `Arc` out of the routing table, so replacing a
//! pipeline never waits for slow sinks and the old pipeline is dropped once
//! the last in-flight dispatch finishes with it.
//!
//! [`register_out_stream`]: StreamFactory::register_out_stream
//! [`register_in_stream`]: StreamFactory::register_in_stream
//! [`set_stream`]: StreamFactory::set_stream

use core::fmt;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use spin::{Once, RwLock};
use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::{
    Configuration, InputStream, InputStreamCreator, Issue, OutputStream, OutputStreamCreator,
    Pipeline, Severity, StreamSpec,
    builtin_issues::{InvalidFormat, IssueCatcherAlreadySet},
    catcher::{IssueCatcher, IssueCatcherHandle},
    here,
    plugin::{ModuleLoader, PluginManager, StaticModules},
    split_pipeline,
};

type Registry<T> = RwLock<IndexMap<String, Arc<T>, FxBuildHasher>>;

/// Creates streams from their specification and routes issues to them.
///
/// # Examples
///
/// ```
/// use ers::{Configuration, Issue, Severity, StreamFactory, here};
///
/// let factory = StreamFactory::new(Configuration::default());
/// factory.set_stream(Severity::Warning, "null");
///
/// let issue = Issue::new(&here!(), Severity::Warning, "nobody sees this");
/// assert!(factory.dispatch(&issue).is_ok());
///
/// factory.set_stream(Severity::Error, "throw");
/// let issue = Issue::new(&here!(), Severity::Error, "rethrown");
/// assert_eq!(factory.dispatch(&issue), Err(issue));
/// ```
pub struct StreamFactory {
    config: Configuration,
    out_creators: Registry<dyn OutputStreamCreator>,
    in_creators: Registry<dyn InputStreamCreator>,
    routes: RwLock<[Option<Arc<Pipeline>>; Severity::ROUTED.len()]>,
    catcher: RwLock<Option<Arc<dyn IssueCatcher>>>,
    plugins: PluginManager,
}

static INSTANCE: Once<StreamFactory> = Once::new();

impl StreamFactory {
    /// Creates a factory and loads the configured modules through
    /// [`StaticModules::global`].
    pub fn new(config: Configuration) -> Self {
        Self::with_loader(config, StaticModules::global())
    }

    /// Creates a factory and loads the configured modules through `loader`.
    pub fn with_loader(config: Configuration, loader: impl ModuleLoader + 'static) -> Self {
        let factory = Self {
            config,
            out_creators: RwLock::new(IndexMap::default()),
            in_creators: RwLock::new(IndexMap::default()),
            routes: RwLock::new(Default::default()),
            catcher: RwLock::new(None),
            plugins: PluginManager::new(loader),
        };
        factory.plugins.load_configured(&factory);
        factory
    }

    /// The process-wide factory, created from [`Configuration::get`] on
    /// first use.
    ///
    /// Module initialization functions receive the factory being built and
    /// must not call this function.
    pub fn instance() -> &'static StreamFactory {
        INSTANCE.call_once(|| Self::new(Configuration::get()))
    }

    /// Configuration the factory was created with.
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Modules loaded into this factory.
    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    /// Registers an output stream constructor under `name`, replacing any
    /// previous one.
    pub fn register_out_stream(&self, name: impl Into<String>, creator: impl OutputStreamCreator) {
        let creator = Arc::new(creator).unsize(unsize::Coercion!(to dyn OutputStreamCreator));
        self.out_creators.write().insert(name.into(), creator);
    }

    /// Registers an input stream constructor under `name`, replacing any
    /// previous one.
    pub fn register_in_stream(&self, name: impl Into<String>, creator: impl InputStreamCreator) {
        let creator = Arc::new(creator).unsize(unsize::Coercion!(to dyn InputStreamCreator));
        self.in_creators.write().insert(name.into(), creator);
    }

    /// Names of the registered output streams, in registration order.
    pub fn out_stream_names(&self) -> Vec<String> {
        self.out_creators.read().keys().cloned().collect()
    }

    /// Names of the registered input streams, in registration order.
    pub fn in_stream_names(&self) -> Vec<String> {
        self.in_creators.read().keys().cloned().collect()
    }

    /// Builds the output stream described by a pipeline specification.
    ///
    /// Stages that cannot be built are reported and skipped. Returns `None`
    /// when no stage could be built.
    pub fn create_out_stream(&self, spec: &str) -> Option<Box<dyn OutputStream>> {
        let mut stages = self.build_pipeline(spec).into_stages();
        match stages.len() {
            0 => None,
            1 => stages.pop(),
            _ => Some(Box::new(Pipeline::new(stages))),
        }
    }

    fn build_pipeline(&self, spec: &str) -> Pipeline {
        Pipeline::new(
            split_pipeline(spec)
                .into_iter()
                .filter_map(|stage| self.create_stage(stage))
                .collect(),
        )
    }

    fn create_stage(&self, stage: &str) -> Option<Box<dyn OutputStream>> {
        let spec = StreamSpec::parse(stage);
        let creator = self.out_creators.read().get(spec.name).cloned();
        let Some(creator) = creator else {
            tracing::error!(stream = spec.name, "creator for the stream is not found");
            return None;
        };
        creator
            .create(spec.param)
            .inspect_err(|issue| {
                tracing::error!(stream = spec.name, %issue, "stream can not be created");
            })
            .ok()
    }

    /// Builds the input stream registered under `name`.
    ///
    /// Fails with an [`InvalidFormat`] issue if no constructor is registered
    /// under `name`, or if the constructor fails; the constructor's issue then
    /// becomes the cause.
    pub fn create_in_stream(
        &self,
        name: &str,
        params: &[String],
    ) -> Result<Box<dyn InputStream>, Issue> {
        let creator = self.in_creators.read().get(name).cloned();
        let invalid = || Issue::from_type(&here!(), Severity::Error, InvalidFormat::new(name));
        match creator {
            Some(creator) => creator
                .create(params)
                .map_err(|cause| invalid().with_cause(&cause)),
            None => Err(invalid()),
        }
    }

    /// Replaces the pipeline of `severity` with the one described by `spec`.
    ///
    /// A specification from which nothing can be built installs an empty
    /// pipeline, which silences the severity.
    pub fn set_stream(&self, severity: Severity, spec: &str) {
        let pipeline = Arc::new(self.build_pipeline(spec));
        let previous = self.routes.write()[severity.slot()].replace(pipeline);
        drop(previous);
    }

    fn pipeline(&self, severity: Severity) -> Arc<Pipeline> {
        let slot = severity.slot();
        if let Some(pipeline) = &self.routes.read()[slot] {
            return pipeline.clone();
        }
        let built = Arc::new(self.build_pipeline(self.config.stream(severity)));
        self.routes.write()[slot].get_or_insert(built).clone()
    }

    /// Sends `issue` to the installed catcher, or routes it by severity if
    /// there is none.
    ///
    /// An `Err` carries an issue returned by a stage, such as `throw`.
    pub fn dispatch(&self, issue: &Issue) -> Result<(), Issue> {
        let catcher = self.catcher.read().clone();
        match catcher {
            Some(catcher) => {
                catcher.catch(issue);
                Ok(())
            }
            None => self.route(issue),
        }
    }

    /// Sends `issue` through the pipeline of its severity, ignoring any
    /// catcher.
    pub fn route(&self, issue: &Issue) -> Result<(), Issue> {
        self.pipeline(issue.severity()).send(issue)
    }

    /// Returns `true` if debug issues of `level` are dispatched.
    pub fn debug_enabled(&self, level: u8) -> bool {
        i32::from(level) <= self.config.debug_level()
    }

    /// Dispatches `issue` as a debug message of `level`, unless `level` is
    /// above the configured debug level.
    pub fn debug(&self, level: u8, mut issue: Issue) -> Result<(), Issue> {
        if !self.debug_enabled(level) {
            return Ok(());
        }
        issue.set_severity(Severity::debug(level));
        self.dispatch(&issue)
    }

    /// Dispatches `issue` as information.
    pub fn information(&self, issue: Issue) -> Result<(), Issue> {
        self.dispatch_as(Severity::Information, issue)
    }

    /// Dispatches `issue` as a warning.
    pub fn warning(&self, issue: Issue) -> Result<(), Issue> {
        self.dispatch_as(Severity::Warning, issue)
    }

    /// Dispatches `issue` as an error.
    pub fn error(&self, issue: Issue) -> Result<(), Issue> {
        self.dispatch_as(Severity::Error, issue)
    }

    /// Dispatches `issue` as a fatal error.
    pub fn fatal(&self, issue: Issue) -> Result<(), Issue> {
        self.dispatch_as(Severity::Fatal, issue)
    }

    fn dispatch_as(&self, severity: Severity, mut issue: Issue) -> Result<(), Issue> {
        issue.set_severity(severity);
        self.dispatch(&issue)
    }

    /// Installs `catcher`.
    ///
    /// Fails with an [`IssueCatcherAlreadySet`] issue if a catcher is
    /// installed already.
    pub fn set_issue_catcher(
        &self,
        catcher: impl IssueCatcher,
    ) -> Result<IssueCatcherHandle<'_>, Issue> {
        let mut slot = self.catcher.write();
        if slot.is_some() {
            drop(slot);
            return Err(Issue::from_type(
                &here!(),
                Severity::Error,
                IssueCatcherAlreadySet,
            ));
        }
        *slot = Some(Arc::new(catcher).unsize(unsize::Coercion!(to dyn IssueCatcher)));
        Ok(IssueCatcherHandle::new(self))
    }

    pub(crate) fn remove_issue_catcher(&self) {
        let previous = self.catcher.write().take();
        drop(previous);
    }
}

impl fmt::Display for StreamFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in self.out_stream_names() {
            writeln!(f, "{name}\t\"output\"")?;
        }
        for name in self.in_stream_names() {
            writeln!(f, "{name}\t\"input\"")?;
        }
        Ok(())
    }
}

impl fmt::Debug for StreamFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamFactory")
            .field("config", &self.config)
            .field("out_streams", &self.out_stream_names())
            .field("in_streams", &self.in_stream_names())
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{Chain, LocalContext, plugin::BASE_MODULE};

    #[derive(Clone, Default)]
    struct Recorder(std::sync::Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn messages(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl OutputStream for Recorder {
        fn write(&self, issue: &Issue, next: Chain<'_>) -> Result<(), Issue> {
            self.0.lock().unwrap().push(issue.message().to_owned());
            next.forward(issue)
        }
    }

    fn factory_with(recorder: &Recorder) -> StreamFactory {
        let config = Configuration::default()
            .with_debug_level(3)
            .with_stream(Severity::Debug3, "record")
            .with_stream(Severity::Error, "record")
            .with_stream(Severity::Warning, "record");
        let factory = StreamFactory::new(config);
        let recorder = recorder.clone();
        factory.register_out_stream("record", move |_: &str| {
            Ok(Box::new(recorder.clone()) as Box<dyn OutputStream>)
        });
        factory
    }

    fn issue(message: &str) -> Issue {
        Issue::new(&LocalContext::capture(), Severity::Information, message)
    }

    #[test]
    fn test_builtin_streams_are_registered() {
        let factory = StreamFactory::new(Configuration::default());
        assert_eq!(
            factory.out_stream_names(),
            ["null", "stdout", "stderr", "throw", "filter", "file"]
        );
        assert_eq!(factory.in_stream_names(), ["file"]);
        assert_eq!(factory.plugins().loaded_modules(), [BASE_MODULE]);
        assert!(factory.to_string().contains("filter\t\"output\"\n"));
    }

    #[test]
    fn test_default_error_sink_prints_the_message() {
        let factory = StreamFactory::new(Configuration::default());
        assert_eq!(factory.configuration().stream(Severity::Error), "stderr");

        let sink = crate::streams::StandardStream::from_param(crate::streams::Console::Stderr, "");
        let mut boom = issue("boom");
        boom.set_severity(Severity::Error);
        assert!(sink.render(&boom).contains("boom"));
        assert!(factory.error(boom).is_ok());
    }

    #[test]
    fn test_null_silences_a_debug_level() {
        let recorder = Recorder::default();
        let factory = factory_with(&recorder);
        factory.set_stream(Severity::Debug3, "null");

        factory.debug(3, issue("hidden")).unwrap();
        factory.error(issue("shown")).unwrap();
        assert_eq!(recorder.messages(), ["shown"]);
    }

    #[test]
    fn test_debug_level_gate() {
        let recorder = Recorder::default();
        let config = Configuration::default()
            .with_debug_level(1)
            .with_stream(Severity::Debug1, "record")
            .with_stream(Severity::Debug2, "record");
        let factory = StreamFactory::new(config);
        let sink = recorder.clone();
        factory.register_out_stream("record", move |_: &str| {
            Ok(Box::new(sink.clone()) as Box<dyn OutputStream>)
        });

        factory.debug(2, issue("too verbose")).unwrap();
        factory.debug(1, issue("verbose enough")).unwrap();
        assert_eq!(recorder.messages(), ["verbose enough"]);
        assert!(!factory.debug_enabled(2));
    }

    #[test]
    fn test_unknown_severity_routes_as_error() {
        let recorder = Recorder::default();
        let factory = factory_with(&recorder);
        let mut unknown = issue("unknown");
        unknown.set_value(ers_internals::keys::SEVERITY, "bogus");
        factory.dispatch(&unknown).unwrap();
        assert_eq!(recorder.messages(), ["unknown"]);
    }

    #[test]
    fn test_unknown_stages_are_skipped() {
        let recorder = Recorder::default();
        let factory = factory_with(&recorder);
        assert!(factory.create_out_stream("nonexistent").is_none());
        assert!(factory.create_out_stream("nonexistent,null").is_some());

        factory.set_stream(Severity::Warning, "nonexistent");
        factory.warning(issue("silent")).unwrap();
        factory.set_stream(Severity::Warning, "nonexistent,record");
        factory.warning(issue("recorded")).unwrap();
        assert_eq!(recorder.messages(), ["recorded"]);
    }

    #[test]
    fn test_throw_and_filter() {
        let recorder = Recorder::default();
        let factory = factory_with(&recorder);
        factory.set_stream(Severity::Error, "filter(net),record,throw");

        let mut net = issue("net");
        net.add_qualifier("net");
        let rethrown = factory.error(net).map_err(|i| i.message().to_owned());
        assert_eq!(rethrown, Err("net".to_owned()));
        assert!(factory.error(issue("other")).is_ok());
        assert_eq!(recorder.messages(), ["net"]);
    }

    #[test]
    fn test_in_stream_errors() {
        let factory = StreamFactory::new(Configuration::default());
        let missing = factory.create_in_stream("nope", &[]).err().unwrap();
        assert!(missing.is::<InvalidFormat>());
        assert!(missing.cause().is_none());

        let params = ["/nonexistent/ers/in".to_owned()];
        let failed = factory.create_in_stream("file", &params).err().unwrap();
        assert_eq!(
            failed.downcast::<InvalidFormat>().map(|i| i.key().to_owned()),
            Some("file".to_owned())
        );
        assert!(failed.cause().is_some_and(|c| c.is::<crate::CannotOpenFile>()));
    }

    #[test]
    fn test_catcher_single_assignment() {
        let recorder = Recorder::default();
        let factory = factory_with(&recorder);
        let caught = std::sync::Arc::new(AtomicUsize::new(0));

        let counter = caught.clone();
        let handle = factory
            .set_issue_catcher(move |_: &Issue| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let second = factory.set_issue_catcher(|_: &Issue| {}).unwrap_err();
        assert!(second.is::<IssueCatcherAlreadySet>());

        factory.error(issue("intercepted")).unwrap();
        assert_eq!(caught.load(Ordering::SeqCst), 1);
        assert!(recorder.messages().is_empty());

        drop(handle);
        factory.error(issue("routed")).unwrap();
        assert_eq!(recorder.messages(), ["routed"]);
        let again = factory.set_issue_catcher(|_: &Issue| {});
        assert!(again.is_ok());
    }

    #[test]
    fn test_concurrent_dispatch() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 250;

        struct Count(std::sync::Arc<AtomicUsize>);

        impl OutputStream for Count {
            fn write(&self, issue: &Issue, next: Chain<'_>) -> Result<(), Issue> {
                self.0.fetch_add(1, Ordering::SeqCst);
                next.forward(issue)
            }
        }

        let count = std::sync::Arc::new(AtomicUsize::new(0));
        let factory = StreamFactory::new(Configuration::default());
        let sink = count.clone();
        factory.register_out_stream("count", move |_: &str| {
            Ok(Box::new(Count(sink.clone())) as Box<dyn OutputStream>)
        });
        factory.set_stream(Severity::Warning, "count");

        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    for _ in 0..PER_THREAD {
                        factory.warning(issue("concurrent")).unwrap();
                    }
                });
            }
        });
        assert_eq!(count.load(Ordering::SeqCst), THREADS * PER_THREAD);
    }
}
