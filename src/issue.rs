//! The [`Issue`] type and the [`IssueType`] trait describing its subtypes.
//!
//! An issue is a value table plus an optional, exclusively owned cause. The
//! table is the only source of truth: severity, responsibility, transience,
//! message and qualifiers are all decoded from it on every read. This makes an
//! issue rebuilt from its own table (see [`IssueFactory`]) indistinguishable
//! from the original.
//!
//! The concrete subtype of an issue is identified by the class key stored
//! under [`keys::CLASS`]. Subtypes are plain Rust types implementing
//! [`IssueType`]; they encode their typed fields as table parameters and
//! decode them back in [`Issue::downcast`].
//!
//! [`IssueFactory`]: crate::IssueFactory

use core::{any::TypeId, fmt};
use std::sync::OnceLock;

use ers_internals::{IssueRecord, Responsibility, Severity, ValueTable, keys, severity};

use crate::{Context, IssueFactory, builtin_issues::GenericIssue, format};

/// A concrete kind of issue.
///
/// Implementors describe how their fields are stored in the value table of an
/// [`Issue`]. Only non-reserved keys should be used for fields; see
/// [`keys::is_reserved`].
///
/// # Examples
///
/// ```
/// use ers::{Issue, IssueType, Severity, ValueTable, here};
///
/// struct CannotConnect {
///     port: u16,
/// }
///
/// impl IssueType for CannotConnect {
///     const CLASS_NAME: &'static str = "app::CannotConnect";
///
///     fn message(&self) -> String {
///         format!("cannot connect to port {}", self.port)
///     }
///
///     fn store(&self, values: &mut ValueTable) {
///         values.set("port", self.port.to_string());
///     }
///
///     fn load(values: &ValueTable) -> Option<Self> {
///         Some(Self {
///             port: values.get("port")?.parse().ok()?,
///         })
///     }
/// }
///
/// let issue = Issue::from_type(&here!(), Severity::Error, CannotConnect { port: 8080 });
/// assert_eq!(issue.message(), "cannot connect to port 8080");
/// assert_eq!(issue.downcast::<CannotConnect>().map(|c| c.port), Some(8080));
/// ```
pub trait IssueType: Sized + 'static {
    /// Class key under which the type is registered with the
    /// [`IssueFactory`](crate::IssueFactory).
    const CLASS_NAME: &'static str;

    /// Human readable message of this value.
    fn message(&self) -> String;

    /// Stores the typed fields as parameters.
    fn store(&self, values: &mut ValueTable) {
        let _ = values;
    }

    /// Decodes the typed fields, or `None` if a parameter is missing or
    /// malformed.
    fn load(values: &ValueTable) -> Option<Self>;
}

/// Descriptor of an [`IssueType`], shared by every issue built from it.
#[derive(Clone, Copy)]
pub struct IssueClass {
    name: &'static str,
    type_name: fn() -> &'static str,
    type_id: fn() -> TypeId,
}

impl IssueClass {
    /// Returns the descriptor of `T`.
    pub const fn of<T: IssueType>() -> &'static Self {
        const {
            &Self {
                name: T::CLASS_NAME,
                type_name: core::any::type_name::<T>,
                type_id: TypeId::of::<T>,
            }
        }
    }

    /// Class key of the type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rust type name of the type.
    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// [`TypeId`] of the type.
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }
}

impl fmt::Debug for IssueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueClass")
            .field("name", &self.name)
            .field("type_name", &self.type_name())
            .finish()
    }
}

/// A structured error or event.
///
/// Issues are built at the raising site, which copies a [`Context`] snapshot
/// into the table, or reconstructed by the [`IssueFactory`] from a table or an
/// [`IssueRecord`].
///
/// Equality is structural: two issues are equal when their tables are equal
/// and their causes are both absent or recursively equal.
///
/// # Examples
///
/// ```
/// use ers::{Issue, Severity, here};
///
/// let cause = Issue::new(&here!(), Severity::Warning, "disk almost full");
/// let mut issue = Issue::new(&here!(), Severity::Error, "cannot write file");
/// issue.set_cause(Some(&cause));
/// issue.add_qualifier("storage");
///
/// assert!(issue.is_error());
/// assert_eq!(issue.cause(), Some(&cause));
/// assert_eq!(issue.value("CAUSE_TEXT"), "disk almost full");
/// assert_eq!(issue.qualifiers(), ["storage"]);
/// ```
pub struct Issue {
    class: &'static IssueClass,
    values: ValueTable,
    cause: Option<Box<Issue>>,
    description: OnceLock<String>,
}

impl Issue {
    /// Creates an issue with a plain message.
    pub fn new(context: &dyn Context, severity: Severity, message: impl Into<String>) -> Self {
        Self::from_type(context, severity, GenericIssue::new(message))
    }

    /// Creates an issue of subtype `T`.
    pub fn from_type<T: IssueType>(context: &dyn Context, severity: Severity, value: T) -> Self {
        let mut issue = Self::blank::<T>();
        issue.setup_common(context);
        issue.set_severity(severity);
        value.store(&mut issue.values);
        issue.values.set(keys::MESSAGE, value.message());
        issue
    }

    /// Creates an issue whose message is the description of `error`, which
    /// also becomes its cause.
    pub fn from_error(
        context: &dyn Context,
        severity: Severity,
        error: &(dyn std::error::Error + 'static),
    ) -> Self {
        let mut issue = Self::new(context, severity, error.to_string());
        issue.set_cause(Some(error));
        issue
    }

    /// Creates an empty issue of subtype `T`.
    ///
    /// Only the class keys are set. This is the constructor registered with
    /// the [`IssueFactory`].
    pub fn blank<T: IssueType>() -> Self {
        let class = IssueClass::of::<T>();
        let mut values = ValueTable::new();
        values.set(keys::CLASS, class.name());
        values.set(keys::RUST_TYPE, class.type_name());
        Self {
            class,
            values,
            cause: None,
            description: OnceLock::new(),
        }
    }

    /// Builder form of [`set_cause`](Self::set_cause).
    #[must_use]
    pub fn with_cause(mut self, cause: &(dyn std::error::Error + 'static)) -> Self {
        self.set_cause(Some(cause));
        self
    }

    fn setup_common(&mut self, context: &dyn Context) {
        let values = &mut self.values;
        values.set(keys::SOURCE_POSITION, context.position());
        if let Some(module) = context.module() {
            values.set(keys::SOURCE_MODULE, module);
        }
        if let Some(compiler) = context.compiler() {
            values.set(keys::COMPILER, compiler);
        }
        if let Some(compilation) = context.compilation() {
            values.set(keys::COMPILATION_TIME, compilation);
        }
        values.set(keys::COMPILATION_TARGET, context.host_type());
        if context.debug_level() >= 0 {
            values.set(keys::COMPILATION_DEBUG_LVL, context.debug_level().to_string());
        }
        for (ordinal, frame) in context.stack_frames().iter().enumerate() {
            values.set(keys::stack_frame(ordinal), frame.as_str());
        }
        values.set(keys::HOST_NAME, context.host_name());
        values.set(keys::HOST_TYPE, context.host_type());
        values.set(keys::PROCESS_ID, context.process_id().to_string());
        values.set(keys::PROCESS_PWD, context.cwd());
        values.set(keys::PROGRAM_NAME, context.program_name());
        if let Some(uid) = context.user_id() {
            values.set(keys::USER_ID, uid.to_string());
        }
        values.set(keys::USER_NAME, context.user_name());
        values.set(
            keys::TIME,
            chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, false),
        );
        values.set(keys::ERS_VERSION, env!("CARGO_PKG_VERSION"));
    }

    fn touch(&mut self) {
        self.description.take();
    }

    /// Descriptor of the subtype this issue was built as.
    ///
    /// An issue rebuilt from a class key that is not registered is a
    /// [`DefaultIssue`](crate::DefaultIssue); its table still carries the
    /// original key, see [`class_name`](Self::class_name).
    pub fn class(&self) -> &'static IssueClass {
        self.class
    }

    /// Class key stored in the table.
    pub fn class_name(&self) -> &str {
        self.values.get(keys::CLASS).unwrap_or(self.class.name())
    }

    /// Returns `true` if the issue carries the class key of `T`.
    pub fn is<T: IssueType>(&self) -> bool {
        self.class_name() == T::CLASS_NAME
    }

    /// Decodes the typed fields of `T`, if the issue is of that subtype.
    pub fn downcast<T: IssueType>(&self) -> Option<T> {
        if self.is::<T>() {
            T::load(&self.values)
        } else {
            None
        }
    }

    /// The cause of this issue, if it is an issue itself.
    pub fn cause(&self) -> Option<&Issue> {
        self.cause.as_deref()
    }

    /// Sets or clears the cause.
    ///
    /// A cause that is an [`Issue`] is deep-copied. In every case its
    /// description is stored under [`keys::CAUSE_TEXT`], so the cause
    /// survives transports that only keep the table.
    pub fn set_cause(&mut self, cause: Option<&(dyn std::error::Error + 'static)>) {
        match cause {
            Some(error) => {
                self.cause = error.downcast_ref::<Issue>().map(|issue| Box::new(issue.clone()));
                self.values.set(keys::CAUSE_TEXT, error.to_string());
            }
            None => {
                self.cause = None;
                self.values.remove(keys::CAUSE_TEXT);
            }
        }
        self.touch();
    }

    /// Replaces the typed cause without touching the table.
    pub(crate) fn restore_cause(&mut self, cause: Option<Issue>) {
        self.cause = cause.map(Box::new);
        self.touch();
    }

    /// Value stored for `key`, empty if there is none.
    pub fn value(&self, key: &str) -> &str {
        self.values.value(key)
    }

    /// Stores `value` under `key`. Empty values are ignored.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl ToString) {
        if self.values.set(key, value.to_string()) {
            self.touch();
        }
    }

    /// The whole value table.
    pub fn values(&self) -> &ValueTable {
        &self.values
    }

    /// Replaces the whole value table.
    pub fn set_values(&mut self, values: ValueTable) {
        self.values = values;
        self.touch();
    }

    /// Parameters of the issue: every entry whose key is not reserved,
    /// sorted by key.
    pub fn parameters(&self) -> Vec<(&str, &str)> {
        self.values
            .sorted()
            .into_iter()
            .filter(|(key, _)| !keys::is_reserved(key))
            .collect()
    }

    /// Severity, [`Severity::Unknown`] if none is stored.
    pub fn severity(&self) -> Severity {
        Severity::parse(self.value(keys::SEVERITY))
    }

    /// Sets the severity.
    pub fn set_severity(&mut self, severity: Severity) {
        self.set_value(keys::SEVERITY, severity.as_str());
    }

    /// Responsibility, [`Responsibility::Unknown`] if none is stored.
    pub fn responsibility(&self) -> Responsibility {
        Responsibility::parse(self.value(keys::RESPONSIBILITY))
    }

    /// Sets the responsibility.
    pub fn set_responsibility(&mut self, responsibility: Responsibility) {
        self.set_value(keys::RESPONSIBILITY, responsibility.as_str());
    }

    /// Transience, `None` if unknown.
    pub fn transience(&self) -> Option<bool> {
        severity::decode_transience(self.value(keys::TRANSIENCE))
    }

    /// Sets the transience.
    pub fn set_transience(&mut self, transient: bool) {
        self.set_value(keys::TRANSIENCE, severity::encode_transience(transient));
    }

    /// Human readable message.
    pub fn message(&self) -> &str {
        self.value(keys::MESSAGE)
    }

    /// Returns `true` for errors and fatal errors.
    pub fn is_error(&self) -> bool {
        matches!(self.severity(), Severity::Error | Severity::Fatal)
    }

    /// Time the issue was raised.
    pub fn time(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        chrono::DateTime::parse_from_rfc3339(self.value(keys::TIME)).ok()
    }

    /// Adds a qualifier. Adding one that is already present is a no-op.
    ///
    /// A qualifier containing separators (`,`, space or tab) adds each of
    /// its tokens.
    pub fn add_qualifier(&mut self, qualifier: &str) {
        let mut list = self.qualifiers();
        let before = list.len();
        for token in split_qualifiers(qualifier) {
            if !list.iter().any(|known| known == token) {
                list.push(token.to_owned());
            }
        }
        if list.len() != before {
            self.set_value(keys::QUALIFIERS, list.join(" "));
        }
    }

    /// Qualifiers, in the order they were added.
    pub fn qualifiers(&self) -> Vec<String> {
        self.qualifier_tokens().map(str::to_owned).collect()
    }

    /// Returns `true` if the issue carries `qualifier`.
    pub fn has_qualifier(&self, qualifier: &str) -> bool {
        self.qualifier_tokens().any(|token| token == qualifier)
    }

    fn qualifier_tokens(&self) -> impl Iterator<Item = &str> {
        split_qualifiers(self.value(keys::QUALIFIERS))
    }

    /// Human readable description: the message followed by the causal chain.
    ///
    /// Computed once and cached until the issue is modified.
    pub fn human_description(&self) -> &str {
        self.description.get_or_init(|| format::describe(self))
    }

    /// Serializable form of the issue and its causal chain.
    pub fn to_record(&self) -> IssueRecord {
        IssueRecord {
            values: self.values.clone(),
            cause: self.cause.as_ref().map(|cause| Box::new(cause.to_record())),
        }
    }
}

impl Clone for Issue {
    /// Rebuilds the issue through the global [`IssueFactory`], keyed on the
    /// stored class key.
    fn clone(&self) -> Self {
        IssueFactory::instance().build_from(self)
    }
}

impl PartialEq for Issue {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.cause == other.cause
    }
}

impl Eq for Issue {}

impl fmt::Debug for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Issue")
            .field("class", &self.class_name())
            .field("values", &self.values)
            .field("cause", &self.cause)
            .finish()
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.human_description())
    }
}

impl std::error::Error for Issue {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

fn split_qualifiers(list: &str) -> impl Iterator<Item = &str> {
    list.split([',', ' ', '\t']).filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalContext, builtin_issues::CannotOpenFile};

    fn issue(severity: Severity, message: &str) -> Issue {
        Issue::new(&LocalContext::capture(), severity, message)
    }

    static_assertions::assert_impl_all!(Issue: Send, Sync, std::error::Error, Clone);

    #[test]
    fn test_context_is_copied() {
        let context = LocalContext::capture().with_module("ers::tests");
        let issue = Issue::new(&context, Severity::Warning, "hello");
        assert_eq!(issue.value(keys::SOURCE_POSITION), context.position());
        assert_eq!(issue.value(keys::SOURCE_MODULE), "ers::tests");
        assert_eq!(issue.value(keys::PROCESS_ID), std::process::id().to_string());
        assert_eq!(issue.value(keys::CLASS), GenericIssue::CLASS_NAME);
        assert_eq!(issue.value(keys::ERS_VERSION), env!("CARGO_PKG_VERSION"));
        assert!(issue.time().is_some());
        assert_eq!(issue.severity(), Severity::Warning);
        assert_eq!(issue.message(), "hello");
    }

    #[test]
    fn test_empty_value_is_ignored() {
        let mut issue = issue(Severity::Information, "x");
        issue.set_value("key", "");
        assert_eq!(issue.value("key"), "");
        assert!(!issue.values().contains_key("key"));
        issue.set_value("key", 42);
        assert_eq!(issue.value("key"), "42");
    }

    #[test]
    fn test_qualifiers_are_a_set() {
        let mut issue = issue(Severity::Information, "x");
        issue.add_qualifier("x");
        issue.add_qualifier("y");
        issue.add_qualifier("x");
        issue.add_qualifier("  ");
        assert_eq!(issue.qualifiers(), ["x", "y"]);
        assert_eq!(issue.value(keys::QUALIFIERS), "x y");
        assert!(issue.has_qualifier("y"));
        assert!(!issue.has_qualifier("z"));
    }

    #[test]
    fn test_separated_qualifiers_are_added_once() {
        let mut issue = issue(Severity::Information, "x");
        issue.add_qualifier("a b");
        issue.add_qualifier("a b");
        issue.add_qualifier("c,d");
        issue.add_qualifier("c,d");
        issue.add_qualifier("d,\te");
        assert_eq!(issue.qualifiers(), ["a", "b", "c", "d", "e"]);
        assert_eq!(issue.value(keys::QUALIFIERS), "a b c d e");
        assert!(issue.has_qualifier("c"));
    }

    #[test]
    fn test_derived_attributes() {
        let mut issue = issue(Severity::Fatal, "x");
        assert!(issue.is_error());
        assert_eq!(issue.responsibility(), Responsibility::Unknown);
        assert_eq!(issue.transience(), None);

        issue.set_responsibility(Responsibility::Client);
        issue.set_transience(true);
        issue.set_severity(Severity::Debug1);
        assert_eq!(issue.responsibility(), Responsibility::Client);
        assert_eq!(issue.transience(), Some(true));
        assert!(!issue.is_error());

        issue.set_value(keys::SEVERITY, "bogus");
        assert_eq!(issue.severity(), Severity::Unknown);
    }

    #[test]
    fn test_cause_is_deep_copied() {
        let mut cause = issue(Severity::Warning, "root");
        let mut issue = issue(Severity::Error, "outer");
        issue.set_cause(Some(&cause));
        cause.set_value("late", "value");

        let stored = issue.cause().map(|c| c.value("late").to_owned());
        assert_eq!(stored.as_deref(), Some(""));
        assert_eq!(issue.value(keys::CAUSE_TEXT), "root");

        issue.set_cause(None);
        assert!(issue.cause().is_none());
        assert_eq!(issue.value(keys::CAUSE_TEXT), "");
    }

    #[test]
    fn test_foreign_cause_keeps_text_only() {
        let error = std::io::Error::other("pipe closed");
        let issue = Issue::from_error(&LocalContext::capture(), Severity::Error, &error);
        assert!(issue.cause().is_none());
        assert_eq!(issue.message(), "pipe closed");
        assert_eq!(issue.value(keys::CAUSE_TEXT), "pipe closed");
        assert!(std::error::Error::source(&issue).is_none());
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Issue::from_type(
            &LocalContext::capture(),
            Severity::Error,
            CannotOpenFile::new("/tmp/x"),
        );
        let mut copy = original.clone();
        assert_eq!(copy, original);
        assert_eq!(copy.class_name(), CannotOpenFile::CLASS_NAME);
        assert_eq!(copy.class().type_id(), original.class().type_id());

        copy.set_value("extra", "1");
        copy.add_qualifier("q");
        assert_ne!(copy, original);
        assert_eq!(original.value("extra"), "");
        assert!(original.qualifiers().is_empty());
    }

    #[test]
    fn test_equality_ignores_cause_identity() {
        let cause = issue(Severity::Warning, "root");
        let mut a = issue(Severity::Error, "outer");
        a.set_cause(Some(&cause));
        let b = a.clone();
        assert!(!core::ptr::eq(a.cause().unwrap(), b.cause().unwrap()));
        assert_eq!(a, b);

        let mut c = a.clone();
        c.restore_cause(None);
        assert_ne!(a, c);
    }

    #[test]
    fn test_description_is_refreshed() {
        let mut issue = issue(Severity::Error, "first");
        assert_eq!(issue.human_description(), "first");
        issue.set_value(keys::MESSAGE, "second");
        assert_eq!(issue.to_string(), "second");
    }

    #[test]
    fn test_downcast() {
        let issue = Issue::from_type(
            &LocalContext::capture(),
            Severity::Error,
            CannotOpenFile::new("/etc/shadow"),
        );
        assert!(issue.is::<CannotOpenFile>());
        assert!(!issue.is::<GenericIssue>());
        assert_eq!(
            issue.downcast::<CannotOpenFile>().map(|c| c.path().to_owned()),
            Some("/etc/shadow".to_owned())
        );
        assert!(issue.downcast::<GenericIssue>().is_none());
        assert_eq!(issue.parameters(), [("file_name", "/etc/shadow")]);
    }
}
