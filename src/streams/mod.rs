//! Streams provided by the library.
//!
//! They are registered by the default plugin module,
//! [`BASE_MODULE`](crate::plugin::BASE_MODULE):
//!
//! | name | kind | behavior |
//! |---|---|---|
//! | `null` | output | swallows the issue |
//! | `stdout(v)`, `stderr(v)` | output | prints at verbosity `v`, forwards |
//! | `throw` | output | forwards, then returns the issue as an error |
//! | `filter(a,!b)` | output | forwards issues qualified `a` and not `b` |
//! | `file(path)` | output | appends one JSON record per line, forwards |
//! | `file` | input | reads back what `file(path)` wrote |

mod file;
mod filter;
mod null;
mod standard;
mod throw;

pub use self::{
    file::{FileInStream, FileOutStream},
    filter::FilterStream,
    null::NullStream,
    standard::{Console, StandardStream},
    throw::ThrowStream,
};
use crate::{InputStream, OutputStream, StreamFactory};

/// Registers every built-in stream with `factory`.
pub fn register(factory: &StreamFactory) {
    factory.register_out_stream("null", |_: &str| {
        Ok(Box::new(NullStream) as Box<dyn OutputStream>)
    });
    factory.register_out_stream("stdout", |param: &str| {
        Ok(Box::new(StandardStream::from_param(Console::Stdout, param)) as Box<dyn OutputStream>)
    });
    factory.register_out_stream("stderr", |param: &str| {
        Ok(Box::new(StandardStream::from_param(Console::Stderr, param)) as Box<dyn OutputStream>)
    });
    factory.register_out_stream("throw", |_: &str| {
        Ok(Box::new(ThrowStream) as Box<dyn OutputStream>)
    });
    factory.register_out_stream("filter", |param: &str| {
        Ok(Box::new(FilterStream::new(param)) as Box<dyn OutputStream>)
    });
    factory.register_out_stream("file", |param: &str| {
        FileOutStream::open(param).map(|stream| Box::new(stream) as Box<dyn OutputStream>)
    });
    factory.register_in_stream("file", |params: &[String]| {
        let path = params.first().map_or("", String::as_str);
        FileInStream::open(path).map(|stream| Box::new(stream) as Box<dyn InputStream>)
    });
}
