mod http;
mod source;

#[cfg(test)]
pub(crate) mod fake;

pub use self::{http::HttpClient, source::ArticleSource};
