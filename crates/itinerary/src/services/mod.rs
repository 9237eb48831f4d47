//! External identity service trait with HTTP and in-memory implementations.

pub mod http;
pub mod identity;

pub use http::HttpIdentityValidator;
pub use identity::{AuthorInfo, IdentityError, IdentityValidator, InMemoryIdentityValidator};
