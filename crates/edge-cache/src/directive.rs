//! Fetch call inputs and their canonical directive record.

use http::Method;
use serde::{Deserialize, Serialize};

use crate::error::DirectiveError;
use crate::key::FetchKey;

/// Explicit cache mode requested for a fetch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// No explicit cache mode.
    #[default]
    Unset,
    /// Cache the result until explicitly revalidated.
    ForceCache,
    /// Never cache the result.
    NoStore,
}

impl CacheMode {
    /// Get the directive string, if set.
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::Unset => None,
            Self::ForceCache => Some("force-cache"),
            Self::NoStore => Some("no-store"),
        }
    }

    /// Check if an explicit mode was given.
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Returns `self` if set, otherwise `other`.
    fn or(self, other: CacheMode) -> CacheMode {
        if self.is_set() {
            self
        } else {
            other
        }
    }
}

/// Options given when issuing a fetch call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Request method override.
    pub method: Option<Method>,
    /// Explicit cache mode.
    pub cache: CacheMode,
    /// Revalidation interval in seconds.
    pub revalidate: Option<u32>,
    /// Cache tags for invalidation.
    pub tags: Vec<String>,
}

impl FetchOptions {
    /// Create empty fetch options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the explicit cache mode.
    pub fn cache(mut self, mode: CacheMode) -> Self {
        self.cache = mode;
        self
    }

    /// Set the revalidation interval in seconds.
    pub fn revalidate(mut self, seconds: u32) -> Self {
        self.revalidate = Some(seconds);
        self
    }

    /// Add a cache tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A prepared request object that carries its own cache override.
///
/// The override is fixed at construction and takes precedence over the
/// cache mode given when the fetch call is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLike {
    url: String,
    method: Method,
    cache: CacheMode,
}

impl RequestLike {
    /// Create a GET request object without a cache override.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            cache: CacheMode::Unset,
        }
    }

    /// Set the request method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the embedded cache override.
    pub fn with_cache(mut self, mode: CacheMode) -> Self {
        self.cache = mode;
        self
    }

    /// Get the URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the embedded cache override.
    pub fn cache(&self) -> CacheMode {
        self.cache
    }
}

/// Input to a fetch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchInput {
    /// A URL string with call-site options.
    Url { url: String, options: FetchOptions },
    /// A request-like object with call-site options.
    Request {
        request: RequestLike,
        options: FetchOptions,
    },
}

impl FetchInput {
    /// A plain URL with default options.
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url {
            url: url.into(),
            options: FetchOptions::default(),
        }
    }

    /// A plain URL with options.
    pub fn url_with(url: impl Into<String>, options: FetchOptions) -> Self {
        Self::Url {
            url: url.into(),
            options,
        }
    }

    /// A request-like object with default options.
    pub fn request(request: RequestLike) -> Self {
        Self::Request {
            request,
            options: FetchOptions::default(),
        }
    }

    /// A request-like object with options.
    pub fn request_with(request: RequestLike, options: FetchOptions) -> Self {
        Self::Request { request, options }
    }

    /// Get the call-site options.
    pub fn options(&self) -> &FetchOptions {
        match self {
            Self::Url { options, .. } | Self::Request { options, .. } => options,
        }
    }
}

impl From<&str> for FetchInput {
    fn from(url: &str) -> Self {
        Self::url(url)
    }
}

impl From<String> for FetchInput {
    fn from(url: String) -> Self {
        Self::url(url)
    }
}

impl From<RequestLike> for FetchInput {
    fn from(request: RequestLike) -> Self {
        Self::request(request)
    }
}

/// Which kind of input a fetch call was issued with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    Plain,
    RequestLike,
}

/// Canonical directive record for one fetch call.
///
/// Built once per call by [`normalize`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCallSpec {
    /// URL as given by the caller.
    pub url: String,
    /// Cache key derived from the URL and query.
    pub key: FetchKey,
    /// Request method.
    pub method: Method,
    /// Effective explicit cache mode after override precedence.
    pub explicit_cache_mode: CacheMode,
    /// Requested revalidation interval in seconds.
    pub revalidate_seconds: Option<u32>,
    /// Input kind the call was issued with.
    pub input_kind: InputKind,
    /// Cache tags for invalidation.
    pub tags: Vec<String>,
}

impl FetchCallSpec {
    /// Check if the method is one the data cache can store by default.
    pub fn is_cacheable_method(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }
}

impl TryFrom<&FetchInput> for FetchCallSpec {
    type Error = DirectiveError;

    fn try_from(input: &FetchInput) -> Result<Self, Self::Error> {
        normalize(input)
    }
}

/// Normalize a fetch input into its canonical directive record.
///
/// A request-like object's own cache override wins over the call-site
/// cache mode; the call-site method wins over the object's method.
pub fn normalize(input: &FetchInput) -> Result<FetchCallSpec, DirectiveError> {
    let (url, method, cache, kind) = match input {
        FetchInput::Url { url, options } => (
            url.as_str(),
            options.method.clone().unwrap_or(Method::GET),
            options.cache,
            InputKind::Plain,
        ),
        FetchInput::Request { request, options } => (
            request.url(),
            options
                .method
                .clone()
                .unwrap_or_else(|| request.method().clone()),
            request.cache().or(options.cache),
            InputKind::RequestLike,
        ),
    };

    let key = FetchKey::parse(url)?;
    let options = input.options();

    Ok(FetchCallSpec {
        url: url.trim().to_string(),
        key,
        method,
        explicit_cache_mode: cache,
        revalidate_seconds: options.revalidate,
        input_kind: kind,
        tags: options.tags.clone(),
    })
}
