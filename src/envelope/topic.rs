//! Topic names and subscription filters

use crate::error::{EnvelopeError, Result};

/// A validated, non-empty topic string.
///
/// Topics are flat: no hierarchy or wildcard syntax, only the
/// prefix relation applied by [`TopicFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    /// Create a topic, rejecting the empty string.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(EnvelopeError::EmptyTopic.into());
        }
        Ok(Self(name))
    }

    /// The topic as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A subscription filter matched against topics by prefix.
///
/// A filter matches every topic it is a prefix of; an exact topic name is
/// therefore also a valid filter. The empty filter matches everything. The
/// same rule is applied at the single filtering hop (the broker), once per
/// envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicFilter(String);

impl TopicFilter {
    /// Create a filter. Empty is allowed and subscribes to all topics.
    pub fn new(filter: impl Into<String>) -> Self {
        Self(filter.into())
    }

    /// Filter that matches every topic.
    pub fn all() -> Self {
        Self(String::new())
    }

    /// Whether this filter matches the given topic.
    pub fn matches(&self, topic: &Topic) -> bool {
        topic.as_str().starts_with(&self.0)
    }

    /// The filter as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
