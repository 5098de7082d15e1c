//! Category paths such as `Tanakh/Torah/Genesis`.
//!
//! Paths stay `/`-joined strings on the wire; internally they are segment
//! sequences so prefix tests compare whole segments.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct FacetPath(Vec<String>);

impl FacetPath {
    pub const SEPARATOR: char = '/';

    pub fn parse(key: &str) -> Self {
        Self(key.split(Self::SEPARATOR).map(str::to_string).collect())
    }

    pub fn root() -> Self { Self(Vec::new()) }

    pub fn segments(&self) -> &[String] { &self.0 }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn first(&self) -> Option<&str> { self.0.first().map(String::as_str) }

    pub fn last(&self) -> Option<&str> { self.0.last().map(String::as_str) }

    pub fn push(&mut self, segment: impl Into<String>) { self.0.push(segment.into()); }

    pub fn pop(&mut self) -> Option<String> { self.0.pop() }

    /// True when `self` equals `prefix` or descends from it.
    pub fn starts_with(&self, prefix: &FacetPath) -> bool {
        self.0.len() >= prefix.0.len() && self.0.iter().zip(&prefix.0).all(|(a, b)| a == b)
    }

    pub fn to_key(&self) -> String { self.0.join("/") }
}

impl fmt::Display for FacetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.to_key()) }
}

impl From<&str> for FacetPath {
    fn from(key: &str) -> Self { Self::parse(key) }
}
