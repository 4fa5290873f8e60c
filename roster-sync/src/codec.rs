//! Entity key ↔ mirror path mapping.
//!
//! `cn=ops,ou=Groups,dc=example,dc=net` ↔ `dc=net/dc=example/ou=Groups/cn=ops`
//!
//! The least-specific component becomes the top-level directory and the
//! most-specific one the file name. The mapping must be a bijection, so
//! [`PathCodec::decode`] re-encodes its result and rejects any path that is
//! not the canonical encoding of the key it decodes to.

use thiserror::Error;

use roster_core::{EntityKey, PathEscaping};

/// A key or path that has no counterpart on the other side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("key '{key}' has an empty component")]
    EmptyComponent { key: String },

    #[error("key '{key}' has component '{component}' that cannot be a path segment")]
    ReservedComponent { key: String, component: String },

    #[error("key '{key}' has component '{component}' containing '/'")]
    SeparatorInComponent { key: String, component: String },

    #[error("path '{path}' is not the canonical encoding of any key")]
    NotCanonical { path: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathCodec {
    escaping: PathEscaping,
}

impl PathCodec {
    pub fn new(escaping: PathEscaping) -> Self {
        Self { escaping }
    }

    /// Key → mirror-relative path, `/`-separated.
    pub fn encode(&self, key: &EntityKey) -> Result<String, CodecError> {
        let mut segments = Vec::new();
        for component in key.components().into_iter().rev() {
            segments.push(self.encode_segment(key, component)?);
        }
        Ok(segments.join("/"))
    }

    /// Mirror-relative path → key.
    pub fn decode(&self, path: &str) -> Result<EntityKey, CodecError> {
        let not_canonical = || CodecError::NotCanonical {
            path: path.to_owned(),
        };
        let mut components = Vec::new();
        for segment in path.split('/').rev() {
            components.push(self.decode_segment(segment).ok_or_else(not_canonical)?);
        }
        let key = EntityKey::from(components.join(","));
        match self.encode(&key) {
            Ok(roundtrip) if roundtrip == path => Ok(key),
            _ => Err(not_canonical()),
        }
    }

    fn encode_segment(&self, key: &EntityKey, component: &str) -> Result<String, CodecError> {
        if component.is_empty() {
            return Err(CodecError::EmptyComponent {
                key: key.to_string(),
            });
        }
        match self.escaping {
            PathEscaping::Strict => {
                if component.contains('/') {
                    return Err(CodecError::SeparatorInComponent {
                        key: key.to_string(),
                        component: component.to_owned(),
                    });
                }
                if component == "." || component == ".." {
                    return Err(CodecError::ReservedComponent {
                        key: key.to_string(),
                        component: component.to_owned(),
                    });
                }
                Ok(component.to_owned())
            }
            PathEscaping::Percent => {
                let escaped = component.replace('%', "%25").replace('/', "%2F");
                if escaped == "." || escaped == ".." {
                    Ok(escaped.replace('.', "%2E"))
                } else {
                    Ok(escaped)
                }
            }
        }
    }

    fn decode_segment(&self, segment: &str) -> Option<String> {
        match self.escaping {
            PathEscaping::Strict => Some(segment.to_owned()),
            PathEscaping::Percent => percent_decode(segment),
        }
    }
}

fn percent_decode(segment: &str) -> Option<String> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = segment.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
