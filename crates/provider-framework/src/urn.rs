//! Type tokens and resource URNs.
//!
//! A type token is `pkg:module:Type`. Callers may instead name a resource by its
//! URN, `urn:pulumi:<stack>::<project>::<qualified type>::<name>`, where the
//! qualified type is a `$`-separated chain of parent types ending in the
//! resource's own token.

const URN_PREFIX: &str = "urn:pulumi:";
const URN_SEPARATOR: &str = "::";

/// Whether `token` has three non-empty `:`-separated segments.
pub fn is_valid_token(token: &str) -> bool {
    let segments: Vec<&str> = token.split(':').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}

/// Extracts the type token from a URN. Anything that is not a URN is returned
/// unchanged, so plain tokens pass straight through.
pub fn type_token(type_or_urn: &str) -> &str {
    let Some(rest) = type_or_urn.strip_prefix(URN_PREFIX) else {
        return type_or_urn;
    };
    let mut parts = rest.splitn(4, URN_SEPARATOR);
    let (Some(_stack), Some(_project), Some(qualified), Some(_name)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return type_or_urn;
    };
    qualified.rsplit('$').next().unwrap_or(qualified)
}

/// Extracts the resource name from a URN.
pub fn resource_name(urn: &str) -> Option<&str> {
    let rest = urn.strip_prefix(URN_PREFIX)?;
    rest.splitn(4, URN_SEPARATOR).nth(3)
}
