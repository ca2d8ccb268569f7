//! IRI resolution, relativization and splitting.

use oxiri::Iri;

use crate::error::ProcessError;

fn invalid(iri: &str, error: impl std::fmt::Display) -> ProcessError {
    ProcessError::InvalidIri {
        iri: iri.to_string(),
        message: error.to_string(),
    }
}

/// Parses an absolute IRI.
pub fn parse_base(iri: &str) -> Result<Iri<String>, ProcessError> {
    Iri::parse(iri.to_string()).map_err(|e| invalid(iri, e))
}

/// Resolves `reference` against `base`. Without a base the reference must
/// already be absolute.
pub fn resolve(base: Option<&Iri<String>>, reference: &str) -> Result<String, ProcessError> {
    match base {
        Some(base) => base
            .resolve(reference)
            .map(Iri::into_inner)
            .map_err(|e| invalid(reference, e)),
        None => parse_base(reference).map(Iri::into_inner),
    }
}

/// The IRI an `rdf:ID` stands for: the base with `#id` as fragment.
pub fn anchor(base: Option<&Iri<String>>, id: &str) -> Result<String, ProcessError> {
    resolve(base, &format!("#{id}"))
}

/// Writes `iri` relative to `base` when possible, otherwise unchanged.
pub fn relativize(base: &Iri<String>, iri: &str) -> String {
    match Iri::parse(iri.to_string()) {
        Ok(target) => match base.relativize(&target) {
            Ok(relative) => relative.into_inner(),
            Err(_) => iri.to_string(),
        },
        Err(_) => iri.to_string(),
    }
}

/// Splits an IRI into a namespace and a local part that is a valid XML
/// NCName, taking the longest such local part.
pub fn split_iri(iri: &str) -> Option<(&str, &str)> {
    let mut start = iri.len();
    for (index, c) in iri.char_indices().rev() {
        if !is_name_char(c) {
            break;
        }
        start = index;
    }
    let offset = iri[start..]
        .char_indices()
        .find(|(_, c)| is_name_start_char(*c))
        .map(|(i, _)| i)?;
    let split = start + offset;
    if split == 0 {
        return None;
    }
    Some((&iri[..split], &iri[split..]))
}

/// Returns true if `name` is an XML NCName (no colon).
pub fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first) => chars.all(is_name_char),
        _ => false,
    }
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z'
        | '_'
        | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c, '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}
