//! Literal values: plain, typed and XML literals.
//!
//! Equality follows RDF lexical identity with one deliberate exception:
//! plain literals compare by lexical form only, so `"v"` and `"v"@en` are
//! equal. Ordering is total and agrees with equality.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::XmlError;
use crate::vocab::{rdf, xsd};
use crate::xml::{write_fragment, XmlNode};

/// Language-specific placement of letters the code point order gets wrong.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
enum Tailoring {
    #[default]
    Root,
    /// `å`, `ä`, `ö` follow `z` (Swedish, Finnish).
    Swedish,
    /// `æ`, `ø`, `å` follow `z`; `ä` and `ö` sort with `æ` and `ø` (Danish, Norwegian).
    Danish,
    /// Umlauts sort as their base letter and `ß` as `ss` (German).
    German,
    /// `ñ` sorts between `n` and `o` (Spanish).
    Spanish,
}

impl Tailoring {
    fn for_language(language: &str) -> Self {
        let primary = language.split(['-', '_']).next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "sv" | "fi" => Tailoring::Swedish,
            "da" | "nb" | "nn" | "no" => Tailoring::Danish,
            "de" => Tailoring::German,
            "es" => Tailoring::Spanish,
            _ => Tailoring::Root,
        }
    }

    /// Pushes the primary weights of an already lowercased character.
    fn weigh(self, c: char, out: &mut Vec<u32>) {
        let after = |base: char, rank: u32| ((base as u32) << 8) | rank;
        let weight = match (self, c) {
            (Tailoring::Swedish, 'å') => after('z', 1),
            (Tailoring::Swedish, 'ä' | 'æ') => after('z', 2),
            (Tailoring::Swedish, 'ö' | 'ø') => after('z', 3),
            (Tailoring::Danish, 'æ' | 'ä') => after('z', 1),
            (Tailoring::Danish, 'ø' | 'ö') => after('z', 2),
            (Tailoring::Danish, 'å') => after('z', 3),
            (Tailoring::German, 'ä') => after('a', 0),
            (Tailoring::German, 'ö') => after('o', 0),
            (Tailoring::German, 'ü') => after('u', 0),
            (Tailoring::German, 'ß') => {
                out.extend([after('s', 0), after('s', 0)]);
                return;
            }
            (Tailoring::Spanish, 'ñ') => after('n', 1),
            _ => after(c, 0),
        };
        out.push(weight);
    }
}

/// String collation used to order literals.
///
/// Strings compare by primary weights first: case is folded and the
/// language's tailoring moves letters such as `å` or `ñ` to their place in
/// that alphabet. Ties fall back to code point order, so two strings collate
/// equal only when they are identical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collator {
    language: Option<String>,
    tailoring: Tailoring,
}

impl Collator {
    /// Returns the collator for a language tag.
    pub fn for_language(language: &str) -> Self {
        Self {
            language: Some(language.to_ascii_lowercase()),
            tailoring: Tailoring::for_language(language),
        }
    }

    /// The language this collator is bound to, if any.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn primary_key(&self, text: &str) -> Vec<u32> {
        let mut key = Vec::with_capacity(text.len());
        for c in text.chars().flat_map(char::to_lowercase) {
            self.tailoring.weigh(c, &mut key);
        }
        key
    }

    /// Compares two strings.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.primary_key(a)
            .cmp(&self.primary_key(b))
            .then_with(|| a.cmp(b))
    }
}

/// A literal without datatype, with an optional language tag.
#[derive(Debug, Clone, Eq)]
pub struct PlainLiteral {
    lexical: String,
    language: Option<String>,
}

impl PlainLiteral {
    /// Creates a plain literal.
    pub fn new(lexical: impl Into<String>, language: Option<&str>) -> Self {
        Self {
            lexical: lexical.into(),
            language: language.filter(|l| !l.is_empty()).map(str::to_string),
        }
    }

    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn same_language(&self, other: &PlainLiteral) -> bool {
        match (&self.language, &other.language) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Picks the collator for comparing `self` with `other`: the shared
    /// language's collator, or the root collator when the languages differ.
    pub fn collator_with(&self, other: &PlainLiteral) -> Collator {
        match &self.language {
            Some(language) if self.same_language(other) => Collator::for_language(language),
            _ => Collator::default(),
        }
    }

    /// Compares lexical forms with the collator [`collator_with`] selects.
    ///
    /// Unlike `Ord`, this is not a total order over literals of mixed
    /// languages, so sort with it only within one language.
    ///
    /// [`collator_with`]: PlainLiteral::collator_with
    pub fn collate(&self, other: &PlainLiteral) -> Ordering {
        self.collator_with(other).compare(&self.lexical, &other.lexical)
    }
}

impl PartialEq for PlainLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.lexical == other.lexical
    }
}

impl Hash for PlainLiteral {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lexical.hash(state);
    }
}

/// A literal with a datatype IRI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedLiteral {
    lexical: String,
    datatype: String,
}

impl TypedLiteral {
    /// Creates a typed literal from its lexical form.
    pub fn new(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: datatype.into(),
        }
    }

    /// Creates a typed literal from any value with a string form.
    pub fn from_value<T: fmt::Display>(value: T, datatype: impl Into<String>) -> Self {
        Self::new(value.to_string(), datatype)
    }

    /// An `xsd:integer`.
    pub fn integer(value: i64) -> Self {
        Self::from_value(value, xsd::INTEGER)
    }

    /// An `xsd:double`.
    pub fn double(value: f64) -> Self {
        Self::from_value(value, xsd::DOUBLE)
    }

    /// An `xsd:boolean`.
    pub fn boolean(value: bool) -> Self {
        Self::from_value(value, xsd::BOOLEAN)
    }

    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    /// Parses the lexical form as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        self.lexical.trim().parse().ok()
    }

    /// Parses the lexical form as a floating point number.
    pub fn as_f64(&self) -> Option<f64> {
        match self.lexical.trim() {
            "INF" => Some(f64::INFINITY),
            "-INF" => Some(f64::NEG_INFINITY),
            other => other.parse().ok(),
        }
    }

    /// Parses the lexical form as an `xsd:boolean`.
    pub fn as_bool(&self) -> Option<bool> {
        match self.lexical.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

/// A literal whose value is an XML fragment (`rdf:XMLLiteral`).
#[derive(Debug, Clone, Eq)]
pub struct XmlLiteral {
    nodes: Vec<XmlNode>,
    lexical: String,
}

impl XmlLiteral {
    /// Creates an XML literal; the lexical form is the serialized fragment.
    pub fn new(nodes: Vec<XmlNode>) -> Result<Self, XmlError> {
        let lexical = write_fragment(&nodes)?;
        Ok(Self { nodes, lexical })
    }

    pub fn nodes(&self) -> &[XmlNode] {
        &self.nodes
    }

    pub fn lexical(&self) -> &str {
        &self.lexical
    }
}

impl PartialEq for XmlLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.lexical == other.lexical
    }
}

impl Hash for XmlLiteral {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lexical.hash(state);
    }
}

/// An RDF literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Plain(PlainLiteral),
    Typed(TypedLiteral),
    Xml(XmlLiteral),
}

impl Literal {
    /// Shorthand for a plain literal without language.
    pub fn plain(lexical: impl Into<String>) -> Self {
        Literal::Plain(PlainLiteral::new(lexical, None))
    }

    /// Shorthand for a plain literal with a language tag.
    pub fn with_language(lexical: impl Into<String>, language: &str) -> Self {
        Literal::Plain(PlainLiteral::new(lexical, Some(language)))
    }

    /// Shorthand for a typed literal.
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Literal::Typed(TypedLiteral::new(lexical, datatype))
    }

    /// The lexical form.
    pub fn lexical_form(&self) -> &str {
        match self {
            Literal::Plain(l) => l.lexical(),
            Literal::Typed(l) => l.lexical(),
            Literal::Xml(l) => l.lexical(),
        }
    }

    /// The language tag of a plain literal.
    pub fn language(&self) -> Option<&str> {
        match self {
            Literal::Plain(l) => l.language(),
            _ => None,
        }
    }

    /// The datatype IRI; plain literals have none.
    pub fn datatype(&self) -> Option<&str> {
        match self {
            Literal::Plain(_) => None,
            Literal::Typed(l) => Some(l.datatype()),
            Literal::Xml(_) => Some(rdf::XML_LITERAL),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Literal::Plain(_) => 0,
            Literal::Typed(_) => 1,
            Literal::Xml(_) => 2,
        }
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // Language is not part of equality, so a total order cannot use it.
            (Literal::Plain(a), Literal::Plain(b)) => {
                Collator::default().compare(a.lexical(), b.lexical())
            }
            (Literal::Typed(a), Literal::Typed(b)) => Collator::default()
                .compare(a.lexical(), b.lexical())
                .then_with(|| a.datatype().cmp(b.datatype())),
            (Literal::Xml(a), Literal::Xml(b)) => a.lexical().cmp(b.lexical()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.lexical_form())?;
        if let Some(language) = self.language() {
            write!(f, "@{language}")
        } else if let Some(datatype) = self.datatype() {
            write!(f, "^^<{datatype}>")
        } else {
            Ok(())
        }
    }
}

impl From<PlainLiteral> for Literal {
    fn from(literal: PlainLiteral) -> Self {
        Literal::Plain(literal)
    }
}

impl From<TypedLiteral> for Literal {
    fn from(literal: TypedLiteral) -> Self {
        Literal::Typed(literal)
    }
}

impl From<XmlLiteral> for Literal {
    fn from(literal: XmlLiteral) -> Self {
        Literal::Xml(literal)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::xml::Document;

    #[test]
    fn test_plain_equality_ignores_language() {
        assert_eq!(Literal::plain("v"), Literal::with_language("v", "en"));
        assert_ne!(Literal::plain("v"), Literal::plain("w"));
        assert_eq!(Literal::with_language("v", "").language(), None);
    }

    #[test]
    fn test_typed_equality_needs_datatype_and_value() {
        assert_eq!(Literal::from(TypedLiteral::integer(5)), Literal::typed("5", xsd::INTEGER));
        assert_ne!(Literal::typed("5", xsd::INTEGER), Literal::typed("5", xsd::LONG));
        assert_ne!(Literal::typed("5", xsd::INTEGER), Literal::plain("5"));
    }

    #[test]
    fn test_typed_accessors() {
        assert_eq!(TypedLiteral::integer(-42).as_i64(), Some(-42));
        assert_eq!(TypedLiteral::double(1.5).as_f64(), Some(1.5));
        assert_eq!(TypedLiteral::boolean(true).as_bool(), Some(true));
        assert_eq!(TypedLiteral::new("nope", xsd::BOOLEAN).as_bool(), None);
    }

    #[test]
    fn test_xml_literal_lexical_form() {
        let doc = Document::parse_str(r#"<w xmlns:h="urn:h#"><h:b>x</h:b> tail</w>"#).unwrap();
        let literal = XmlLiteral::new(doc.root.children.clone()).unwrap();
        assert_eq!(literal.lexical(), r#"<h:b xmlns:h="urn:h#">x</h:b> tail"#);
        assert_eq!(Literal::Xml(literal).datatype(), Some(rdf::XML_LITERAL));
    }

    #[test]
    fn test_mixed_language_sort() {
        let mut literals = vec![
            Literal::with_language("b", "de"),
            Literal::plain("B"),
            Literal::with_language("a", "en"),
            Literal::with_language("A", "de"),
            Literal::typed("1", xsd::INTEGER),
        ];
        literals.sort();
        let lexical: Vec<_> = literals.iter().map(|l| l.lexical_form()).collect();
        assert_eq!(lexical, vec!["A", "a", "B", "b", "1"]);
    }

    #[test]
    fn test_language_tailoring_changes_order() {
        let root = Collator::default();
        let swedish = Collator::for_language("sv-SE");
        let german = Collator::for_language("de");
        let spanish = Collator::for_language("es");

        assert_eq!(root.compare("ä", "å"), Ordering::Less);
        assert_eq!(swedish.compare("ä", "å"), Ordering::Greater);
        assert_eq!(swedish.compare("ö", "z"), Ordering::Greater);

        assert_eq!(root.compare("äb", "ac"), Ordering::Greater);
        assert_eq!(german.compare("äb", "ac"), Ordering::Less);
        assert_eq!(german.compare("straße", "strasse"), Ordering::Greater);
        assert_eq!(german.compare("straße", "strast"), Ordering::Less);

        assert_eq!(root.compare("ñu", "o"), Ordering::Greater);
        assert_eq!(spanish.compare("ñu", "o"), Ordering::Less);
        assert_eq!(spanish.compare("ñ", "n"), Ordering::Greater);
    }

    #[test]
    fn test_collate_selects_collator_by_shared_language() {
        let a = PlainLiteral::new("ä", Some("sv"));
        let b = PlainLiteral::new("å", Some("SV"));
        assert_eq!(a.collator_with(&b).language(), Some("sv"));
        assert_eq!(a.collate(&b), Ordering::Greater);

        let c = PlainLiteral::new("å", Some("en"));
        assert_eq!(a.collator_with(&c).language(), None);
        assert_eq!(a.collate(&c), Ordering::Less);

        // Ord stays total and uses the root collator regardless.
        assert_eq!(Literal::Plain(a).cmp(&Literal::Plain(b)), Ordering::Less);
    }

    #[test]
    fn test_display() {
        assert_eq!(Literal::with_language("hi", "en").to_string(), "\"hi\"@en");
        assert_eq!(
            Literal::typed("1", xsd::INTEGER).to_string(),
            "\"1\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
    }

    fn arb_literal() -> impl Strategy<Value = Literal> {
        let language = prop::option::of(prop::sample::select(vec!["en", "de", "EN", "fr"]));
        prop_oneof![
            ("[a-cA-C]{0,3}", language)
                .prop_map(|(lexical, language)| Literal::Plain(PlainLiteral::new(lexical, language))),
            ("[a-cA-C0-9]{0,3}", prop::sample::select(vec![xsd::INTEGER, xsd::STRING]))
                .prop_map(|(lexical, datatype)| Literal::typed(lexical, datatype)),
        ]
    }

    proptest! {
        #[test]
        fn prop_ordering_is_antisymmetric_and_matches_equality(a in arb_literal(), b in arb_literal()) {
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
            prop_assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
        }

        #[test]
        fn prop_sorting_yields_a_consistent_order(mut literals in prop::collection::vec(arb_literal(), 0..12)) {
            literals.sort();
            for window in literals.windows(2) {
                prop_assert_ne!(window[0].cmp(&window[1]), Ordering::Greater);
            }
        }

        #[test]
        fn prop_mixed_languages_follow_default_collator(a in "[a-cA-C]{0,3}", b in "[a-cA-C]{0,3}") {
            let left = Literal::with_language(a.clone(), "en");
            let right = Literal::with_language(b.clone(), "de");
            prop_assert_eq!(left.cmp(&right), Collator::default().compare(&a, &b));
        }
    }
}
