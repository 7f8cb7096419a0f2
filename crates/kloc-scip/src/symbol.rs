//! Symbol grammar decoder.
//!
//! Index symbols are opaque strings with a fixed grammar:
//!
//! ```text
//! <symbol>     := <scheme> ' ' <manager> ' ' <package> ' ' <version> ' ' <descriptor>+
//!               | 'local ' <local-id>
//! <descriptor> := <name> '/'                  namespace
//!               | <name> '#'                  type
//!               | <name> '.'                  term
//!               | <name> '(' <disamb>? ').'   method
//!               | '(' <name> ')'              parameter
//!               | '[' <name> ']'              type parameter
//!               | <name> ':'                  meta
//!               | <name> '!'                  macro
//! <name>       := [A-Za-z0-9_+$-]+ | '`' (any | '``')* '`'
//! ```
//!
//! A double space inside a header component stands for a literal space.
//!
//! ## Examples
//!
//! ```text
//! scip-php composer app 1.0 App/Entity/User#               class     App\Entity\User
//! scip-php composer app 1.0 App/Entity/User#getId().       method    App\Entity\User::getId()
//! scip-php composer app 1.0 App/Entity/User#$name.         property  App\Entity\User::$name
//! scip-php composer app 1.0 App/Entity/User#getId().($id)  argument  App\Entity\User::getId()::$id
//! scip-php composer app 1.0 App/helper().                  function  App\helper()
//! ```
//!
//! Decoding never fails the pipeline: symbols outside the supported shapes
//! come back as [`Unparseable`] and are skipped for node creation.

use std::fmt;

use winnow::combinator::{alt, delimited, repeat};
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::token::{any, none_of, take_till, take_while};
use winnow::ModalResult;

use kloc_core::config::DEFAULT_NAMESPACE_SEPARATOR;
use kloc_core::graph::NodeKind;
use kloc_core::index::SymbolHint;

// ============================================================================
// Grammar Types
// ============================================================================

/// One descriptor of a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Namespace(String),
    Type(String),
    Term(String),
    Method { name: String, disambiguator: String },
    Parameter(String),
    TypeParameter(String),
    Meta(String),
    Macro(String),
}

impl Descriptor {
    pub fn name(&self) -> &str {
        match self {
            Descriptor::Namespace(name)
            | Descriptor::Type(name)
            | Descriptor::Term(name)
            | Descriptor::Parameter(name)
            | Descriptor::TypeParameter(name)
            | Descriptor::Meta(name)
            | Descriptor::Macro(name) => name,
            Descriptor::Method { name, .. } => name,
        }
    }

    fn is_type(&self) -> bool {
        matches!(self, Descriptor::Type(_))
    }

    fn is_method(&self) -> bool {
        matches!(self, Descriptor::Method { .. })
    }
}

/// A descriptor with the byte offset where it ends in the symbol string.
///
/// `symbol[..end]` is the symbol of the entity the descriptor names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub descriptor: Descriptor,
    pub end: usize,
}

/// A symbol split into its header and descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSymbol {
    pub scheme: String,
    pub manager: String,
    pub package: String,
    pub version: String,
    pub segments: Vec<Segment>,
    /// Byte offset of the first descriptor.
    pub descriptor_start: usize,
}

impl ParsedSymbol {
    /// Parse a symbol string.
    pub fn parse(symbol: &str) -> Result<Self, Unparseable> {
        if symbol.starts_with("local ") {
            return Err(Unparseable::Local);
        }

        let mut input = symbol;
        let (scheme, manager, package, version) =
            parse_header(&mut input).map_err(|_| Unparseable::Malformed)?;
        let descriptor_start = symbol.len() - input.len();

        let mut segments = Vec::new();
        while !input.is_empty() {
            let descriptor = parse_descriptor(&mut input).map_err(|_| Unparseable::Malformed)?;
            segments.push(Segment {
                descriptor,
                end: symbol.len() - input.len(),
            });
        }

        if segments.is_empty() {
            return Err(Unparseable::Malformed);
        }

        Ok(ParsedSymbol {
            scheme,
            manager,
            package,
            version,
            segments,
            descriptor_start,
        })
    }

    pub fn last(&self) -> &Descriptor {
        // parse() rejects symbols without descriptors
        &self.segments[self.segments.len() - 1].descriptor
    }

    /// The segment directly enclosing the last descriptor.
    fn parent(&self) -> Option<&Segment> {
        let n = self.segments.len();
        if n >= 2 {
            self.segments.get(n - 2)
        } else {
            None
        }
    }
}

/// Why a symbol cannot become a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unparseable {
    /// Document-local symbol (`local N`).
    Local,
    /// Does not follow the symbol grammar.
    Malformed,
    /// Grammatical, but names nothing the graph models (type parameters,
    /// locals inside methods, meta and macro descriptors).
    Unsupported,
}

impl fmt::Display for Unparseable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Unparseable::Local => "local symbol",
            Unparseable::Malformed => "malformed symbol",
            Unparseable::Unsupported => "unsupported descriptor",
        };
        f.write_str(text)
    }
}

// ============================================================================
// Parsers
// ============================================================================

/// Parse one header component; a doubled space is a literal space.
fn parse_component(input: &mut &str) -> ModalResult<String> {
    repeat(1.., alt(("  ".value(' '), none_of(' ')))).parse_next(input)
}

fn parse_header(input: &mut &str) -> ModalResult<(String, String, String, String)> {
    let scheme = parse_component(input)?;
    ' '.parse_next(input)?;
    let manager = parse_component(input)?;
    ' '.parse_next(input)?;
    let package = parse_component(input)?;
    ' '.parse_next(input)?;
    let version = parse_component(input)?;
    ' '.parse_next(input)?;
    Ok((scheme, manager, package, version))
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '+' | '-' | '$')
}

fn parse_simple_name(input: &mut &str) -> ModalResult<String> {
    take_while(1.., is_name_char)
        .map(|s: &str| s.to_string())
        .parse_next(input)
}

/// Parse a backtick-escaped name; a doubled backtick is a literal backtick.
fn parse_escaped_name(input: &mut &str) -> ModalResult<String> {
    '`'.parse_next(input)?;
    let name: String = repeat(0.., alt(("``".value('`'), none_of('`')))).parse_next(input)?;
    '`'.parse_next(input)?;
    Ok(name)
}

fn parse_name(input: &mut &str) -> ModalResult<String> {
    alt((parse_escaped_name, parse_simple_name)).parse_next(input)
}

fn parse_descriptor(input: &mut &str) -> ModalResult<Descriptor> {
    alt((
        delimited('(', parse_name, ')').map(Descriptor::Parameter),
        delimited('[', parse_name, ']').map(Descriptor::TypeParameter),
        parse_named_descriptor,
    ))
    .parse_next(input)
}

fn parse_named_descriptor(input: &mut &str) -> ModalResult<Descriptor> {
    let name = parse_name(input)?;
    match any.parse_next(input)? {
        '/' => Ok(Descriptor::Namespace(name)),
        '#' => Ok(Descriptor::Type(name)),
        '.' => Ok(Descriptor::Term(name)),
        ':' => Ok(Descriptor::Meta(name)),
        '!' => Ok(Descriptor::Macro(name)),
        '(' => {
            let disambiguator = take_till(0.., ')').parse_next(input)?;
            ").".parse_next(input)?;
            Ok(Descriptor::Method {
                name,
                disambiguator: disambiguator.to_string(),
            })
        }
        _ => Err(ErrMode::from_input(input)),
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Kind evidence gathered from symbol metadata.
pub trait KindHints {
    /// Kind reported by the indexer (or derived from the signature).
    fn hint(&self, symbol: &str) -> Option<SymbolHint>;

    /// Type flavour inferred from documentation.
    fn documented_kind(&self, symbol: &str) -> Option<NodeKind>;
}

/// No metadata at all: decoding falls back to grammar and naming.
pub struct NoHints;

impl KindHints for NoHints {
    fn hint(&self, _symbol: &str) -> Option<SymbolHint> {
        None
    }

    fn documented_kind(&self, _symbol: &str) -> Option<NodeKind> {
        None
    }
}

/// A symbol decoded into graph terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSymbol {
    pub kind: NodeKind,
    pub name: String,
    pub fqn: String,
    /// Symbol of the structural parent; `None` for top-level symbols.
    pub container: Option<String>,
    /// The descriptor part of the symbol (everything after the header).
    pub descriptor_path: String,
}

/// Decodes symbols into kind, name, FQN and container.
#[derive(Debug, Clone)]
pub struct SymbolDecoder {
    separator: String,
}

impl Default for SymbolDecoder {
    fn default() -> Self {
        SymbolDecoder::new(DEFAULT_NAMESPACE_SEPARATOR)
    }
}

impl SymbolDecoder {
    pub fn new(separator: impl Into<String>) -> Self {
        SymbolDecoder {
            separator: separator.into(),
        }
    }

    /// Decode a symbol.
    ///
    /// Kind precedence: the metadata hint, when it belongs to the same
    /// descriptor family, then documentation, then naming conventions.
    pub fn decode(
        &self,
        symbol: &str,
        hints: &dyn KindHints,
    ) -> Result<DecodedSymbol, Unparseable> {
        let parsed = ParsedSymbol::parse(symbol)?;
        let parent = parsed.parent();
        let parent_symbol = parent.map(|seg| symbol[..seg.end].to_string());
        let parent_is_type = parent.is_some_and(|seg| seg.descriptor.is_type());
        let parent_is_method = parent.is_some_and(|seg| seg.descriptor.is_method());

        let (kind, container) = match parsed.last() {
            Descriptor::Parameter(_) => {
                if !parent_is_method {
                    return Err(Unparseable::Unsupported);
                }
                (NodeKind::Argument, parent_symbol)
            }
            Descriptor::Method { .. } => {
                if parent_is_type {
                    (NodeKind::Method, parent_symbol)
                } else if parent_is_method {
                    (NodeKind::Function, parent_symbol)
                } else {
                    (NodeKind::Function, None)
                }
            }
            Descriptor::Type(_) => match parent_symbol {
                Some(parent_symbol) if parent_is_type => {
                    let is_case = hints.hint(symbol) == Some(SymbolHint::EnumMember)
                        || type_kind(&parent_symbol, hints) == NodeKind::Enum;
                    let kind = if is_case {
                        NodeKind::EnumCase
                    } else {
                        type_kind(symbol, hints)
                    };
                    (kind, Some(parent_symbol))
                }
                _ => (type_kind(symbol, hints), None),
            },
            Descriptor::Term(name) => match parent_symbol {
                Some(parent_symbol) if parent_is_type => {
                    let kind = member_kind(symbol, name, &parent_symbol, hints);
                    (kind, Some(parent_symbol))
                }
                _ if parent_is_method => return Err(Unparseable::Unsupported),
                _ => (NodeKind::Constant, None),
            },
            Descriptor::Namespace(_)
            | Descriptor::TypeParameter(_)
            | Descriptor::Meta(_)
            | Descriptor::Macro(_) => return Err(Unparseable::Unsupported),
        };

        Ok(DecodedSymbol {
            kind,
            name: parsed.last().name().to_string(),
            fqn: self.fqn(&parsed),
            container,
            descriptor_path: symbol[parsed.descriptor_start..].to_string(),
        })
    }

    /// Build the qualified name: namespace segments joined with the
    /// separator, members with `::`, callables suffixed with `()`.
    pub fn fqn(&self, parsed: &ParsedSymbol) -> String {
        let mut fqn = String::new();
        let mut in_namespace = true;

        for segment in &parsed.segments {
            let part = match &segment.descriptor {
                Descriptor::Method { name, .. } => format!("{}()", name),
                Descriptor::Parameter(name) => {
                    fqn.push_str("::");
                    fqn.push_str(name);
                    continue;
                }
                other => other.name().to_string(),
            };

            if !fqn.is_empty() {
                if in_namespace {
                    fqn.push_str(&self.separator);
                } else {
                    fqn.push_str("::");
                }
            }
            fqn.push_str(&part);

            if !matches!(segment.descriptor, Descriptor::Namespace(_)) {
                in_namespace = false;
            }
        }

        fqn
    }
}

/// Class, Interface, Trait or Enum for a type symbol.
fn type_kind(symbol: &str, hints: &dyn KindHints) -> NodeKind {
    match hints.hint(symbol) {
        Some(SymbolHint::Class) => return NodeKind::Class,
        Some(SymbolHint::Interface) => return NodeKind::Interface,
        Some(SymbolHint::Trait) => return NodeKind::Trait,
        Some(SymbolHint::Enum) => return NodeKind::Enum,
        _ => {}
    }
    match hints.documented_kind(symbol) {
        Some(kind) if kind.is_type_like() => kind,
        _ => NodeKind::Class,
    }
}

/// Property, Constant or EnumCase for a term inside a type.
fn member_kind(symbol: &str, name: &str, parent_symbol: &str, hints: &dyn KindHints) -> NodeKind {
    match hints.hint(symbol) {
        Some(SymbolHint::Property) => return NodeKind::Property,
        Some(SymbolHint::Constant) => return NodeKind::Constant,
        Some(SymbolHint::EnumMember) => return NodeKind::EnumCase,
        _ => {}
    }
    if name.starts_with('$') {
        NodeKind::Property
    } else if type_kind(parent_symbol, hints) == NodeKind::Enum {
        NodeKind::EnumCase
    } else if is_constant_name(name) {
        NodeKind::Constant
    } else {
        NodeKind::Property
    }
}

/// `STATUS`, `MAX_SIZE`, `V2`: at least one letter, no lowercase letters.
fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_alphabetic()) && !name.chars().any(|c| c.is_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    const PREFIX: &str = "scip-php composer app 1.0 ";

    fn sym(descriptors: &str) -> String {
        format!("{}{}", PREFIX, descriptors)
    }

    #[derive(Default)]
    struct MapHints {
        hints: HashMap<String, SymbolHint>,
        documented: HashMap<String, NodeKind>,
    }

    impl KindHints for MapHints {
        fn hint(&self, symbol: &str) -> Option<SymbolHint> {
            self.hints.get(symbol).copied()
        }

        fn documented_kind(&self, symbol: &str) -> Option<NodeKind> {
            self.documented.get(symbol).copied()
        }
    }

    fn decode(descriptors: &str) -> DecodedSymbol {
        SymbolDecoder::default()
            .decode(&sym(descriptors), &NoHints)
            .unwrap()
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn parses_header() {
            let parsed = ParsedSymbol::parse(&sym("App/User#")).unwrap();
            assert_eq!(parsed.scheme, "scip-php");
            assert_eq!(parsed.manager, "composer");
            assert_eq!(parsed.package, "app");
            assert_eq!(parsed.version, "1.0");
            assert_eq!(parsed.descriptor_start, PREFIX.len());
        }

        #[test]
        fn doubled_space_is_literal_space() {
            let parsed = ParsedSymbol::parse("scip-php composer my  pkg 1.0 App/User#").unwrap();
            assert_eq!(parsed.package, "my pkg");
            assert_eq!(parsed.last(), &Descriptor::Type("User".to_string()));
        }

        #[test]
        fn descriptor_forms() {
            let parsed = ParsedSymbol::parse(&sym("App/User#save(+1).($user)")).unwrap();
            let descriptors: Vec<_> = parsed.segments.iter().map(|s| &s.descriptor).collect();
            assert_eq!(
                descriptors,
                vec![
                    &Descriptor::Namespace("App".to_string()),
                    &Descriptor::Type("User".to_string()),
                    &Descriptor::Method {
                        name: "save".to_string(),
                        disambiguator: "+1".to_string()
                    },
                    &Descriptor::Parameter("$user".to_string()),
                ]
            );
        }

        #[test]
        fn segment_offsets_are_prefixes() {
            let symbol = sym("App/User#getId().");
            let parsed = ParsedSymbol::parse(&symbol).unwrap();
            assert_eq!(&symbol[..parsed.segments[1].end], sym("App/User#"));
            assert_eq!(parsed.segments[2].end, symbol.len());
        }

        #[test]
        fn escaped_names() {
            let parsed = ParsedSymbol::parse(&sym("`my type`#`a``b`.")).unwrap();
            assert_eq!(parsed.segments[0].descriptor, Descriptor::Type("my type".to_string()));
            assert_eq!(parsed.segments[1].descriptor, Descriptor::Term("a`b".to_string()));
        }

        #[test]
        fn type_parameter_meta_and_macro() {
            let parsed = ParsedSymbol::parse(&sym("Box#[T]")).unwrap();
            assert_eq!(parsed.last(), &Descriptor::TypeParameter("T".to_string()));
            let parsed = ParsedSymbol::parse(&sym("lib/meta:")).unwrap();
            assert_eq!(parsed.last(), &Descriptor::Meta("meta".to_string()));
            let parsed = ParsedSymbol::parse(&sym("println!")).unwrap();
            assert_eq!(parsed.last(), &Descriptor::Macro("println".to_string()));
        }

        #[test]
        fn rejects_malformed() {
            assert_eq!(ParsedSymbol::parse("local 7"), Err(Unparseable::Local));
            assert_eq!(ParsedSymbol::parse(""), Err(Unparseable::Malformed));
            assert_eq!(ParsedSymbol::parse("scip-php composer"), Err(Unparseable::Malformed));
            assert_eq!(ParsedSymbol::parse(&sym("")), Err(Unparseable::Malformed));
            assert_eq!(ParsedSymbol::parse(&sym("App/User")), Err(Unparseable::Malformed));
            assert_eq!(ParsedSymbol::parse(&sym("User#x(")), Err(Unparseable::Malformed));
        }
    }

    mod decode_tests {
        use super::*;

        #[test]
        fn class() {
            let d = decode("App/Entity/User#");
            assert_eq!(d.kind, NodeKind::Class);
            assert_eq!(d.name, "User");
            assert_eq!(d.fqn, "App\\Entity\\User");
            assert_eq!(d.container, None);
            assert_eq!(d.descriptor_path, "App/Entity/User#");
        }

        #[test]
        fn method() {
            let d = decode("App/Entity/User#getId().");
            assert_eq!(d.kind, NodeKind::Method);
            assert_eq!(d.name, "getId");
            assert_eq!(d.fqn, "App\\Entity\\User::getId()");
            assert_eq!(d.container, Some(sym("App/Entity/User#")));
        }

        #[test]
        fn property() {
            let d = decode("App/Entity/User#$name.");
            assert_eq!(d.kind, NodeKind::Property);
            assert_eq!(d.name, "$name");
            assert_eq!(d.fqn, "App\\Entity\\User::$name");
        }

        #[test]
        fn constant() {
            let d = decode("App/Entity/User#STATUS.");
            assert_eq!(d.kind, NodeKind::Constant);
            assert_eq!(d.fqn, "App\\Entity\\User::STATUS");
        }

        #[test]
        fn argument() {
            let d = decode("App/Entity/User#getId().($id)");
            assert_eq!(d.kind, NodeKind::Argument);
            assert_eq!(d.name, "$id");
            assert_eq!(d.fqn, "App\\Entity\\User::getId()::$id");
            assert_eq!(d.container, Some(sym("App/Entity/User#getId().")));
        }

        #[test]
        fn function_has_no_trailing_dot() {
            let d = decode("App/helper().");
            assert_eq!(d.kind, NodeKind::Function);
            assert_eq!(d.name, "helper");
            assert_eq!(d.fqn, "App\\helper()");
            assert_eq!(d.container, None);
        }

        #[test]
        fn namespace_constant() {
            let d = decode("App/VERSION.");
            assert_eq!(d.kind, NodeKind::Constant);
            assert_eq!(d.fqn, "App\\VERSION");
        }

        #[test]
        fn custom_separator() {
            let decoder = SymbolDecoder::new(".");
            let d = decoder.decode(&sym("com/acme/Widget#run()."), &NoHints).unwrap();
            assert_eq!(d.fqn, "com.acme.Widget::run()");
        }

        #[test]
        fn unsupported_shapes() {
            let decoder = SymbolDecoder::default();
            for descriptors in ["App/", "Box#[T]", "App/User#run().local.", "lib/meta:"] {
                assert_eq!(
                    decoder.decode(&sym(descriptors), &NoHints),
                    Err(Unparseable::Unsupported),
                    "{}",
                    descriptors
                );
            }
            assert_eq!(decoder.decode("local 3", &NoHints), Err(Unparseable::Local));
        }
    }

    mod kind_tests {
        use super::*;

        #[test]
        fn documentation_decides_type_flavour() {
            let mut hints = MapHints::default();
            hints.documented.insert(sym("App/Repo#"), NodeKind::Interface);
            let d = SymbolDecoder::default().decode(&sym("App/Repo#"), &hints).unwrap();
            assert_eq!(d.kind, NodeKind::Interface);
        }

        #[test]
        fn hint_beats_documentation() {
            let mut hints = MapHints::default();
            hints.documented.insert(sym("App/Repo#"), NodeKind::Interface);
            hints.hints.insert(sym("App/Repo#"), SymbolHint::Trait);
            let d = SymbolDecoder::default().decode(&sym("App/Repo#"), &hints).unwrap();
            assert_eq!(d.kind, NodeKind::Trait);
        }

        #[test]
        fn hint_beats_naming_for_members() {
            let mut hints = MapHints::default();
            hints.hints.insert(sym("App/User#ID."), SymbolHint::Property);
            let d = SymbolDecoder::default().decode(&sym("App/User#ID."), &hints).unwrap();
            assert_eq!(d.kind, NodeKind::Property);
        }

        #[test]
        fn hint_from_other_family_is_ignored() {
            let mut hints = MapHints::default();
            hints.hints.insert(sym("App/User#"), SymbolHint::Method);
            let d = SymbolDecoder::default().decode(&sym("App/User#"), &hints).unwrap();
            assert_eq!(d.kind, NodeKind::Class);
        }

        #[test]
        fn enum_members() {
            let mut hints = MapHints::default();
            hints.documented.insert(sym("App/Status#"), NodeKind::Enum);
            let decoder = SymbolDecoder::default();

            let term = decoder.decode(&sym("App/Status#Active."), &hints).unwrap();
            assert_eq!(term.kind, NodeKind::EnumCase);
            assert_eq!(term.fqn, "App\\Status::Active");

            let nested = decoder.decode(&sym("App/Status#Active#"), &hints).unwrap();
            assert_eq!(nested.kind, NodeKind::EnumCase);
            assert_eq!(nested.container, Some(sym("App/Status#")));
        }

        #[test]
        fn lowercase_field_is_property() {
            assert_eq!(decode("App/Point#x.").kind, NodeKind::Property);
        }

        #[test]
        fn constant_names() {
            assert!(is_constant_name("MAX_SIZE"));
            assert!(is_constant_name("V2"));
            assert!(!is_constant_name("Max"));
            assert!(!is_constant_name("_1"));
        }
    }
}
