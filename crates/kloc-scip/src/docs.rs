//! Documentation-derived facts.
//!
//! Indexers often render a declaration header into a symbol's documentation
//! (for example ```` ```php\nfinal class User extends Model implements JsonSerializable\n``` ````).
//! When structured data is missing, this module recovers the type flavour
//! and the declared supertypes from that text. Results are heuristic.

use std::sync::LazyLock;

use regex::Regex;

use kloc_core::graph::NodeKind;
use kloc_core::index::SymbolHint;

static EXTENDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bextends\s+\\?([A-Za-z0-9_\\]+(?:\s*,\s*\\?[A-Za-z0-9_\\]+)*)")
        .expect("static regex")
});
static IMPLEMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bimplements\s+(.+?)(?:\s*\{|$)").expect("static regex")
});
// Only qualified or capitalised names, so prose like "use this" is skipped.
static USES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\buse\s+(\\[A-Za-z_][A-Za-z0-9_\\]*|[A-Za-z_][A-Za-z0-9_]*\\[A-Za-z0-9_\\]+|[A-Z][A-Za-z0-9_]*)",
    )
    .expect("static regex")
});

/// Strip code fences and collapse whitespace.
fn clean(doc: &str) -> String {
    let stripped = doc.replace("```php", "").replace("```", "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Declaration keywords that precede the type keyword.
const MODIFIERS: [&str; 3] = ["abstract ", "final ", "readonly "];

fn strip_modifiers(mut text: &str) -> &str {
    loop {
        let before = text;
        for modifier in MODIFIERS {
            if let Some(rest) = text.strip_prefix(modifier) {
                text = rest;
            }
        }
        if text == before {
            return text;
        }
    }
}

/// Infer Class, Interface, Trait or Enum from documentation.
pub fn infer_type_kind(docs: &[String]) -> Option<NodeKind> {
    docs.iter().find_map(|doc| {
        let cleaned = clean(doc).to_lowercase();
        let header = strip_modifiers(&cleaned);
        if header.starts_with("interface ") {
            Some(NodeKind::Interface)
        } else if header.starts_with("trait ") {
            Some(NodeKind::Trait)
        } else if header.starts_with("enum ") {
            Some(NodeKind::Enum)
        } else if header.starts_with("class ") {
            Some(NodeKind::Class)
        } else {
            None
        }
    })
}

/// Derive a kind hint from a rendered signature.
pub fn hint_from_signature(signature: &str) -> Option<SymbolHint> {
    let cleaned = clean(signature).to_lowercase();
    let header = strip_modifiers(&cleaned);
    let header = header
        .trim_start_matches("public ")
        .trim_start_matches("protected ")
        .trim_start_matches("private ")
        .trim_start_matches("static ");
    if header.starts_with("interface ") {
        Some(SymbolHint::Interface)
    } else if header.starts_with("trait ") {
        Some(SymbolHint::Trait)
    } else if header.starts_with("enum ") {
        Some(SymbolHint::Enum)
    } else if header.starts_with("class ") {
        Some(SymbolHint::Class)
    } else if header.starts_with("case ") {
        Some(SymbolHint::EnumMember)
    } else if header.starts_with("const ") {
        Some(SymbolHint::Constant)
    } else {
        None
    }
}

/// Supertypes declared in documentation, as `/`-separated descriptor paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredSupertypes {
    pub extends: Vec<String>,
    pub implements: Vec<String>,
    pub uses: Vec<String>,
}

impl DeclaredSupertypes {
    pub fn is_empty(&self) -> bool {
        self.extends.is_empty() && self.implements.is_empty() && self.uses.is_empty()
    }
}

/// Convert a written name (`\App\Model`) into a descriptor path (`App/Model`).
fn to_path(name: &str) -> String {
    name.trim()
        .trim_end_matches(|c: char| c == '`' || c.is_whitespace())
        .trim_start_matches('\\')
        .replace('\\', "/")
}

/// Extract `extends`, `implements` and `use` clauses.
pub fn extract_supertypes(docs: &[String]) -> DeclaredSupertypes {
    let mut found = DeclaredSupertypes::default();

    for doc in docs {
        let cleaned = clean(doc);

        // `implements` is cut off first so interface lists don't leak into
        // the extends capture for `interface A extends B, C`.
        let (head, implements_clause) = match IMPLEMENTS.captures(&cleaned) {
            Some(caps) => {
                let start = caps.get(0).map_or(cleaned.len(), |m| m.start());
                (&cleaned[..start], caps.get(1).map(|m| m.as_str()))
            }
            None => (cleaned.as_str(), None),
        };

        if let Some(caps) = EXTENDS.captures(head) {
            if let Some(list) = caps.get(1) {
                found.extends.extend(
                    list.as_str()
                        .split(',')
                        .map(to_path)
                        .filter(|p| !p.is_empty()),
                );
            }
        }

        if let Some(list) = implements_clause {
            found.implements.extend(
                list.split(',')
                    .map(to_path)
                    .filter(|p| !p.is_empty() && !p.starts_with('{')),
            );
        }

        for caps in USES.captures_iter(&cleaned) {
            if let Some(name) = caps.get(1) {
                found.uses.push(to_path(name.as_str()));
            }
        }
    }

    found
}
