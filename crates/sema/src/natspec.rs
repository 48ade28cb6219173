//! NatSpec documentation comments.
//!
//! Reference: <https://docs.soliditylang.org/en/latest/natspec-format.html#tags>

use crate::{
    abi::{InterfaceItem, interface_functions},
    hir::{ContractId, FunctionId, Hir},
};
use sable_ast::ast::DocComment;
use serde_json::{Map, Value};

/// A single tag of a documentation comment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NatSpecItem {
    pub kind: NatSpecKind,
    /// The tag's content, with continuation lines joined by a space.
    pub content: String,
}

/// The kind of a [`NatSpecItem`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NatSpecKind {
    /// `@title`
    Title,
    /// `@author`
    Author,
    /// `@notice`, or untagged text at the start of the comment.
    Notice,
    /// `@dev`
    Dev,
    /// `@param <name>`
    Param { name: String },
    /// `@return`
    Return,
    /// `@custom:<name>`
    Custom { name: String },
    /// Any other tag.
    Unknown { tag: String },
}

impl NatSpecKind {
    /// Returns the tag name, without `@`.
    pub fn tag(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Notice => "notice",
            Self::Dev => "dev",
            Self::Param { .. } => "param",
            Self::Return => "return",
            Self::Custom { .. } => "custom",
            Self::Unknown { tag } => tag,
        }
    }
}

/// An error in the structure of a documentation comment.
#[derive(Clone, Debug, PartialEq, Eq, derive_more::Display)]
pub enum NatSpecError {
    #[display("No param name given")]
    MissingParamName,
    #[display("Empty tag name.")]
    EmptyTag,
}

impl std::error::Error for NatSpecError {}

/// Parses the text of a documentation comment into its tags.
pub fn parse(text: &str) -> Result<Vec<NatSpecItem>, NatSpecError> {
    let mut items = Vec::<NatSpecItem>::new();
    for line in text.lines() {
        let line = line.trim();
        let line = line.strip_prefix('*').unwrap_or(line).trim();
        if line.is_empty() {
            continue;
        }
        let Some(tagged) = line.strip_prefix('@') else {
            match items.last_mut() {
                Some(item) => {
                    if !item.content.is_empty() {
                        item.content.push(' ');
                    }
                    item.content.push_str(line);
                }
                None => {
                    items.push(NatSpecItem { kind: NatSpecKind::Notice, content: line.into() })
                }
            }
            continue;
        };
        let (tag, rest) = split_word(tagged);
        let (kind, content) = match tag {
            "" => return Err(NatSpecError::EmptyTag),
            "title" => (NatSpecKind::Title, rest),
            "author" => (NatSpecKind::Author, rest),
            "notice" => (NatSpecKind::Notice, rest),
            "dev" => (NatSpecKind::Dev, rest),
            "return" => (NatSpecKind::Return, rest),
            "param" => {
                let (name, rest) = split_word(rest);
                if name.is_empty() {
                    return Err(NatSpecError::MissingParamName);
                }
                (NatSpecKind::Param { name: name.into() }, rest)
            }
            tag => match tag.strip_prefix("custom:") {
                Some(name) => (NatSpecKind::Custom { name: name.into() }, rest),
                None => (NatSpecKind::Unknown { tag: tag.into() }, rest),
            },
        };
        items.push(NatSpecItem { kind, content: content.into() });
    }
    Ok(items)
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (s, ""),
    }
}

/// Parses `docs`, ignoring malformed comments; those are reported by the docstring checker.
fn doc_items(docs: Option<&DocComment>) -> Vec<NatSpecItem> {
    docs.and_then(|docs| parse(&docs.text).ok()).unwrap_or_default()
}

/// Joins the contents of all tags of `kind`.
fn joined(items: &[NatSpecItem], kind: &NatSpecKind) -> Option<String> {
    let parts: Vec<_> =
        items.iter().filter(|item| item.kind == *kind).map(|item| item.content.as_str()).collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// Returns the documented functions of the contract's interface, keyed by signature.
fn documented_functions(hir: &Hir, id: ContractId) -> Vec<(String, FunctionId)> {
    let contract = hir.contract(id);
    let mut functions: Vec<_> =
        contract.ctor.map(|f| ("constructor".to_string(), f)).into_iter().collect();
    functions.extend(interface_functions(hir, id).into_iter().filter_map(|f| match f.item {
        InterfaceItem::Function(function) => Some((f.signature, function)),
        InterfaceItem::Getter(_) => None,
    }));
    functions
}

/// Returns the user documentation of a contract: the `@notice` of the contract and of its
/// interface functions.
pub fn user_documentation(hir: &Hir, id: ContractId) -> Value {
    let mut methods = Map::new();
    for (signature, f) in documented_functions(hir, id) {
        let items = doc_items(hir.function(f).docs.as_ref());
        if let Some(notice) = joined(&items, &NatSpecKind::Notice) {
            methods.insert(signature, serde_json::json!({ "notice": notice }));
        }
    }

    let mut doc = Map::new();
    doc.insert("methods".into(), methods.into());
    let items = doc_items(hir.contract(id).docs.as_ref());
    if let Some(notice) = joined(&items, &NatSpecKind::Notice) {
        doc.insert("notice".into(), notice.into());
    }
    doc.into()
}

/// Returns the developer documentation of a contract.
pub fn dev_documentation(hir: &Hir, id: ContractId) -> Value {
    let mut methods = Map::new();
    for (signature, f) in documented_functions(hir, id) {
        let items = doc_items(hir.function(f).docs.as_ref());
        let mut method = Map::new();
        if let Some(details) = joined(&items, &NatSpecKind::Dev) {
            method.insert("details".into(), details.into());
        }
        let params: Map<_, _> = items
            .iter()
            .filter_map(|item| match &item.kind {
                NatSpecKind::Param { name } => Some((name.clone(), Value::from(item.content.clone()))),
                _ => None,
            })
            .collect();
        if !params.is_empty() {
            method.insert("params".into(), params.into());
        }
        if let Some(ret) = joined(&items, &NatSpecKind::Return) {
            method.insert("return".into(), ret.into());
        }
        if !method.is_empty() {
            methods.insert(signature, method.into());
        }
    }

    let mut doc = Map::new();
    let items = doc_items(hir.contract(id).docs.as_ref());
    let contract_tags = [
        ("author", NatSpecKind::Author),
        ("title", NatSpecKind::Title),
        ("details", NatSpecKind::Dev),
    ];
    for (key, kind) in contract_tags {
        if let Some(value) = joined(&items, &kind) {
            doc.insert(key.into(), value.into());
        }
    }
    doc.insert("methods".into(), methods.into());
    doc.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: NatSpecKind, content: &str) -> NatSpecItem {
        NatSpecItem { kind, content: content.into() }
    }

    #[test]
    fn parse_tags() {
        let text = "\n * Untagged text\n * continues here.\n * @dev Details.\n * @param x The x.\n";
        assert_eq!(
            parse(text).unwrap(),
            [
                item(NatSpecKind::Notice, "Untagged text continues here."),
                item(NatSpecKind::Dev, "Details."),
                item(NatSpecKind::Param { name: "x".into() }, "The x."),
            ]
        );
    }

    #[test]
    fn parse_custom_and_unknown() {
        let items = parse("@custom:security contact@example.com\n@since 1.0").unwrap();
        assert_eq!(
            items,
            [
                item(NatSpecKind::Custom { name: "security".into() }, "contact@example.com"),
                item(NatSpecKind::Unknown { tag: "since".into() }, "1.0"),
            ]
        );
        assert_eq!(items[1].kind.tag(), "since");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(parse("@param"), Err(NatSpecError::MissingParamName));
        assert_eq!(parse("@param   "), Err(NatSpecError::MissingParamName));
        assert_eq!(parse("@ foo"), Err(NatSpecError::EmptyTag));
        assert_eq!(NatSpecError::MissingParamName.to_string(), "No param name given");
    }

    #[test]
    fn joins_repeated_tags() {
        let items = parse("@notice a\n@notice b").unwrap();
        assert_eq!(joined(&items, &NatSpecKind::Notice).as_deref(), Some("a b"));
        assert_eq!(joined(&items, &NatSpecKind::Dev), None);
    }
}
