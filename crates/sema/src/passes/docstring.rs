use crate::natspec::{self, NatSpecItem, NatSpecKind};
use sable_ast::ast::{self, DocComment, ItemKind};
use sable_interface::diagnostics::{DiagCtxt, ErrorKind};

/// The item a documentation comment is attached to.
#[derive(Clone, Copy)]
enum DocTarget<'a> {
    Contract,
    Function(&'a ast::ItemFunction),
    Event(&'a ast::ItemEvent),
}

impl<'a> DocTarget<'a> {
    fn valid_tags(self) -> &'static [&'static str] {
        match self {
            Self::Contract => &["author", "title", "dev", "notice"],
            Self::Function(_) => &["author", "dev", "notice", "return", "param"],
            Self::Event(_) => &["author", "dev", "notice", "param"],
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Contract => "contracts",
            Self::Function(_) => "functions",
            Self::Event(_) => "events",
        }
    }

    fn parameters(self) -> Option<(&'static str, &'a [ast::VariableDefinition])> {
        match self {
            Self::Contract => None,
            Self::Function(f) => Some(("function", &f.header.parameters)),
            Self::Event(e) => Some(("event", &e.parameters)),
        }
    }
}

/// Checks the tags of documentation comments against the items they document.
pub(super) struct DocStringChecker<'a> {
    dcx: &'a DiagCtxt,
}

impl<'a> DocStringChecker<'a> {
    pub(super) fn new(dcx: &'a DiagCtxt) -> Self {
        Self { dcx }
    }

    pub(super) fn check(&self, ast: &ast::SourceUnit) {
        for item in &ast.items {
            self.check_item(item);
        }
    }

    fn check_item(&self, item: &ast::Item) {
        let target = match &item.kind {
            ItemKind::Contract(contract) => {
                for member in &contract.body {
                    self.check_item(member);
                }
                DocTarget::Contract
            }
            ItemKind::Function(function) => DocTarget::Function(function),
            ItemKind::Event(event) => DocTarget::Event(event),
            _ => return,
        };
        if let Some(docs) = &item.docs {
            self.check_docs(docs, target);
        }
    }

    fn check_docs(&self, docs: &DocComment, target: DocTarget<'_>) {
        let items = match natspec::parse(&docs.text) {
            Ok(items) => items,
            Err(e) => {
                let msg = e.to_string();
                self.dcx.err(ErrorKind::DocstringParsingError, msg).span(docs.span).emit();
                return;
            }
        };
        for item in &items {
            self.check_tag(docs, item, target);
        }
    }

    fn check_tag(&self, docs: &DocComment, item: &NatSpecItem, target: DocTarget<'_>) {
        if let NatSpecKind::Custom { .. } = item.kind {
            return;
        }
        let tag = item.kind.tag();
        if !target.valid_tags().contains(&tag) {
            let msg = format!("Documentation tag @{tag} not valid for {}.", target.description());
            self.dcx.err(ErrorKind::DocstringParsingError, msg).span(docs.span).emit();
            return;
        }
        if let NatSpecKind::Param { name } = &item.kind
            && let Some((what, params)) = target.parameters()
            && !params.iter().any(|p| p.name.as_ref().is_some_and(|n| n.as_str() == name.as_str()))
        {
            let msg = format!(
                "Documented parameter \"{name}\" not found in the parameter list of the {what}."
            );
            self.dcx.err(ErrorKind::DocstringParsingError, msg).span(docs.span).emit();
        }
    }
}
