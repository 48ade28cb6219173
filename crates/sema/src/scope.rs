//! Lexical scopes and the declarations they hold.

use crate::hir::{ContractId, EnumId, EventId, FunctionId, StructId, VariableId};
use sable_data_structures::{
    index::IndexVec,
    map::{FxHashMap, FxIndexMap, IndexEntry},
    newtype_index,
    smallvec::SmallVec,
};
use sable_interface::{
    Result, SourceId, Span,
    diagnostics::{DiagCtxt, ErrorGuaranteed, ErrorKind},
};
use strum::IntoEnumIterator;

newtype_index! {
    /// A [`Scope`] ID.
    pub struct ScopeId;

    /// A [`Declaration`] ID.
    pub struct DeclId;
}

/// What introduces a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// The scope holding the magic variables and functions. Shared by every source.
    Global,
    Source(SourceId),
    Contract(ContractId),
    Function(FunctionId),
    Modifier(FunctionId),
    Event(EventId),
    Struct(StructId),
    Enum(EnumId),
    /// A block statement, a function body, or a `for` statement.
    Block,
}

/// A lexical scope.
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// The nested scopes, in the order they were created.
    pub children: Vec<ScopeId>,
    /// Declarations visible in this scope, by name. Only functions and events may share a name.
    pub declarations: FxIndexMap<String, SmallVec<[DeclId; 1]>>,
}

/// A named declaration.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub name: String,
    /// The span of the declared name. Dummy for magic declarations, `this` and `super`.
    pub span: Span,
    pub kind: DeclKind,
    /// The scope the declaration was made in. Declarations can be visible in other scopes
    /// through imports and inheritance.
    pub scope: ScopeId,
}

/// What a name refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Magic(Magic),
    Contract(ContractId),
    Function(FunctionId),
    Modifier(FunctionId),
    /// A state variable, parameter, return value, struct field, event parameter, or file-level
    /// constant.
    Variable(VariableId),
    /// A variable declared in a function body.
    LocalVariable,
    Struct(StructId),
    Enum(EnumId),
    /// An enum member, with its index.
    EnumMember(EnumId, u32),
    Event(EventId),
    /// `this` in the given contract.
    This(ContractId),
    /// `super` in the given contract.
    Super(ContractId),
    /// A source imported under an alias: `import "a.sol" as A;`.
    Namespace(SourceId),
}

impl DeclKind {
    /// Returns a description of the declaration kind, for diagnostics.
    pub fn description(self) -> &'static str {
        match self {
            Self::Magic(_) => "magic variable",
            Self::Contract(_) => "contract",
            Self::Function(_) => "function",
            Self::Modifier(_) => "modifier",
            Self::Variable(_) | Self::LocalVariable => "variable",
            Self::Struct(_) => "struct",
            Self::Enum(_) => "enum",
            Self::EnumMember(..) => "enum member",
            Self::Event(_) => "event",
            Self::This(_) => "this",
            Self::Super(_) => "super",
            Self::Namespace(_) => "namespace",
        }
    }

    /// Returns `true` if a declaration of this kind may share its name with `other` in a single
    /// scope.
    fn can_overload(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Function(_), Self::Function(_)) | (Self::Event(_), Self::Event(_))
        )
    }
}

/// Built-in globals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::EnumIter, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Magic {
    Msg,
    Block,
    Tx,
    Now,
    Abi,
    Require,
    Assert,
    Revert,
    Keccak256,
    Sha256,
    Sha3,
    Ripemd160,
    Ecrecover,
    Addmod,
    Mulmod,
    Selfdestruct,
    Suicide,
    Gasleft,
    Blockhash,
}

impl Magic {
    /// Returns the name of the global.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Every scope and declaration of a compilation.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: IndexVec<ScopeId, Scope>,
    decls: IndexVec<DeclId, Declaration>,
    source_scopes: FxHashMap<SourceId, ScopeId>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// The global scope.
    pub const GLOBAL: ScopeId = ScopeId::new(0);

    /// Creates a new tree holding only the global scope with its magic declarations.
    pub fn new() -> Self {
        let mut tree = Self {
            scopes: IndexVec::new(),
            decls: IndexVec::new(),
            source_scopes: FxHashMap::default(),
        };
        let global = tree.push_scope(ScopeKind::Global, None);
        debug_assert_eq!(global, Self::GLOBAL);
        for magic in Magic::iter() {
            let decl = tree.new_decl(magic.name(), Span::DUMMY, DeclKind::Magic(magic), global);
            let _ = tree.try_insert(global, magic.name(), decl);
        }
        tree
    }

    /// Returns the scope with the given ID.
    #[inline]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    /// Returns the declaration with the given ID.
    #[inline]
    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id]
    }

    /// Returns the number of scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Returns `true` if the tree has only the global scope.
    pub fn is_empty(&self) -> bool {
        self.scopes.len() <= 1
    }

    /// Returns the scope of the given source, if it was processed.
    pub fn source_scope(&self, source: SourceId) -> Option<ScopeId> {
        self.source_scopes.get(&source).copied()
    }

    /// Creates a new scope nested in `parent`.
    pub fn new_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = self.push_scope(kind, Some(parent));
        self.scopes[parent].children.push(id);
        if let ScopeKind::Source(source) = kind {
            self.source_scopes.insert(source, id);
        }
        id
    }

    fn push_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(Scope {
            kind,
            parent,
            children: Vec::new(),
            declarations: FxIndexMap::default(),
        })
    }

    fn new_decl(&mut self, name: &str, span: Span, kind: DeclKind, scope: ScopeId) -> DeclId {
        self.decls.push(Declaration { name: name.to_string(), span, kind, scope })
    }

    /// Returns the declarations named `name` made in, or imported into, `scope` itself.
    pub fn resolve_local(&self, scope: ScopeId, name: &str) -> &[DeclId] {
        self.scopes[scope].declarations.get(name).map_or(&[], |decls| &decls[..])
    }

    /// Looks up `name` from `scope` outwards, returning the declarations of the innermost scope
    /// that declares it.
    ///
    /// With `at`, local variables declared after that position are skipped.
    pub fn lookup(&self, scope: ScopeId, name: &str, at: Option<Span>) -> &[DeclId] {
        let mut current = Some(scope);
        while let Some(id) = current {
            let decls = self.resolve_local(id, name);
            let visible = |&decl: &DeclId| {
                let decl = &self.decls[decl];
                match (decl.kind, at) {
                    (DeclKind::LocalVariable, Some(at)) => decl.span.lo() <= at.lo(),
                    _ => true,
                }
            };
            if !decls.is_empty() && decls.iter().all(visible) {
                return decls;
            }
            current = self.scopes[id].parent;
        }
        &[]
    }

    /// Returns the innermost enclosing scope of the given kind, starting with `scope` itself.
    pub fn enclosing(&self, scope: ScopeId, f: impl Fn(ScopeKind) -> bool) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if f(self.scopes[id].kind) {
                return Some(id);
            }
            current = self.scopes[id].parent;
        }
        None
    }

    /// Declares `name` in `scope`, reporting a clash with a previous declaration.
    pub fn declare(
        &mut self,
        dcx: &DiagCtxt,
        scope: ScopeId,
        name: &str,
        span: Span,
        kind: DeclKind,
    ) -> Result<DeclId> {
        let decl = self.new_decl(name, span, kind, scope);
        self.insert(dcx, scope, decl, span)?;
        Ok(decl)
    }

    /// Makes an existing declaration visible in `scope` under its own name.
    ///
    /// `span` is where the clash is reported, like the import directive bringing the declaration
    /// in.
    pub fn insert(&mut self, dcx: &DiagCtxt, scope: ScopeId, decl: DeclId, span: Span) -> Result {
        let name = self.decls[decl].name.clone();
        self.insert_as(dcx, scope, &name, decl, span)
    }

    /// Makes an existing declaration visible in `scope` under `name`.
    pub fn insert_as(
        &mut self,
        dcx: &DiagCtxt,
        scope: ScopeId,
        name: &str,
        decl: DeclId,
        span: Span,
    ) -> Result {
        self.try_insert(scope, name, decl)
            .map_err(|conflict| self.report_clash(dcx, span, conflict))
    }

    /// Reports a declaration at `span` clashing with `previous`.
    pub(crate) fn report_clash(
        &self,
        dcx: &DiagCtxt,
        span: Span,
        previous: DeclId,
    ) -> ErrorGuaranteed {
        let previous = self.decls[previous].span;
        let mut err = dcx.err(ErrorKind::DeclarationError, "Identifier already declared.");
        err = err.span(span);
        if !previous.is_dummy() && previous != span {
            err = err.span_note(previous, "The previous declaration is here:");
        }
        err.emit()
    }

    /// Makes `decl` visible in `scope` under `name`, returning the conflicting declaration on a
    /// clash.
    pub(crate) fn try_insert(
        &mut self,
        scope: ScopeId,
        name: &str,
        decl: DeclId,
    ) -> std::result::Result<(), DeclId> {
        let kind = self.decls[decl].kind;
        match self.scopes[scope].declarations.entry(name.to_string()) {
            IndexEntry::Occupied(entry) => {
                let decls = entry.into_mut();
                if decls.contains(&decl) {
                    return Ok(());
                }
                let conflict =
                    decls.iter().copied().find(|&other| !kind.can_overload(self.decls[other].kind));
                if let Some(conflict) = conflict {
                    return Err(conflict);
                }
                decls.push(decl);
            }
            IndexEntry::Vacant(entry) => {
                entry.insert(SmallVec::from_buf([decl]));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(lo: u32) -> Span {
        Span::new(SourceId::new(0), lo, lo + 1)
    }

    #[test]
    fn magic_globals() {
        let tree = ScopeTree::new();
        for name in ["msg", "block", "tx", "now", "abi", "keccak256", "require"] {
            let decls = tree.lookup(ScopeTree::GLOBAL, name, None);
            assert_eq!(decls.len(), 1, "{name}");
            assert!(matches!(tree.decl(decls[0]).kind, DeclKind::Magic(_)));
        }
        assert!(tree.lookup(ScopeTree::GLOBAL, "foo", None).is_empty());
    }

    #[test]
    fn clashes_and_overloads() {
        let dcx = DiagCtxt::new();
        let mut tree = ScopeTree::new();
        let s = tree.new_scope(ScopeKind::Source(SourceId::new(0)), ScopeTree::GLOBAL);

        let f = |i| DeclKind::Function(FunctionId::new(i));
        tree.declare(&dcx, s, "f", span(0), f(0)).unwrap();
        tree.declare(&dcx, s, "f", span(2), f(1)).unwrap();
        assert_eq!(tree.resolve_local(s, "f").len(), 2);

        let e = |i| DeclKind::Event(EventId::new(i));
        tree.declare(&dcx, s, "E", span(4), e(0)).unwrap();
        tree.declare(&dcx, s, "E", span(6), e(1)).unwrap();
        assert!(dcx.has_errors().is_ok());

        let v = DeclKind::Variable(VariableId::new(0));
        assert!(tree.declare(&dcx, s, "f", span(8), v).is_err());
        assert!(tree.declare(&dcx, s, "E", span(10), f(2)).is_err());

        let diags = dcx.diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].to_string(), "DeclarationError: Identifier already declared.");
        assert_eq!(diags[0].primary_span(), Some(span(8)));
        let notes: Vec<_> = diags[0].secondary_spans().collect();
        assert_eq!(notes, [(span(0), "The previous declaration is here:")]);
    }

    #[test]
    fn shadowing_and_locals() {
        let dcx = DiagCtxt::new();
        let mut tree = ScopeTree::new();
        let s = tree.new_scope(ScopeKind::Source(SourceId::new(0)), ScopeTree::GLOBAL);
        let outer = tree.declare(&dcx, s, "x", span(0), DeclKind::Variable(VariableId::new(0)));
        let block = tree.new_scope(ScopeKind::Block, s);
        let inner = tree.declare(&dcx, block, "x", span(10), DeclKind::LocalVariable);
        assert!(dcx.has_errors().is_ok());
        assert_eq!(tree.scope(s).children, [block]);

        // Before the local is declared, the outer variable is visible.
        assert_eq!(tree.lookup(block, "x", Some(span(5))), [outer.unwrap()]);
        assert_eq!(tree.lookup(block, "x", Some(span(12))), [inner.unwrap()]);
        assert_eq!(tree.lookup(block, "x", None), [inner.unwrap()]);
        // Magic globals can be shadowed.
        tree.declare(&dcx, s, "now", span(20), DeclKind::LocalVariable).unwrap();
        assert_eq!(tree.enclosing(block, |k| matches!(k, ScopeKind::Source(_))), Some(s));
    }

    #[test]
    fn repeated_import() {
        let dcx = DiagCtxt::new();
        let mut tree = ScopeTree::new();
        let a = tree.new_scope(ScopeKind::Source(SourceId::new(0)), ScopeTree::GLOBAL);
        let b = tree.new_scope(ScopeKind::Source(SourceId::new(1)), ScopeTree::GLOBAL);
        let c = tree.declare(&dcx, a, "C", span(0), DeclKind::Contract(ContractId::new(0)));
        let c = c.unwrap();
        tree.insert(&dcx, b, c, span(5)).unwrap();
        tree.insert(&dcx, b, c, span(7)).unwrap();
        assert_eq!(tree.resolve_local(b, "C"), [c]);
        assert_eq!(tree.source_scope(SourceId::new(1)), Some(b));
    }
}
