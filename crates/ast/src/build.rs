//! Terse programmatic construction of syntax trees.
//!
//! [`AstBuilder`] hands out distinct, increasing spans so that diagnostics on built trees point at
//! distinguishable locations.

use crate::ast::*;
use sable_interface::{SourceId, Span};

/// Builds syntax tree nodes for one source.
#[derive(Debug)]
pub struct AstBuilder {
    source: SourceId,
    pos: u32,
}

impl AstBuilder {
    /// Creates a new builder for nodes of `source`.
    pub fn new(source: SourceId) -> Self {
        Self { source, pos: 0 }
    }

    /// Returns a fresh span of `len` bytes.
    pub fn span(&mut self, len: usize) -> Span {
        let lo = self.pos;
        let hi = lo + u32::try_from(len).unwrap_or(u32::MAX - lo).max(1);
        self.pos = hi + 1;
        Span::new(self.source, lo, hi)
    }

    pub fn ident(&mut self, name: &str) -> Ident {
        Ident::new(name, self.span(name.len()))
    }

    /// Builds a path from a dotted name, like `A.B`.
    pub fn path(&mut self, dotted: &str) -> Path {
        let first = self.ident(dotted.split('.').next().unwrap_or(dotted));
        let mut segments = vec![first];
        segments.extend(dotted.split('.').skip(1).map(|s| self.ident(s)));
        Path::new(segments).unwrap_or_else(|| unreachable!())
    }

    pub fn ty(&mut self, ty: ElementaryType) -> Type {
        Type::elementary(ty, self.span(ty.to_string().len()))
    }

    pub fn uint(&mut self, bits: u16) -> Type {
        self.ty(ElementaryType::UInt(bits))
    }

    /// A user-defined type name.
    pub fn custom_ty(&mut self, name: &str) -> Type {
        let path = self.path(name);
        Type { span: path.span(), kind: TypeKind::Custom(path) }
    }

    /// `element[size]`, or `element[]` without a size.
    pub fn array_ty(&mut self, element: Type, size: Option<u64>) -> Type {
        let size = size.map(|n| Box::new(self.number(n)));
        let span = self.span(2);
        let span = element.span.to(span);
        Type { span, kind: TypeKind::Array(Box::new(TypeArray { element, size })) }
    }

    pub fn mapping_ty(&mut self, key: Type, value: Type) -> Type {
        let span = key.span.to(value.span);
        Type { span, kind: TypeKind::Mapping(Box::new(TypeMapping { key, value })) }
    }

    /// A parameter, or any other variable without attributes.
    pub fn var(&mut self, ty: Type, name: &str) -> VariableDefinition {
        let name = (!name.is_empty()).then(|| self.ident(name));
        VariableDefinition::new(ty, name)
    }

    /// A parameter with an explicit data location.
    pub fn var_in(&mut self, ty: Type, location: DataLocation, name: &str) -> VariableDefinition {
        VariableDefinition { data_location: Some(location), ..self.var(ty, name) }
    }

    /// Wraps `kind` in an item with a fresh span.
    pub fn item(&mut self, kind: ItemKind) -> Item {
        let span = match kind.name() {
            Some(name) => name.span,
            None => self.span(1),
        };
        Item { docs: None, span, kind }
    }

    /// Attaches a documentation comment to `item`.
    pub fn docs(&mut self, mut item: Item, text: &str) -> Item {
        item.docs = Some(DocComment { span: self.span(text.len()), text: text.to_string() });
        item
    }

    /// `pragma solidity <req>;`
    pub fn pragma_solidity(&mut self, req: &str) -> Item {
        let name = self.ident("solidity");
        let req = StrLit::new(req, self.span(req.len()));
        self.item(ItemKind::Pragma(PragmaDirective::Version(name, req)))
    }

    /// `import "<path>";`
    pub fn import(&mut self, path: &str) -> Item {
        let path = StrLit::new(path, self.span(path.len() + 2));
        self.item(ItemKind::Import(ImportDirective { path, items: ImportItems::Plain(None) }))
    }

    /// `import { a as b, c } from "<path>";`
    pub fn import_symbols(&mut self, path: &str, symbols: &[(&str, Option<&str>)]) -> Item {
        let symbols = symbols
            .iter()
            .map(|&(name, alias)| (self.ident(name), alias.map(|alias| self.ident(alias))))
            .collect();
        let path = StrLit::new(path, self.span(path.len() + 2));
        self.item(ItemKind::Import(ImportDirective { path, items: ImportItems::Aliases(symbols) }))
    }

    /// A contract definition inheriting from `bases`, without base constructor arguments.
    pub fn contract(
        &mut self,
        kind: ContractKind,
        name: &str,
        bases: &[&str],
        body: Vec<Item>,
    ) -> Item {
        let name = self.ident(name);
        let bases = bases
            .iter()
            .map(|base| Modifier { name: self.path(base), arguments: Vec::new() })
            .collect();
        self.item(ItemKind::Contract(ItemContract { kind, name, bases, body }))
    }

    /// A public function. Adjust the header of the result for anything else.
    pub fn function(
        &mut self,
        name: &str,
        parameters: ParameterList,
        returns: ParameterList,
        body: Option<Vec<Stmt>>,
    ) -> ItemFunction {
        let name = Some(self.ident(name));
        let body = body.map(|stmts| self.block(stmts));
        ItemFunction {
            kind: FunctionKind::Function,
            header: FunctionHeader {
                name,
                parameters,
                visibility: Some(Visibility::Public),
                returns,
                ..Default::default()
            },
            body,
        }
    }

    /// A modifier definition.
    pub fn modifier(&mut self, name: &str, body: Vec<Stmt>) -> ItemFunction {
        let mut function = self.function(name, Vec::new(), Vec::new(), Some(body));
        function.kind = FunctionKind::Modifier;
        function.header.visibility = None;
        function
    }

    pub fn block(&mut self, stmts: Vec<Stmt>) -> Block {
        Block::new(stmts, self.span(2))
    }

    pub fn stmt(&mut self, kind: StmtKind) -> Stmt {
        Stmt { span: self.span(1), kind }
    }

    /// `<expr>;`
    pub fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        Stmt { span: expr.span, kind: StmtKind::Expr(Box::new(expr)) }
    }

    /// `<ty> <name> = <init>;`
    pub fn let_stmt(&mut self, ty: Type, name: &str, init: Option<Expr>) -> Stmt {
        let var = self.var(ty, name);
        self.stmt(StmtKind::DeclSingle(var, init.map(Box::new)))
    }

    /// `return <expr>;`
    pub fn return_stmt(&mut self, expr: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Return(expr.map(Box::new)))
    }

    pub fn name_expr(&mut self, name: &str) -> Expr {
        Expr::from_ident(self.ident(name))
    }

    pub fn number(&mut self, n: u64) -> Expr {
        let lit = Lit { span: self.span(n.to_string().len()), kind: LitKind::Number(n.into()) };
        Expr::from_lit(lit)
    }

    pub fn string(&mut self, s: &str) -> Expr {
        let lit = Lit {
            span: self.span(s.len() + 2),
            kind: LitKind::Str(StrKind::Str, s.as_bytes().to_vec()),
        };
        Expr::from_lit(lit)
    }

    /// `new <contract>`
    pub fn new_expr(&mut self, contract: &str) -> Expr {
        let ty = self.custom_ty(contract);
        Expr { span: ty.span, kind: ExprKind::New(ty) }
    }

    pub fn call(&mut self, callee: Expr, args: Vec<Expr>) -> Expr {
        let span = callee.span.to(self.span(2));
        Expr { span, kind: ExprKind::Call(Box::new(callee), args) }
    }

    pub fn member(&mut self, base: Expr, member: &str) -> Expr {
        let member = self.ident(member);
        Expr { span: base.span.to(member.span), kind: ExprKind::Member(Box::new(base), member) }
    }

    pub fn assign(&mut self, lhs: Expr, rhs: Expr) -> Expr {
        let span = lhs.span.to(rhs.span);
        Expr { span, kind: ExprKind::Assign(Box::new(lhs), None, Box::new(rhs)) }
    }

    pub fn binary(&mut self, lhs: Expr, kind: BinOpKind, rhs: Expr) -> Expr {
        let op = BinOp { span: self.span(kind.to_str().len()), kind };
        let span = lhs.span.to(rhs.span);
        Expr { span, kind: ExprKind::Binary(Box::new(lhs), op, Box::new(rhs)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_spans() {
        let mut b = AstBuilder::new(SourceId::new(2));
        let a = b.ident("a");
        let a2 = b.ident("a");
        assert_ne!(a.span, a2.span);
        assert!(a.span.hi() < a2.span.lo());
        assert_eq!(a.span.source(), Some(SourceId::new(2)));

        let path = b.path("A.B.c");
        assert_eq!(path.to_string(), "A.B.c");
        assert_eq!(path.span().lo(), path.first().span.lo());
        assert_eq!(path.span().hi(), path.last().span.hi());
    }

    #[test]
    fn contract_item() {
        let mut b = AstBuilder::new(SourceId::new(0));
        let f = b.function("f", Vec::new(), Vec::new(), Some(Vec::new()));
        let f = b.item(ItemKind::Function(f));
        let c = b.contract(ContractKind::Contract, "C", &["B"], vec![f]);
        let unit = SourceUnit::new(vec![b.import("./b.sol"), c]);
        assert_eq!(unit.imports().count(), 1);
        let contract = unit.contracts().next().unwrap();
        assert_eq!(contract.name.as_str(), "C");
        assert_eq!(contract.bases[0].name.to_string(), "B");
        assert_eq!(contract.body[0].name().map(Ident::as_str), Some("f"));
    }
}
