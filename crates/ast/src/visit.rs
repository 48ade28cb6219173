//! AST visitor trait definition.

use crate::ast::*;
use std::ops::ControlFlow;

/// AST traversal.
///
/// Every method walks the children of its node by default; override a method to intercept a node
/// and call the default traversal explicitly with the matching `walk_*` function if needed.
pub trait Visit<'ast> {
    /// The value returned when breaking from the traversal.
    type BreakValue;

    fn visit_source_unit(
        &mut self,
        source_unit: &'ast SourceUnit,
    ) -> ControlFlow<Self::BreakValue> {
        for item in &source_unit.items {
            self.visit_item(item)?;
        }
        ControlFlow::Continue(())
    }

    fn visit_item(&mut self, item: &'ast Item) -> ControlFlow<Self::BreakValue> {
        walk_item(self, item)
    }

    fn visit_pragma_directive(
        &mut self,
        pragma: &'ast PragmaDirective,
    ) -> ControlFlow<Self::BreakValue> {
        // noop by default.
        let _ = pragma;
        ControlFlow::Continue(())
    }

    fn visit_import_directive(
        &mut self,
        import: &'ast ImportDirective,
    ) -> ControlFlow<Self::BreakValue> {
        let _ = import;
        ControlFlow::Continue(())
    }

    fn visit_item_contract(
        &mut self,
        contract: &'ast ItemContract,
    ) -> ControlFlow<Self::BreakValue> {
        let ItemContract { kind: _, name: _, bases, body } = contract;
        for base in bases {
            self.visit_modifier(base)?;
        }
        for item in body {
            self.visit_item(item)?;
        }
        ControlFlow::Continue(())
    }

    fn visit_item_function(
        &mut self,
        function: &'ast ItemFunction,
    ) -> ControlFlow<Self::BreakValue> {
        walk_item_function(self, function)
    }

    fn visit_item_struct(&mut self, strukt: &'ast ItemStruct) -> ControlFlow<Self::BreakValue> {
        for field in &strukt.fields {
            self.visit_variable_definition(field)?;
        }
        ControlFlow::Continue(())
    }

    fn visit_item_enum(&mut self, enum_: &'ast ItemEnum) -> ControlFlow<Self::BreakValue> {
        let _ = enum_;
        ControlFlow::Continue(())
    }

    fn visit_item_event(&mut self, event: &'ast ItemEvent) -> ControlFlow<Self::BreakValue> {
        for param in &event.parameters {
            self.visit_variable_definition(param)?;
        }
        ControlFlow::Continue(())
    }

    fn visit_variable_definition(
        &mut self,
        var: &'ast VariableDefinition,
    ) -> ControlFlow<Self::BreakValue> {
        self.visit_ty(&var.ty)?;
        if let Some(initializer) = &var.initializer {
            self.visit_expr(initializer)?;
        }
        ControlFlow::Continue(())
    }

    fn visit_ty(&mut self, ty: &'ast Type) -> ControlFlow<Self::BreakValue> {
        match &ty.kind {
            TypeKind::Elementary(_) | TypeKind::Custom(_) => {}
            TypeKind::Array(array) => {
                self.visit_ty(&array.element)?;
                if let Some(size) = &array.size {
                    self.visit_expr(size)?;
                }
            }
            TypeKind::Function(function) => {
                for param in function.parameters.iter().chain(&function.returns) {
                    self.visit_variable_definition(param)?;
                }
            }
            TypeKind::Mapping(mapping) => {
                self.visit_ty(&mapping.key)?;
                self.visit_ty(&mapping.value)?;
            }
        }
        ControlFlow::Continue(())
    }

    fn visit_modifier(&mut self, modifier: &'ast Modifier) -> ControlFlow<Self::BreakValue> {
        for arg in &modifier.arguments {
            self.visit_expr(arg)?;
        }
        ControlFlow::Continue(())
    }

    fn visit_block(&mut self, block: &'ast Block) -> ControlFlow<Self::BreakValue> {
        for stmt in &block.stmts {
            self.visit_stmt(stmt)?;
        }
        ControlFlow::Continue(())
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) -> ControlFlow<Self::BreakValue> {
        walk_stmt(self, stmt)
    }

    fn visit_expr(&mut self, expr: &'ast Expr) -> ControlFlow<Self::BreakValue> {
        walk_expr(self, expr)
    }
}

/// Walks the children of `item`.
pub fn walk_item<'ast, V: Visit<'ast> + ?Sized>(
    v: &mut V,
    item: &'ast Item,
) -> ControlFlow<V::BreakValue> {
    match &item.kind {
        ItemKind::Pragma(item) => v.visit_pragma_directive(item),
        ItemKind::Import(item) => v.visit_import_directive(item),
        ItemKind::Contract(item) => v.visit_item_contract(item),
        ItemKind::Function(item) => v.visit_item_function(item),
        ItemKind::Variable(item) => v.visit_variable_definition(item),
        ItemKind::Struct(item) => v.visit_item_struct(item),
        ItemKind::Enum(item) => v.visit_item_enum(item),
        ItemKind::Event(item) => v.visit_item_event(item),
    }
}

/// Walks the header and body of `function`.
pub fn walk_item_function<'ast, V: Visit<'ast> + ?Sized>(
    v: &mut V,
    function: &'ast ItemFunction,
) -> ControlFlow<V::BreakValue> {
    let ItemFunction { kind: _, header, body } = function;
    for param in header.parameters.iter().chain(&header.returns) {
        v.visit_variable_definition(param)?;
    }
    for modifier in &header.modifiers {
        v.visit_modifier(modifier)?;
    }
    if let Some(body) = body {
        v.visit_block(body)?;
    }
    ControlFlow::Continue(())
}

/// Walks the children of `stmt`.
pub fn walk_stmt<'ast, V: Visit<'ast> + ?Sized>(
    v: &mut V,
    stmt: &'ast Stmt,
) -> ControlFlow<V::BreakValue> {
    match &stmt.kind {
        StmtKind::DeclSingle(var, init) => {
            v.visit_variable_definition(var)?;
            if let Some(init) = init {
                v.visit_expr(init)?;
            }
        }
        StmtKind::DeclMulti(vars, init) => {
            for var in vars.iter().flatten() {
                v.visit_variable_definition(var)?;
            }
            v.visit_expr(init)?;
        }
        StmtKind::Block(block) => v.visit_block(block)?,
        StmtKind::Break | StmtKind::Continue | StmtKind::Placeholder => {}
        StmtKind::DoWhile(block, cond) => {
            v.visit_block(block)?;
            v.visit_expr(cond)?;
        }
        StmtKind::Emit(_, args) => {
            for arg in args {
                v.visit_expr(arg)?;
            }
        }
        StmtKind::Expr(expr) => v.visit_expr(expr)?,
        StmtKind::For { init, cond, next, body } => {
            if let Some(init) = init {
                v.visit_stmt(init)?;
            }
            if let Some(cond) = cond {
                v.visit_expr(cond)?;
            }
            if let Some(next) = next {
                v.visit_expr(next)?;
            }
            v.visit_stmt(body)?;
        }
        StmtKind::If(cond, then, else_) => {
            v.visit_expr(cond)?;
            v.visit_stmt(then)?;
            if let Some(else_) = else_ {
                v.visit_stmt(else_)?;
            }
        }
        StmtKind::Return(expr) => {
            if let Some(expr) = expr {
                v.visit_expr(expr)?;
            }
        }
        StmtKind::While(cond, body) => {
            v.visit_expr(cond)?;
            v.visit_stmt(body)?;
        }
    }
    ControlFlow::Continue(())
}

/// Walks the children of `expr`.
pub fn walk_expr<'ast, V: Visit<'ast> + ?Sized>(
    v: &mut V,
    expr: &'ast Expr,
) -> ControlFlow<V::BreakValue> {
    match &expr.kind {
        ExprKind::Array(exprs) => {
            for expr in exprs {
                v.visit_expr(expr)?;
            }
        }
        ExprKind::Assign(lhs, _, rhs) | ExprKind::Binary(lhs, _, rhs) => {
            v.visit_expr(lhs)?;
            v.visit_expr(rhs)?;
        }
        ExprKind::Call(callee, args) => {
            v.visit_expr(callee)?;
            for arg in args {
                v.visit_expr(arg)?;
            }
        }
        ExprKind::Delete(expr) | ExprKind::Unary(_, expr) | ExprKind::Member(expr, _) => {
            v.visit_expr(expr)?;
        }
        ExprKind::Ident(_) | ExprKind::Lit(_) => {}
        ExprKind::Index(base, index) => {
            v.visit_expr(base)?;
            if let Some(index) = index {
                v.visit_expr(index)?;
            }
        }
        ExprKind::New(ty) | ExprKind::Type(ty) => v.visit_ty(ty)?,
        ExprKind::Ternary(cond, then, else_) => {
            v.visit_expr(cond)?;
            v.visit_expr(then)?;
            v.visit_expr(else_)?;
        }
        ExprKind::Tuple(exprs) => {
            for expr in exprs.iter().flatten() {
                v.visit_expr(expr)?;
            }
        }
    }
    ControlFlow::Continue(())
}
