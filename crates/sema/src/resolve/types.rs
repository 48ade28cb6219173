//! Type name resolution.

use super::{Resolver, StructState};
use crate::{
    hir::{StructId, VarKind, VariableId},
    scope::{DeclKind, ScopeId},
    ty::{ArrayKind, FunctionTy, FunctionTyKind, StructTy, Ty},
};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use sable_ast::ast::{self, DataLocation, ElementaryType};
use sable_interface::{Span, diagnostics::ErrorKind};

impl Resolver<'_> {
    /// Resolves the type of `var`, storing it in the HIR.
    ///
    /// An explicit data location overrides `default_location`.
    pub(crate) fn resolve_variable_type(
        &mut self,
        var: VariableId,
        scope: ScopeId,
        default_location: DataLocation,
    ) -> Option<Ty> {
        if let Some(ty) = &self.hir.variables[var].ty {
            return Some(ty.clone());
        }
        let ast = self.asts.variables[var];
        let location = ast.data_location.unwrap_or(default_location);
        let ty = self.lower_type(&ast.ty, scope, location)?;
        self.hir.variables[var].ty = Some(ty.clone());
        Some(ty)
    }

    /// Resolves a type name. Reference types are placed in `location`.
    ///
    /// Returns `None` after reporting an error.
    pub(crate) fn lower_type(
        &mut self,
        ty: &ast::Type,
        scope: ScopeId,
        location: DataLocation,
    ) -> Option<Ty> {
        match &ty.kind {
            ast::TypeKind::Elementary(elem) => Some(lower_elementary(*elem, location)),
            ast::TypeKind::Array(array) => {
                let base = self.lower_type(&array.element, scope, location)?;
                let length = match &array.size {
                    Some(size) => Some(self.eval_array_length(size, scope)?),
                    None => None,
                };
                Some(Ty::array(base, length, location))
            }
            ast::TypeKind::Function(f) => {
                let kind = match f.visibility {
                    Some(visibility) if visibility.is_external_facing() => FunctionTyKind::External,
                    _ => FunctionTyKind::Internal,
                };
                let mut lower_list = |params: &ast::ParameterList| {
                    params
                        .iter()
                        .map(|param| {
                            let location = param.data_location.unwrap_or(DataLocation::Memory);
                            self.lower_type(&param.ty, scope, location)
                        })
                        .collect::<Option<Vec<_>>>()
                };
                let parameters = lower_list(&f.parameters)?;
                let returns = lower_list(&f.returns)?;
                Some(Ty::Function(FunctionTy {
                    kind,
                    parameters,
                    returns,
                    state_mutability: f.state_mutability,
                }))
            }
            ast::TypeKind::Mapping(mapping) => {
                let key = self.lower_type(&mapping.key, scope, DataLocation::Memory)?;
                let value = self.lower_type(&mapping.value, scope, DataLocation::Storage)?;
                Some(Ty::Mapping(Box::new(key), Box::new(value)))
            }
            ast::TypeKind::Custom(path) => {
                let decl = self.resolve_path_unique(path, scope).ok()?;
                match self.decl_kind(decl) {
                    DeclKind::Contract(id) => {
                        Some(Ty::Contract { id, name: self.hir.contract(id).name.as_str().into() })
                    }
                    DeclKind::Enum(id) => {
                        let enumm = self.hir.enumm(id);
                        Some(Ty::Enum {
                            id,
                            name: enumm.name.as_str().into(),
                            members: enumm.variants.len() as u32,
                        })
                    }
                    DeclKind::Struct(id) => {
                        Some(self.struct_type(id, path.span())?.with_location(location))
                    }
                    _ => {
                        let msg = "Name has to refer to a struct, enum or contract.";
                        self.dcx.err(ErrorKind::TypeError, msg).span(path.span()).emit();
                        None
                    }
                }
            }
        }
    }

    /// Returns the storage type of a struct, computing its field types on first use.
    pub(crate) fn struct_type(&mut self, id: StructId, used_at: Span) -> Option<Ty> {
        match self.struct_types.get(&id) {
            Some(StructState::Done(ty)) => return ty.clone(),
            Some(StructState::InProgress) => {
                let strukt = self.hir.strukt(id);
                let mut err = self
                    .dcx
                    .err(ErrorKind::TypeError, "Recursive struct definition.")
                    .span(strukt.name.span);
                if !used_at.is_dummy() {
                    err = err.span_note(used_at, "Recursion through this field:");
                }
                err.emit();
                return None;
            }
            None => {}
        }

        self.struct_types.insert(id, StructState::InProgress);
        let strukt = self.hir.strukt(id);
        let (scope, name, field_ids) =
            (strukt.scope, strukt.name.as_str().to_string(), strukt.fields.clone());
        let mut fields = Some(Vec::with_capacity(field_ids.len()));
        for field in field_ids {
            debug_assert_eq!(self.hir.variable(field).kind, VarKind::StructField);
            let ty = self.resolve_variable_type(field, scope, DataLocation::Storage);
            match ty {
                Some(ty) => {
                    if let Some(fields) = &mut fields {
                        fields.push((self.hir.variable(field).name_str().to_string(), ty));
                    }
                }
                None => fields = None,
            }
        }
        let ty = fields.map(|fields| {
            Ty::Struct(StructTy { id, name, fields, location: DataLocation::Storage })
        });
        trace!(?id, ok = ty.is_some(), "computed struct type");
        self.struct_types.insert(id, StructState::Done(ty.clone()));
        ty
    }

    /// Evaluates an array length: an integer literal, or a constant initialized with one.
    fn eval_array_length(&self, expr: &ast::Expr, scope: ScopeId) -> Option<u64> {
        let value = match &expr.kind {
            ast::ExprKind::Ident(ident) => {
                match self.scopes.lookup(scope, ident.as_str(), Some(ident.span)) {
                    &[decl] => match self.decl_kind(decl) {
                        DeclKind::Variable(var) if self.hir.variable(var).is_constant() => self
                            .asts
                            .variables[var]
                            .initializer
                            .as_deref()
                            .and_then(number_literal),
                        _ => None,
                    },
                    _ => None,
                }
            }
            _ => number_literal(expr),
        };
        let Some(value) = value else {
            let msg = "Invalid array length, expected integer literal or constant expression.";
            self.dcx.err(ErrorKind::TypeError, msg).span(expr.span).emit();
            return None;
        };
        if value.is_zero() {
            let msg = "Array with zero length specified.";
            self.dcx.err(ErrorKind::TypeError, msg).span(expr.span).emit();
            return None;
        }
        match value.to_u64() {
            Some(length) => Some(length),
            None => {
                self.dcx.err(ErrorKind::TypeError, "Invalid array length.").span(expr.span).emit();
                None
            }
        }
    }
}

fn number_literal(expr: &ast::Expr) -> Option<&BigInt> {
    match &expr.kind {
        ast::ExprKind::Lit(ast::Lit { kind: ast::LitKind::Number(n), .. }) => Some(n),
        _ => None,
    }
}

fn lower_elementary(ty: ElementaryType, location: DataLocation) -> Ty {
    match ty {
        ElementaryType::Address(_) => Ty::Address,
        ElementaryType::Bool => Ty::Bool,
        ElementaryType::String => Ty::byte_array(ArrayKind::String, location),
        ElementaryType::Bytes => Ty::byte_array(ArrayKind::Bytes, location),
        ElementaryType::Fixed(bits, decimals) => Ty::FixedPoint { bits, decimals, signed: true },
        ElementaryType::UFixed(bits, decimals) => {
            Ty::FixedPoint { bits, decimals, signed: false }
        }
        ElementaryType::Int(bits) => Ty::int(bits),
        ElementaryType::UInt(bits) => Ty::uint(bits),
        ElementaryType::FixedBytes(n) => Ty::FixedBytes(n),
    }
}
