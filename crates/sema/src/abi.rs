//! The external interface of contracts: interface functions, selectors and the JSON ABI.
//!
//! Reference: <https://docs.soliditylang.org/en/develop/abi-spec.html>

use crate::{
    hir::{ContractId, FunctionId, Hir, VariableId},
    ty::{ArrayKind, Ty},
};
use alloy_json_abi as json;
use alloy_primitives::{Selector, keccak256};
use sable_ast::ast::{DataLocation, StateMutability};
use sable_data_structures::map::FxHashSet;

/// A function of a contract's external interface.
#[derive(Clone, Debug)]
pub struct InterfaceFunction {
    /// What defines the function.
    pub item: InterfaceItem,
    pub name: String,
    /// The canonical signature: `name(type,...)`.
    pub signature: String,
    pub selector: Selector,
    /// Parameter names and interface types.
    pub parameters: Vec<(String, Ty)>,
    /// Return value names and interface types.
    pub returns: Vec<(String, Ty)>,
    pub state_mutability: StateMutability,
}

/// The definition behind an [`InterfaceFunction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceItem {
    Function(FunctionId),
    /// The getter of a public state variable.
    Getter(VariableId),
}

/// Returns the external interface of a contract, including the inherited functions, sorted by
/// selector.
///
/// Functions are taken from the most derived contract first; a function whose signature was
/// already seen is overridden. Functions with parameters that can't be encoded are skipped.
pub fn interface_functions(hir: &Hir, id: ContractId) -> Vec<InterfaceFunction> {
    let contract = hir.contract(id);
    let in_library = contract.is_library();
    let mut seen = FxHashSet::default();
    let mut functions = Vec::new();
    for &base in &contract.linearized_bases {
        let base = hir.contract(base);
        for &f in &base.functions {
            let function = hir.function(f);
            if !function.is_part_of_external_interface() {
                continue;
            }
            let Some(parameters) = interface_params(hir, &function.parameters, in_library) else {
                continue;
            };
            let Some(returns) = interface_params(hir, &function.returns, in_library) else {
                continue;
            };
            let name = function.name_str().to_string();
            let signature = signature(&name, parameters.iter().map(|(_, ty)| ty));
            if seen.insert(signature.clone()) {
                functions.push(InterfaceFunction {
                    item: InterfaceItem::Function(f),
                    selector: selector(&signature),
                    name,
                    signature,
                    parameters,
                    returns,
                    state_mutability: function.state_mutability,
                });
            }
        }
        for &var in &base.variables {
            let variable = hir.variable(var);
            if !variable.is_public_state_variable() {
                continue;
            }
            let Some((parameters, returns)) = variable.ty.as_ref().and_then(getter_types) else {
                continue;
            };
            let name = variable.name_str().to_string();
            let signature = signature(&name, parameters.iter().map(|(_, ty)| ty));
            if seen.insert(signature.clone()) {
                functions.push(InterfaceFunction {
                    item: InterfaceItem::Getter(var),
                    selector: selector(&signature),
                    name,
                    signature,
                    parameters,
                    returns,
                    state_mutability: StateMutability::View,
                });
            }
        }
    }
    functions.sort_by_key(|f| f.selector);
    functions
}

/// Formats a function signature: `name(type,...)`.
pub fn signature<'a>(name: &str, tys: impl IntoIterator<Item = &'a Ty>) -> String {
    let tys: Vec<_> = tys.into_iter().map(Ty::signature_type_name).collect();
    format!("{name}({})", tys.join(","))
}

/// Returns the selector of a signature: the first 4 bytes of its hash.
pub fn selector(signature: &str) -> Selector {
    Selector::from_slice(&keccak256(signature.as_bytes())[..4])
}

fn interface_params(
    hir: &Hir,
    params: &[VariableId],
    in_library: bool,
) -> Option<Vec<(String, Ty)>> {
    params
        .iter()
        .map(|&param| {
            let var = hir.variable(param);
            let ty = var.ty.as_ref()?.interface_type(in_library)?;
            Some((var.name_str().to_string(), ty))
        })
        .collect()
}

/// Returns the parameters and return values of the getter of a state variable of type `ty`.
///
/// Mappings take their keys as parameters and arrays their indices. Getters of structs return
/// the members that are not mappings or arrays.
fn getter_types(ty: &Ty) -> Option<(Vec<(String, Ty)>, Vec<(String, Ty)>)> {
    let mut params = Vec::new();
    let mut ty = ty;
    loop {
        match ty {
            Ty::Mapping(key, value) => {
                params.push((String::new(), key.interface_type(false)?));
                ty = value;
            }
            Ty::Array(array) if array.kind == ArrayKind::Ordinary => {
                params.push((String::new(), Ty::UINT256));
                ty = &array.base;
            }
            _ => break,
        }
    }
    let returns = match ty {
        Ty::Struct(strukt) => strukt
            .fields
            .iter()
            .filter(|(_, ty)| {
                !matches!(ty, Ty::Mapping(..))
                    && !matches!(ty, Ty::Array(a) if a.kind == ArrayKind::Ordinary)
            })
            .map(|(name, ty)| Some((name.clone(), ty.interface_type(false)?)))
            .collect::<Option<Vec<_>>>()?,
        ty => vec![(String::new(), ty.with_location(DataLocation::Memory).interface_type(false)?)],
    };
    Some((params, returns))
}

/// Returns the JSON ABI of a contract.
pub fn contract_abi(hir: &Hir, id: ContractId) -> json::JsonAbi {
    let contract = hir.contract(id);
    let in_library = contract.is_library();
    let mut items = Vec::<json::AbiItem<'static>>::new();

    if let Some(ctor) = contract.ctor {
        let ctor = hir.function(ctor);
        if let Some(params) = interface_params(hir, &ctor.parameters, in_library) {
            items.push(
                json::Constructor {
                    inputs: params.iter().map(|(name, ty)| param_abi(name, ty)).collect(),
                    state_mutability: json_state_mutability(ctor.state_mutability),
                }
                .into(),
            );
        }
    }
    if let Some(fallback) = contract.fallback {
        let state_mutability = json_state_mutability(hir.function(fallback).state_mutability);
        items.push(json::Fallback { state_mutability }.into());
    }
    for f in interface_functions(hir, id) {
        items.push(
            json::Function {
                name: f.name,
                inputs: f.parameters.iter().map(|(name, ty)| param_abi(name, ty)).collect(),
                outputs: f.returns.iter().map(|(name, ty)| param_abi(name, ty)).collect(),
                state_mutability: json_state_mutability(f.state_mutability),
            }
            .into(),
        );
    }
    for &base in &contract.linearized_bases {
        for &event in &hir.contract(base).events {
            if let Some(event) = event_abi(hir, event) {
                items.push(event.into());
            }
        }
    }
    items.into_iter().collect()
}

fn event_abi(hir: &Hir, id: crate::hir::EventId) -> Option<json::Event> {
    let event = hir.event(id);
    let inputs = event
        .parameters
        .iter()
        .map(|&param| {
            let var = hir.variable(param);
            let ty = var.ty.as_ref()?.interface_type(false)?;
            let json::Param { ty, name, components, internal_type } =
                param_abi(var.name_str(), &ty);
            Some(json::EventParam { ty, name, indexed: var.indexed, components, internal_type })
        })
        .collect::<Option<_>>()?;
    Some(json::Event { name: event.name.as_str().to_string(), inputs, anonymous: event.anonymous })
}

fn param_abi(name: &str, ty: &Ty) -> json::Param {
    let components = match struct_of(ty) {
        Some(fields) => fields.iter().map(|(name, ty)| param_abi(name, ty)).collect(),
        None => Vec::new(),
    };
    json::Param {
        ty: abi_type(ty),
        name: name.to_string(),
        components,
        internal_type: json::InternalType::parse(&internal_type_name(ty)),
    }
}

/// Returns the fields of the struct `ty` is, or is an array of.
fn struct_of(ty: &Ty) -> Option<&[(String, Ty)]> {
    match ty {
        Ty::Struct(strukt) => Some(&strukt.fields),
        Ty::Array(array) if array.kind == ArrayKind::Ordinary => struct_of(&array.base),
        _ => None,
    }
}

/// The ABI type name, with structs printed as `tuple`.
fn abi_type(ty: &Ty) -> String {
    ty.abi_type_name()
}

/// The type name as written in source, used for `internalType`.
fn internal_type_name(ty: &Ty) -> String {
    match ty {
        Ty::Contract { name, .. } => format!("contract {name}"),
        Ty::Struct(strukt) => format!("struct {}", strukt.name),
        Ty::Enum { name, .. } => format!("enum {name}"),
        Ty::Array(array) if array.kind == ArrayKind::Ordinary => match array.length {
            Some(len) => format!("{}[{len}]", internal_type_name(&array.base)),
            None => format!("{}[]", internal_type_name(&array.base)),
        },
        _ => ty.abi_type_name(),
    }
}

fn json_state_mutability(s: StateMutability) -> json::StateMutability {
    match s {
        StateMutability::Pure => json::StateMutability::Pure,
        StateMutability::View => json::StateMutability::View,
        StateMutability::NonPayable => json::StateMutability::NonPayable,
        StateMutability::Payable => json::StateMutability::Payable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors() {
        assert_eq!(selector("transfer(address,uint256)"), Selector::from([0xa9, 0x05, 0x9c, 0xbb]));
        assert_eq!(selector("balanceOf(address)"), Selector::from([0x70, 0xa0, 0x82, 0x31]));
        let tys = [Ty::Address, Ty::UINT256];
        assert_eq!(signature("transfer", &tys), "transfer(address,uint256)");
    }

    #[test]
    fn getters() {
        let ty = Ty::Mapping(
            Box::new(Ty::Address),
            Box::new(Ty::array(Ty::Bool, None, DataLocation::Storage)),
        );
        let (params, returns) = getter_types(&ty).unwrap();
        let params: Vec<_> = params.iter().map(|(_, ty)| ty.abi_type_name()).collect();
        assert_eq!(params, ["address", "uint256"]);
        assert_eq!(returns.len(), 1);
        assert_eq!(returns[0].1, Ty::Bool);

        let string = Ty::byte_array(ArrayKind::String, DataLocation::Storage);
        let (params, returns) = getter_types(&string).unwrap();
        assert!(params.is_empty());
        assert_eq!(returns[0].1, Ty::byte_array(ArrayKind::String, DataLocation::Memory));
    }

    #[test]
    fn internal_types() {
        let ty = Ty::array(
            Ty::Contract { id: ContractId::new(0), name: "C".into() },
            Some(2),
            DataLocation::Memory,
        );
        assert_eq!(internal_type_name(&ty), "contract C[2]");
        assert_eq!(abi_type(&ty), "address[2]");
    }
}
