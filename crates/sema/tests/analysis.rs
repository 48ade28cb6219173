//! End-to-end semantic analysis of programmatically built sources.
#![allow(unused_crate_dependencies)]

use sable_ast::{
    ast::{
        ContractKind, ElementaryType, FunctionKind, Item, ItemEvent, ItemKind, ItemStruct,
        SourceUnit, StmtKind, VarMut, Visibility,
    },
    build::AstBuilder,
};
use sable_interface::{
    ImportResolver, Result, SourceId,
    diagnostics::{DiagCtxt, Diagnostic, ErrorKind},
};
use sable_sema::{
    Analysis, ParsingContext, Sources, abi, analyze, hir::ContractId, natspec,
};

type Build = fn(&mut AstBuilder) -> Vec<Item>;

fn run(files: &[(&str, Build)]) -> (Analysis, Vec<Diagnostic>) {
    let mut sources = Sources::new();
    for &(name, _) in files {
        sources.add(name.into(), String::new(), false);
    }
    let dcx = DiagCtxt::new();
    let mut parser = |id: SourceId, name: &str, _: &str, _: &DiagCtxt| -> Result<SourceUnit> {
        let (_, build) = files.iter().find(|(n, _)| *n == name).unwrap();
        Ok(SourceUnit::new(build(&mut AstBuilder::new(id))))
    };
    let resolver = ImportResolver::default();
    ParsingContext { dcx: &dcx, parser: &mut parser, reader: None, resolver: &resolver }
        .parse(&mut sources);
    let analysis = analyze(&sources, &dcx, &semver::Version::new(0, 4, 26));
    (analysis, dcx.diagnostics())
}

fn messages(diags: &[Diagnostic]) -> Vec<(ErrorKind, &str)> {
    diags.iter().map(|d| (d.kind(), d.message.as_str())).collect()
}

fn names(analysis: &Analysis, ids: &[ContractId]) -> Vec<String> {
    ids.iter().map(|&id| analysis.hir.contract(id).name.to_string()).collect()
}

fn contract(analysis: &Analysis, name: &str) -> ContractId {
    analysis.hir.find_contract(name).unwrap()
}

#[test]
fn diamond_inheritance() {
    let (analysis, diags) = run(&[("a.sol", |b| {
        vec![
            b.contract(ContractKind::Contract, "A", &[], vec![]),
            b.contract(ContractKind::Contract, "B", &["A"], vec![]),
            b.contract(ContractKind::Contract, "C", &["A"], vec![]),
            b.contract(ContractKind::Contract, "D", &["B", "C"], vec![]),
        ]
    })]);
    assert!(diags.is_empty(), "{diags:?}");
    let d = analysis.hir.contract(contract(&analysis, "D"));
    assert_eq!(names(&analysis, &d.linearized_bases), ["D", "C", "B", "A"]);
    let deps: Vec<_> = d.dependencies.iter().copied().collect();
    assert_eq!(deps.len(), 3);
    assert!(d.fully_implemented);
}

#[test]
fn base_declared_later() {
    let (_, diags) = run(&[("a.sol", |b| {
        vec![
            b.contract(ContractKind::Contract, "X", &["Y"], vec![]),
            b.contract(ContractKind::Contract, "Y", &[], vec![]),
        ]
    })]);
    assert_eq!(
        messages(&diags),
        [(
            ErrorKind::DeclarationError,
            "Definition of base has to precede definition of derived contract"
        )]
    );
}

#[test]
fn impossible_linearization() {
    let (_, diags) = run(&[("a.sol", |b| {
        vec![
            b.contract(ContractKind::Contract, "A", &[], vec![]),
            b.contract(ContractKind::Contract, "B", &["A"], vec![]),
            b.contract(ContractKind::Contract, "C", &["B", "A"], vec![]),
        ]
    })]);
    assert_eq!(
        messages(&diags),
        [(ErrorKind::DeclarationError, "Linearization of inheritance graph impossible")]
    );
}

#[test]
fn duplicate_declaration() {
    let (_, diags) = run(&[("a.sol", |b| {
        let ty = b.uint(256);
        let x1 = b.var(ty, "x");
        let ty = b.uint(256);
        let x2 = b.var(ty, "x");
        let members = vec![b.item(ItemKind::Variable(x1)), b.item(ItemKind::Variable(x2))];
        vec![b.contract(ContractKind::Contract, "C", &[], members)]
    })]);
    assert_eq!(messages(&diags), [(ErrorKind::DeclarationError, "Identifier already declared.")]);
    assert_eq!(diags[0].secondary_spans().count(), 1);
}

#[test]
fn overloads_are_allowed() {
    let (_, diags) = run(&[("a.sol", |b| {
        let ty = b.uint(256);
        let p = b.var(ty, "a");
        let f1 = b.function("f", vec![], vec![], Some(vec![]));
        let f2 = b.function("f", vec![p], vec![], Some(vec![]));
        let members = vec![b.item(ItemKind::Function(f1)), b.item(ItemKind::Function(f2))];
        vec![b.contract(ContractKind::Contract, "C", &[], members)]
    })]);
    assert!(diags.is_empty(), "{diags:?}");
}

#[test]
fn undeclared_identifier() {
    let (_, diags) = run(&[("a.sol", |b| {
        let use_y = b.name_expr("y");
        let stmt = b.expr_stmt(use_y);
        let f = b.function("f", vec![], vec![], Some(vec![stmt]));
        let members = vec![b.item(ItemKind::Function(f))];
        vec![b.contract(ContractKind::Contract, "C", &[], members)]
    })]);
    assert_eq!(messages(&diags), [(ErrorKind::DeclarationError, "Undeclared identifier.")]);
}

#[test]
fn locals_are_visible_after_declaration() {
    let (_, diags) = run(&[("a.sol", |b| {
        let ty = b.uint(256);
        let decl = b.let_stmt(ty, "x", None);
        let use_x = b.name_expr("x");
        let stmt = b.expr_stmt(use_x);
        let f = b.function("f", vec![], vec![], Some(vec![decl, stmt]));
        let members = vec![b.item(ItemKind::Function(f))];
        vec![b.contract(ContractKind::Contract, "C", &[], members)]
    })]);
    assert!(diags.is_empty(), "{diags:?}");
}

#[test]
fn creation_dependencies() {
    let (analysis, diags) = run(&[("a.sol", |b| {
        let new_b = b.new_expr("B");
        let call = b.call(new_b, vec![]);
        let stmt = b.expr_stmt(call);
        let f = b.function("f", vec![], vec![], Some(vec![stmt]));
        let f = b.item(ItemKind::Function(f));
        vec![
            b.contract(ContractKind::Contract, "B", &[], vec![]),
            b.contract(ContractKind::Contract, "A", &[], vec![f]),
        ]
    })]);
    assert!(diags.is_empty(), "{diags:?}");
    let a = analysis.hir.contract(contract(&analysis, "A"));
    let deps: Vec<_> = a.dependencies.iter().copied().collect();
    assert_eq!(names(&analysis, &deps), ["B"]);
}

#[test]
fn self_creation() {
    let (_, diags) = run(&[("a.sol", |b| {
        let new_a = b.new_expr("A");
        let call = b.call(new_a, vec![]);
        let stmt = b.expr_stmt(call);
        let f = b.function("f", vec![], vec![], Some(vec![stmt]));
        let f = b.item(ItemKind::Function(f));
        vec![b.contract(ContractKind::Contract, "A", &[], vec![f])]
    })]);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind(), ErrorKind::TypeError);
    assert!(diags[0].message.starts_with("Circular reference for contract creation"));
}

#[test]
fn recursive_struct() {
    let (_, diags) = run(&[("a.sol", |b| {
        let name = b.ident("S");
        let ty = b.custom_ty("S");
        let field = b.var(ty, "inner");
        let s = b.item(ItemKind::Struct(ItemStruct { name, fields: vec![field] }));
        vec![b.contract(ContractKind::Contract, "C", &[], vec![s])]
    })]);
    assert_eq!(messages(&diags), [(ErrorKind::TypeError, "Recursive struct definition.")]);
}

#[test]
fn unimplemented_functions() {
    let (analysis, diags) = run(&[("a.sol", |b| {
        let f = b.function("f", vec![], vec![], None);
        let g = b.function("f", vec![], vec![], Some(vec![]));
        let f = b.item(ItemKind::Function(f));
        let g = b.item(ItemKind::Function(g));
        vec![
            b.contract(ContractKind::AbstractContract, "A", &[], vec![f]),
            b.contract(ContractKind::Contract, "B", &["A"], vec![g]),
        ]
    })]);
    assert!(diags.is_empty(), "{diags:?}");
    assert!(!analysis.hir.contract(contract(&analysis, "A")).fully_implemented);
    assert!(analysis.hir.contract(contract(&analysis, "B")).fully_implemented);
}

#[test]
fn imports() {
    let (analysis, diags) = run(&[
        ("main.sol", |b| {
            vec![
                b.import("lib.sol"),
                b.import_symbols("lib.sol", &[("L", Some("M")), ("Missing", None)]),
                b.contract(ContractKind::Contract, "Main", &["M"], vec![]),
            ]
        }),
        ("lib.sol", |b| vec![b.contract(ContractKind::Contract, "L", &[], vec![])]),
    ]);
    assert_eq!(
        messages(&diags),
        [(
            ErrorKind::DeclarationError,
            "Declaration \"Missing\" not found in \"lib.sol\" (referenced as \"Missing\")."
        )]
    );
    let order: Vec<_> = analysis.order.iter().map(|&id| id.index()).collect();
    assert_eq!(order, [1, 0]);
    let main = analysis.hir.contract(contract(&analysis, "Main"));
    assert_eq!(names(&analysis, &main.linearized_bases), ["Main", "L"]);
    // Both the plain import and the alias make `L` visible.
    let main_source = analysis.scopes.source_scope(main.source).unwrap();
    assert!(!analysis.scopes.lookup(main_source, "L", None).is_empty());
    assert!(!analysis.scopes.lookup(main_source, "M", None).is_empty());
}

#[test]
fn library_state_variables() {
    let (_, diags) = run(&[("a.sol", |b| {
        let ty = b.uint(256);
        let x = b.var(ty, "x");
        let ty = b.uint(256);
        let mut y = b.var(ty, "y");
        y.mutability = Some(VarMut::Constant);
        y.initializer = Some(Box::new(b.number(1)));
        let members = vec![b.item(ItemKind::Variable(x)), b.item(ItemKind::Variable(y))];
        vec![b.contract(ContractKind::Library, "L", &[], members)]
    })]);
    assert_eq!(
        messages(&diags),
        [(ErrorKind::TypeError, "Library cannot have non-constant state variables")]
    );
}

#[test]
fn static_analysis_needs_clean_resolution() {
    let (_, diags) = run(&[("a.sol", |b| {
        let ty = b.uint(256);
        let x = b.var(ty, "x");
        let use_y = b.name_expr("y");
        let stmt = b.expr_stmt(use_y);
        let f = b.function("f", vec![], vec![], Some(vec![stmt]));
        let members = vec![b.item(ItemKind::Variable(x)), b.item(ItemKind::Function(f))];
        vec![b.contract(ContractKind::Library, "L", &[], members)]
    })]);
    assert_eq!(messages(&diags), [(ErrorKind::DeclarationError, "Undeclared identifier.")]);
}

#[test]
fn interface_bodies_and_constructor_returns() {
    let (_, diags) = run(&[("a.sol", |b| {
        let f = b.function("f", vec![], vec![], Some(vec![]));
        let ty = b.uint(256);
        let ret = b.var(ty, "");
        let mut ctor = b.function("", vec![], vec![ret], Some(vec![]));
        ctor.kind = FunctionKind::Constructor;
        ctor.header.name = None;
        let f = b.item(ItemKind::Function(f));
        let ctor = b.item(ItemKind::Function(ctor));
        vec![
            b.contract(ContractKind::Interface, "I", &[], vec![f]),
            b.contract(ContractKind::Contract, "C", &[], vec![ctor]),
        ]
    })]);
    assert_eq!(
        messages(&diags),
        [
            (ErrorKind::TypeError, "Functions in interfaces cannot have an implementation."),
            (ErrorKind::TypeError, "Non-empty \"returns\" directive for constructor."),
        ]
    );
}

#[test]
fn syntax_errors() {
    let (_, diags) = run(&[("a.sol", |b| {
        let pragma = b.pragma_solidity("^0.5.0");
        let brk = b.stmt(StmtKind::Break);
        let placeholder = b.stmt(StmtKind::Placeholder);
        let f = b.function("f", vec![], vec![], Some(vec![brk, placeholder]));
        let body = b.stmt(StmtKind::Continue);
        let cond = b.number(1);
        let while_ = b.stmt(StmtKind::While(Box::new(cond), Box::new(body)));
        let g = b.function("g", vec![], vec![], Some(vec![while_]));
        let members = vec![b.item(ItemKind::Function(f)), b.item(ItemKind::Function(g))];
        vec![pragma, b.contract(ContractKind::Contract, "C", &[], members)]
    })]);
    let messages = messages(&diags);
    assert_eq!(messages.len(), 3, "{messages:?}");
    assert!(messages.iter().all(|(kind, _)| *kind == ErrorKind::SyntaxError));
    assert!(messages[0].1.starts_with("Source file requires different compiler version"));
    assert_eq!(messages[1].1, "\"break\" has to be in a \"for\" or \"while\" loop.");
    assert_eq!(messages[2].1, "The \"_\" placeholder can only be used in modifiers.");
}

#[test]
fn docstrings() {
    let (_, diags) = run(&[("a.sol", |b| {
        let ty = b.uint(256);
        let p = b.var(ty, "amount");
        let mut f = b.function("f", vec![p], vec![], Some(vec![]));
        f.header.visibility = Some(Visibility::External);
        let f = b.item(ItemKind::Function(f));
        let f = b.docs(f, "@notice Does things.\n@param amount The amount.\n@param other Nope.");
        let c = b.contract(ContractKind::Contract, "C", &[], vec![f]);
        let c = b.docs(c, "@title C\n@return nothing");
        vec![c]
    })]);
    assert_eq!(
        messages(&diags),
        [
            (
                ErrorKind::DocstringParsingError,
                "Documented parameter \"other\" not found in the parameter list of the function."
            ),
            (
                ErrorKind::DocstringParsingError,
                "Documentation tag @return not valid for contracts."
            ),
        ]
    );
}

#[test]
fn documentation_and_abi() {
    let (analysis, diags) = run(&[("token.sol", |b| {
        let to = b.ty(ElementaryType::Address(false));
        let to = b.var(to, "to");
        let amount = b.uint(256);
        let amount = b.var(amount, "amount");
        let ok = b.ty(ElementaryType::Bool);
        let ok = b.var(ok, "");
        let mut transfer = b.function("transfer", vec![to, amount], vec![ok], Some(vec![]));
        transfer.header.visibility = Some(Visibility::External);
        let transfer = b.item(ItemKind::Function(transfer));
        let transfer = b.docs(
            transfer,
            "@notice Sends tokens.\n@dev Moves balance.\n@param to The recipient.\n\
             @return Success.",
        );

        let total = b.uint(256);
        let mut total = b.var(total, "total");
        total.visibility = Some(Visibility::Public);
        let total = b.item(ItemKind::Variable(total));

        let recipient = b.ty(ElementaryType::Address(false));
        let mut recipient = b.var(recipient, "to");
        recipient.indexed = true;
        let name = b.ident("Sent");
        let sent = ItemEvent { name, parameters: vec![recipient], anonymous: false };
        let sent = b.item(ItemKind::Event(sent));

        let token = b.contract(ContractKind::Contract, "Token", &[], vec![transfer, total, sent]);
        vec![b.docs(token, "A token.\n@title Token\n@author Me")]
    })]);
    assert!(diags.is_empty(), "{diags:?}");
    let id = contract(&analysis, "Token");

    let selectors: Vec<_> = abi::interface_functions(&analysis.hir, id)
        .iter()
        .map(|f| (f.signature.clone(), f.selector.to_string()))
        .collect();
    assert_eq!(
        selectors,
        [
            ("total()".to_string(), "0x2ddbd13a".to_string()),
            ("transfer(address,uint256)".to_string(), "0xa9059cbb".to_string()),
        ]
    );

    let json = abi::contract_abi(&analysis.hir, id);
    assert_eq!(json.functions().count(), 2);
    assert!(json.events.contains_key("Sent"));

    let userdoc = natspec::user_documentation(&analysis.hir, id);
    snapbox::assert_data_eq!(
        serde_json::to_string_pretty(&userdoc).unwrap(),
        r#"{
  "methods": {
    "transfer(address,uint256)": {
      "notice": "Sends tokens."
    }
  },
  "notice": "A token."
}"#
    );

    let devdoc = natspec::dev_documentation(&analysis.hir, id);
    snapbox::assert_data_eq!(
        serde_json::to_string_pretty(&devdoc).unwrap(),
        r#"{
  "author": "Me",
  "methods": {
    "transfer(address,uint256)": {
      "details": "Moves balance.",
      "params": {
        "to": "The recipient."
      },
      "return": "Success."
    }
  },
  "title": "Token"
}"#
    );
}
