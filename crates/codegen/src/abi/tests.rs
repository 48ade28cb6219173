use super::{
    interp::{Halt, Interpreter},
    *,
};
use alloy_primitives::keccak256;
use proptest::prelude::*;
use sable_ast::ast::StateMutability;
use sable_sema::{
    hir::{EnumId, StructId},
    ty::{ArrayKind, FunctionTy, StructTy},
};

fn pool() -> AbiFunctions {
    AbiFunctions::new(EvmVersion::default())
}

fn run(pool: &AbiFunctions) -> Interpreter {
    Interpreter::new(&pool.requested_code())
}

fn bytes_memory() -> Ty {
    Ty::byte_array(ArrayKind::Bytes, DataLocation::Memory)
}

fn string_memory() -> Ty {
    Ty::byte_array(ArrayKind::String, DataLocation::Memory)
}

fn external_function() -> Ty {
    Ty::Function(FunctionTy {
        kind: FunctionTyKind::External,
        parameters: vec![],
        returns: vec![],
        state_mutability: StateMutability::View,
    })
}

fn word(bytes: &[u8]) -> U256 {
    let mut word = [0u8; 32];
    word[..bytes.len()].copy_from_slice(bytes);
    U256::from_be_bytes(word)
}

#[test]
fn functions_are_generated_once() {
    let mut pool = pool();
    let a = pool.cleanup_function(&Ty::uint(8), false).unwrap();
    let len = pool.len();
    let b = pool.cleanup_function(&Ty::uint(8), false).unwrap();
    assert_eq!(a, "cleanup_assert_t_uint8");
    assert_eq!(a, b);
    assert_eq!(pool.len(), len);

    // Helpers are generated along with the function calling them.
    let encoder = pool
        .abi_encoding_function(&Ty::uint(8), &Ty::uint(8), EncodingOptions::default())
        .unwrap();
    assert_eq!(encoder, "abi_encode_t_uint8_to_t_uint8");
    assert_eq!(pool.get(&encoder).unwrap().helpers, [a.clone()]);
    assert_eq!(pool.len(), 2);

    snapbox::assert_data_eq!(
        pool.get(&a).unwrap().body.clone(),
        "function cleanup_assert_t_uint8(value) -> cleaned {
    cleaned := and(value, 0xff)
}
"
    );
}

#[test]
fn generation_is_deterministic() {
    let generate = || {
        let mut pool = pool();
        let tys = [Ty::UINT256, string_memory(), Ty::Bool, external_function()];
        pool.tuple_encoder(&tys, &tys, false).unwrap();
        pool.requested_code()
    };
    let code = generate();
    assert!(!code.is_empty());
    assert_eq!(code, generate());
}

#[test]
fn requested_functions_per_unit() {
    let mut pool = pool();
    pool.abi_encoding_function(&Ty::Address, &Ty::Address, EncodingOptions::default()).unwrap();
    let names: Vec<_> = pool.requested_functions().into_iter().map(|(name, _)| name).collect();
    let expected = [
        "abi_encode_t_address_to_t_address",
        "cleanup_assert_t_address",
        "cleanup_assert_t_uint160",
    ];
    assert_eq!(names, expected);

    // Functions generated for an earlier unit are still requested transitively.
    pool.begin_unit();
    assert!(pool.requested_code().is_empty());
    pool.cleanup_function(&Ty::Address, false).unwrap();
    assert_eq!(pool.requested_functions().len(), 2);
    assert_eq!(pool.len(), 3);

    pool.clear();
    assert!(pool.is_empty());
    assert!(pool.requested_code().is_empty());
}

#[test]
fn tuple_with_dynamic_element() {
    let mut pool = pool();
    let tys = [Ty::UINT256, string_memory(), Ty::Bool];
    let encoder = pool.tuple_encoder(&tys, &tys, false).unwrap();

    let mut interp = run(&pool);
    let string = 0x80;
    interp.mstore(string, U256::from(3));
    interp.write_memory(string + 32, b"abc");
    let head = 0x200;
    let args = [U256::from(head), U256::from(7), U256::from(string), U256::from(2)];
    let tail = interp.call1(&encoder, &args).unwrap();

    assert_eq!(tail, U256::from(head + 0xa0));
    assert_eq!(interp.mload(head), U256::from(7));
    // Offset of the string, relative to the start of the tuple.
    assert_eq!(interp.mload(head + 0x20), U256::from(0x60));
    assert_eq!(interp.mload(head + 0x40), U256::from(1));
    assert_eq!(interp.mload(head + 0x60), U256::from(3));
    assert_eq!(interp.mload(head + 0x80), word(b"abc"));
}

#[test]
fn tuple_arity_mismatch() {
    let mut pool = pool();
    let err = pool.tuple_encoder(&[Ty::Bool], &[Ty::Bool, Ty::Bool], false).unwrap_err();
    assert!(matches!(err, AbiError::Internal(_)), "{err}");
}

#[test]
fn memory_array_of_strings() {
    let mut pool = pool();
    let array = Ty::array(string_memory(), None, DataLocation::Memory);
    let encoder = pool.abi_encoding_function(&array, &array, EncodingOptions::default()).unwrap();

    let mut interp = run(&pool);
    // ["a", "bc"] at 0x80, with the strings at 0x100 and 0x140.
    interp.mstore(0x80, U256::from(2));
    interp.mstore(0xa0, U256::from(0x100));
    interp.mstore(0xc0, U256::from(0x140));
    interp.mstore(0x100, U256::from(1));
    interp.write_memory(0x120, b"a");
    interp.mstore(0x140, U256::from(2));
    interp.write_memory(0x160, b"bc");
    let pos = 0x400;
    let end = interp.call1(&encoder, &[U256::from(0x80), U256::from(pos)]).unwrap();

    assert_eq!(interp.mload(pos), U256::from(2));
    assert_eq!(interp.mload(pos + 0x20), U256::from(0x40));
    assert_eq!(interp.mload(pos + 0x40), U256::from(0x80));
    assert_eq!(interp.mload(pos + 0x60), U256::from(1));
    assert_eq!(interp.mload(pos + 0x80), word(b"a"));
    assert_eq!(interp.mload(pos + 0xa0), U256::from(2));
    assert_eq!(interp.mload(pos + 0xc0), word(b"bc"));
    assert_eq!(end, U256::from(pos + 0xe0));
}

#[test]
fn string_literals() {
    let mut pool = pool();
    let exact = vec![b'x'; 32];
    let literal = Ty::StringLiteral(exact.clone());
    let encoder = pool
        .abi_encoding_function(&literal, &Ty::FixedBytes(32), EncodingOptions::default())
        .unwrap();
    let mut interp = run(&pool);
    assert_eq!(interp.call(&encoder, &[U256::from(0x80)]), Ok(vec![]));
    assert_eq!(interp.mload(0x80), word(&exact));

    let long = Ty::StringLiteral(vec![b'y'; 33]);
    let err = pool
        .abi_encoding_function(&long, &Ty::FixedBytes(32), EncodingOptions::default())
        .unwrap_err();
    assert!(matches!(err, AbiError::Internal(_)), "{err}");

    let encoder = pool
        .abi_encoding_function(&long, &bytes_memory(), EncodingOptions::default())
        .unwrap();
    let mut interp = run(&pool);
    let end = interp.call1(&encoder, &[U256::from(0x80)]).unwrap();
    assert_eq!(end, U256::from(0x80 + 0x60));
    assert_eq!(interp.mload(0x80), U256::from(33));
    assert_eq!(interp.mload(0xa0), word(&[b'y'; 32]));
    assert_eq!(interp.mload(0xc0), word(b"y"));
}

#[test]
fn storage_byte_arrays() {
    let from = Ty::byte_array(ArrayKind::Bytes, DataLocation::Storage);
    let mut pool = pool();
    let encoder = pool.abi_encoding_function(&from, &from, EncodingOptions::default()).unwrap();
    let slot = U256::from(5);
    let pos = 0x100;

    // 31 bytes fit in the slot, next to twice the length.
    let short = [0xab; 31];
    let mut interp = run(&pool);
    interp.storage.insert(slot, word(&short) | U256::from(62));
    let end = interp.call1(&encoder, &[slot, U256::from(pos)]).unwrap();
    assert_eq!(end, U256::from(pos + 0x40));
    assert_eq!(interp.mload(pos), U256::from(31));
    assert_eq!(interp.mload(pos + 0x20), word(&short));

    // 32 bytes are stored at the hash of the slot.
    let long = [0xcd; 32];
    let mut interp = run(&pool);
    interp.storage.insert(slot, U256::from(65));
    let data = U256::from_be_bytes(keccak256(slot.to_be_bytes::<32>()).0);
    interp.storage.insert(data, word(&long));
    let end = interp.call1(&encoder, &[slot, U256::from(pos)]).unwrap();
    assert_eq!(end, U256::from(pos + 0x40));
    assert_eq!(interp.mload(pos), U256::from(32));
    assert_eq!(interp.mload(pos + 0x20), word(&long));

    let mut interp = run(&pool);
    let end = interp.call1(&encoder, &[slot, U256::from(pos)]).unwrap();
    assert_eq!(end, U256::from(pos + 0x20));
    assert_eq!(interp.mload(pos), U256::ZERO);
}

#[test]
fn calldata_byte_array() {
    let from = Ty::byte_array(ArrayKind::Bytes, DataLocation::Calldata);
    let mut pool = pool();
    let encoder =
        pool.abi_encoding_function(&from, &bytes_memory(), EncodingOptions::default()).unwrap();

    let mut interp = run(&pool);
    interp.calldata = vec![0xaa; 40];
    let pos = 0x100;
    // Dirty memory where the padding goes.
    interp.write_memory(pos, &[0xff; 0x60]);
    let end = interp.call1(&encoder, &[U256::from(4), U256::from(33), U256::from(pos)]).unwrap();

    assert_eq!(end, U256::from(pos + 0x60));
    assert_eq!(interp.mload(pos), U256::from(33));
    assert_eq!(interp.mload(pos + 0x20), word(&[0xaa; 32]));
    assert_eq!(interp.mload(pos + 0x40), word(&[0xaa]));
}

#[test]
fn packed_storage_array() {
    let from = Ty::array(Ty::uint(8), None, DataLocation::Storage);
    let to = Ty::array(Ty::uint(8), None, DataLocation::Memory);
    let mut pool = pool();
    let encoder = pool.abi_encoding_function(&from, &to, EncodingOptions::default()).unwrap();

    let slot = U256::from(3);
    let mut interp = run(&pool);
    interp.storage.insert(slot, U256::from(3));
    let data = U256::from_be_bytes(keccak256(slot.to_be_bytes::<32>()).0);
    interp.storage.insert(data, U256::from(0x030201));
    let end = interp.call1(&encoder, &[slot, U256::from(0x80)]).unwrap();

    assert_eq!(end, U256::from(0x80 + 0x80));
    for i in 0..4 {
        assert_eq!(interp.mload(0x80 + i * 0x20), U256::from(if i == 0 { 3 } else { i }));
    }
}

#[test]
fn library_storage_references() {
    let from = Ty::array(Ty::UINT256, None, DataLocation::Storage);
    let mut pool = pool();
    let encoder = pool.abi_encoding_function(&from, &from, EncodingOptions::new(true)).unwrap();
    assert!(encoder.ends_with("_to_t_uint256_library"), "{encoder}");
    let mut interp = run(&pool);
    interp.call(&encoder, &[U256::from(9), U256::ZERO]).unwrap();
    assert_eq!(interp.mload(0), U256::from(9));
}

#[test]
fn external_function_references() {
    let mut pool = pool();
    let f = external_function();
    let split = pool.abi_encoding_function(&f, &f, EncodingOptions::default()).unwrap();
    let compacted = EncodingOptions { compacted: true, ..Default::default() };
    let combined = pool.abi_encoding_function(&f, &f, compacted).unwrap();
    assert!(combined.ends_with("_compacted"));

    // Only external function references have a compacted variant.
    let plain = pool.abi_encoding_function(&Ty::Bool, &Ty::Bool, compacted).unwrap();
    assert_eq!(plain, "abi_encode_t_bool_to_t_bool");

    let mut interp = run(&pool);
    let addr = U256::from(0x1234);
    let selector = U256::from(0xdeadbeef_u32);
    interp.call(&split, &[addr, selector, U256::ZERO]).unwrap();
    let expected = ((addr << 32) | selector) << 64;
    assert_eq!(interp.mload(0), expected);
    interp.call(&combined, &[expected | U256::from(0xff), U256::from(0x20)]).unwrap();
    assert_eq!(interp.mload(0x20), expected);
}

#[test]
fn enum_cleanup() {
    let e = Ty::Enum { id: EnumId::new(0), name: "E".into(), members: 3 };
    let mut pool = pool();
    let revert = pool.cleanup_function(&e, true).unwrap();
    let invalid = pool.cleanup_function(&e, false).unwrap();
    let mut interp = run(&pool);
    assert_eq!(interp.call1(&revert, &[U256::from(2)]), Ok(U256::from(2)));
    assert_eq!(interp.call1(&revert, &[U256::from(3)]), Err(Halt::Revert));
    assert_eq!(interp.call1(&invalid, &[U256::from(3)]), Err(Halt::Invalid));

    let convert = pool.conversion_function(&Ty::UINT256, &e).unwrap();
    let mut interp = run(&pool);
    assert_eq!(interp.call1(&convert, &[U256::from(7)]), Err(Halt::Revert));
}

#[test]
fn conversions() {
    let mut pool = pool();
    let to_bytes = pool.conversion_function(&Ty::uint(32), &Ty::FixedBytes(4)).unwrap();
    let to_uint = pool.conversion_function(&Ty::FixedBytes(4), &Ty::uint(32)).unwrap();
    let narrow = pool.conversion_function(&Ty::UINT256, &Ty::uint(16)).unwrap();
    let mut interp = run(&pool);

    let bytes = interp.call1(&to_bytes, &[U256::from(0x11223344)]).unwrap();
    assert_eq!(bytes, word(&[0x11, 0x22, 0x33, 0x44]));
    assert_eq!(interp.call1(&to_uint, &[bytes]), Ok(U256::from(0x11223344)));
    assert_eq!(interp.call1(&narrow, &[U256::from(0x12345)]), Ok(U256::from(0x2345)));

    let err = pool.conversion_function(&Ty::Bool, &Ty::Address).unwrap_err();
    assert!(matches!(err, AbiError::Internal(_)), "{err}");
}

#[test]
fn shifts_depend_on_evm_version() {
    let mut old = AbiFunctions::new(EvmVersion::Byzantium);
    let mut new = AbiFunctions::new(EvmVersion::Constantinople);
    for pool in [&mut old, &mut new] {
        pool.shift_left_function(8).unwrap();
        pool.shift_right_function(8, true).unwrap();
    }
    assert!(old.requested_code().contains("mul(value, 0x100)"));
    assert!(old.requested_code().contains("sdiv(value, 0x100)"));
    assert!(new.requested_code().contains("shl(8, value)"));
    assert!(new.requested_code().contains("sar(8, value)"));

    // Both variants compute the same values.
    let values = [U256::from(0x1234), U256::MAX - U256::from(0x1ff)];
    let (mut old, mut new) = (run(&old), run(&new));
    for value in values {
        for name in ["shift_left_8", "shift_right_8_signed"] {
            assert_eq!(old.call1(name, &[value]), new.call1(name, &[value]), "{name}({value})");
        }
    }

    assert!(matches!(pool().shift_left_function(256), Err(AbiError::Internal(_))));
}

#[test]
fn unsupported_types() {
    let mut pool = pool();
    let fixed = Ty::FixedPoint { bits: 128, decimals: 18, signed: true };
    assert!(matches!(pool.cleanup_function(&fixed, false), Err(AbiError::Unimplemented(_))));
    let tuple = Ty::Tuple(vec![Ty::Bool]);
    assert!(matches!(pool.cleanup_function(&tuple, false), Err(AbiError::Internal(_))));

    let strukt = Ty::Struct(StructTy {
        id: StructId::new(0),
        name: "S".into(),
        fields: vec![("a".into(), Ty::UINT256)],
        location: DataLocation::Memory,
    });
    let err = pool.abi_encoding_function(&strukt, &strukt, EncodingOptions::default());
    assert!(matches!(err, Err(AbiError::Unimplemented(_))), "{err:?}");

    let calldata = Ty::byte_array(ArrayKind::Bytes, DataLocation::Calldata);
    assert!(matches!(pool.array_length_function(&calldata), Err(AbiError::Internal(_))));
}

#[test]
fn nesting_limit() {
    let mut ty = Ty::UINT256;
    for _ in 0..MAX_ENCODING_DEPTH + 1 {
        ty = Ty::array(ty, None, DataLocation::Memory);
    }
    let mut pool = pool();
    let err = pool.abi_encoding_function(&ty, &ty, EncodingOptions::default()).unwrap_err();
    assert!(matches!(err, AbiError::Internal(_)), "{err}");

    // The pool is still usable.
    let ok = Ty::array(Ty::UINT256, None, DataLocation::Memory);
    pool.abi_encoding_function(&ok, &ok, EncodingOptions::default()).unwrap();
}

proptest! {
    #[test]
    fn cleanup_is_idempotent(
        bytes in 1u16..=32,
        signed in any::<bool>(),
        raw in any::<[u8; 32]>(),
    ) {
        let ty = if signed { Ty::int(bytes * 8) } else { Ty::uint(bytes * 8) };
        let mut pool = pool();
        let cleanup = pool.cleanup_function(&ty, false).unwrap();
        let mut interp = run(&pool);

        let value = U256::from_be_bytes(raw);
        let once = interp.call1(&cleanup, &[value]).unwrap();
        prop_assert_eq!(interp.call1(&cleanup, &[once]).unwrap(), once);
        let bits = usize::from(bytes) * 8;
        if !signed && bits < 256 {
            prop_assert!(once < U256::from(1) << bits);
        }
    }
}
