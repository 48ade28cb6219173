//! Two-pass assembler with label resolution and library placeholders.

use crate::{AssemblyItem, JumpType, LinkerObject};
use alloy_primitives::U256;
use sable_data_structures::map::FxHashMap;
use sable_interface::Span;

/// A jump destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

#[derive(Clone, Debug)]
enum Inst {
    /// A raw opcode with no operands.
    Op(u8),
    /// A push of an immediate value, sized to fit.
    Push(U256),
    /// A push of a label's offset.
    PushLabel(Label),
    /// A `PUSH20` of a library address, left for the linker.
    PushLibrary(String),
    /// Raw bytes appended to the code, e.g. the runtime code of a creation object.
    Data(LinkerObject),
    /// Marks a position. Emits nothing.
    Label(Label),
}

/// An instruction stream under construction.
///
/// Each instruction records the source location set by [`Assembly::set_location`] at the time
/// it was emitted.
#[derive(Debug, Default)]
pub struct Assembly {
    instructions: Vec<(Inst, AssemblyItem)>,
    location: Option<Span>,
    next_label: u32,
}

/// The result of [`Assembly::assemble`].
#[derive(Debug)]
pub struct AssembledCode {
    pub object: LinkerObject,
    /// One item per emitted instruction.
    pub items: Vec<AssemblyItem>,
    pub labels: FxHashMap<Label, usize>,
}

impl Assembly {
    /// Creates an empty assembly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source location of the following instructions.
    pub fn set_location(&mut self, span: Option<Span>) {
        self.location = span;
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn push(&mut self, inst: Inst, jump: JumpType) {
        self.instructions.push((inst, AssemblyItem { span: self.location, jump }));
    }

    pub fn emit_op(&mut self, opcode: u8) {
        self.push(Inst::Op(opcode), JumpType::Ordinary);
    }

    /// Emits a `JUMP` annotated with how it transfers control.
    pub fn emit_jump(&mut self, jump: JumpType) {
        self.push(Inst::Op(opcodes::JUMP), jump);
    }

    pub fn emit_push(&mut self, value: U256) {
        self.push(Inst::Push(value), JumpType::Ordinary);
    }

    pub fn emit_push_label(&mut self, label: Label) {
        self.push(Inst::PushLabel(label), JumpType::Ordinary);
    }

    /// Emits a push of the address of `library`, to be filled in when linking.
    pub fn emit_push_library(&mut self, library: impl Into<String>) {
        self.push(Inst::PushLibrary(library.into()), JumpType::Ordinary);
    }

    /// Appends the bytes of `object`, keeping its unresolved references.
    pub fn append_data(&mut self, object: LinkerObject) {
        self.push(Inst::Data(object), JumpType::Ordinary);
    }

    /// Defines `label` at the current position, followed by a `JUMPDEST`.
    pub fn define_label(&mut self, label: Label) {
        self.instructions.push((Inst::Label(label), AssemblyItem::default()));
        self.emit_op(opcodes::JUMPDEST);
    }

    /// Assembles the instructions.
    ///
    /// Label pushes start out two bytes wide and are resized until all offsets are stable.
    pub fn assemble(self) -> AssembledCode {
        let mut widths: FxHashMap<usize, u8> = self
            .instructions
            .iter()
            .enumerate()
            .filter(|(_, (inst, _))| matches!(inst, Inst::PushLabel(_)))
            .map(|(i, _)| (i, 2))
            .collect();

        let max_iterations = 10;
        let mut labels = self.label_offsets(&widths);
        for _ in 0..max_iterations {
            let mut changed = false;
            for (i, (inst, _)) in self.instructions.iter().enumerate() {
                if let Inst::PushLabel(label) = inst
                    && let Some(&offset) = labels.get(label)
                {
                    let width = push_width(U256::from(offset)).max(1);
                    if widths.insert(i, width) != Some(width) {
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
            labels = self.label_offsets(&widths);
        }
        trace!(instructions = self.instructions.len(), labels = labels.len(), "assembled");
        self.emit(labels, &widths)
    }

    fn label_offsets(&self, widths: &FxHashMap<usize, u8>) -> FxHashMap<Label, usize> {
        let mut offset = 0;
        let mut labels = FxHashMap::default();
        for (i, (inst, _)) in self.instructions.iter().enumerate() {
            offset += match inst {
                Inst::Op(_) => 1,
                Inst::Push(value) => 1 + push_width(*value) as usize,
                Inst::PushLabel(_) => 1 + widths.get(&i).copied().unwrap_or(2) as usize,
                Inst::PushLibrary(_) => 21,
                Inst::Data(object) => object.bytecode.len(),
                Inst::Label(label) => {
                    labels.insert(*label, offset);
                    0
                }
            };
        }
        labels
    }

    fn emit(self, labels: FxHashMap<Label, usize>, widths: &FxHashMap<usize, u8>) -> AssembledCode {
        let mut object = LinkerObject::default();
        let mut items = Vec::with_capacity(self.instructions.len());
        for (i, (inst, item)) in self.instructions.into_iter().enumerate() {
            let code = &mut object.bytecode;
            match inst {
                Inst::Op(opcode) => code.push(opcode),
                Inst::Push(value) => push_value(code, value, push_width(value)),
                Inst::PushLabel(label) => {
                    let offset = labels.get(&label).copied().unwrap_or(0);
                    let width = widths.get(&i).copied().unwrap_or(2);
                    push_value(code, U256::from(offset), width);
                }
                Inst::PushLibrary(name) => {
                    code.push(opcodes::PUSH20);
                    object.link_references.insert(code.len(), name);
                    code.extend([0; 20]);
                }
                Inst::Data(data) => object.append(&data),
                Inst::Label(_) => continue,
            }
            items.push(item);
        }
        AssembledCode { object, items, labels }
    }
}

/// Returns the number of bytes needed to push a value. Zero is pushed with `PUSH0`.
fn push_width(value: U256) -> u8 {
    (value.bit_len().div_ceil(8)) as u8
}

fn push_value(code: &mut Vec<u8>, value: U256, width: u8) {
    code.push(opcodes::PUSH0 + width);
    let bytes = value.to_be_bytes::<32>();
    code.extend_from_slice(&bytes[32 - width as usize..]);
}

/// The opcodes the assembler and its tests emit by name.
pub mod opcodes {
    pub const STOP: u8 = 0x00;
    pub const ADD: u8 = 0x01;
    pub const CALLVALUE: u8 = 0x34;
    pub const JUMP: u8 = 0x56;
    pub const JUMPDEST: u8 = 0x5b;
    pub const PUSH0: u8 = 0x5f;
    pub const PUSH20: u8 = 0x73;
    pub const DELEGATECALL: u8 = 0xf4;
    pub const INVALID: u8 = 0xfe;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_interface::SourceId;

    #[test]
    fn widths() {
        assert_eq!(push_width(U256::ZERO), 0);
        assert_eq!(push_width(U256::from(1)), 1);
        assert_eq!(push_width(U256::from(255)), 1);
        assert_eq!(push_width(U256::from(256)), 2);
        assert_eq!(push_width(U256::from(0x10000)), 3);
        assert_eq!(push_width(U256::MAX), 32);
    }

    #[test]
    fn simple() {
        let mut asm = Assembly::new();
        asm.emit_push(U256::from(42));
        asm.emit_push(U256::ZERO);
        asm.emit_op(opcodes::ADD);
        asm.emit_op(opcodes::STOP);
        let code = asm.assemble();
        assert_eq!(code.object.bytecode, [0x60, 42, 0x5f, 0x01, 0x00]);
        assert_eq!(code.items.len(), 4);
    }

    #[test]
    fn labels_and_jumps() {
        let mut asm = Assembly::new();
        let span = Span::new(SourceId::new(0), 3, 9);
        let end = asm.new_label();
        asm.emit_push_label(end);
        asm.set_location(Some(span));
        asm.emit_jump(JumpType::IntoFunction);
        asm.set_location(None);
        asm.emit_op(opcodes::INVALID);
        asm.define_label(end);
        asm.emit_op(opcodes::STOP);
        let code = asm.assemble();

        assert_eq!(code.labels[&end], 4);
        assert_eq!(code.object.bytecode, [0x60, 4, 0x56, 0xfe, 0x5b, 0x00]);
        assert_eq!(code.items[1], AssemblyItem { span: Some(span), jump: JumpType::IntoFunction });
        assert_eq!(code.items.len(), 5);
    }

    #[test]
    fn library_placeholders() {
        let mut asm = Assembly::new();
        asm.emit_op(opcodes::CALLVALUE);
        asm.emit_push_library("lib.sol:L");
        asm.emit_op(opcodes::DELEGATECALL);
        let code = asm.assemble();
        assert_eq!(code.object.bytecode.len(), 23);
        assert_eq!(code.object.link_references[&2], "lib.sol:L");
    }
}
