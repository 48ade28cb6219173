use crate::{AssemblyItem, JumpType};
use sable_data_structures::map::FxHashMap;
use sable_interface::SourceId;

#[derive(Clone, Copy, PartialEq, Eq)]
struct Entry {
    start: i64,
    length: i64,
    source: i64,
    jump: Option<JumpType>,
}

/// Computes the compressed source map of an instruction stream.
///
/// Entries are separated by `;` and have the form `start:length:source:jump`. A field equal to
/// the one of the previous entry is left empty, and trailing empty fields are dropped together
/// with their separators. Unknown values are `-1`.
pub fn compute_source_mapping(
    items: &[AssemblyItem],
    source_indices: &FxHashMap<SourceId, usize>,
) -> String {
    let mut out = String::new();
    let mut prev = Entry { start: -1, length: -1, source: -1, jump: None };
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        let span = item.span.filter(|span| !span.is_dummy());
        let source = span
            .and_then(|span| span.source())
            .and_then(|id| source_indices.get(&id))
            .map_or(-1, |&index| index as i64);
        let entry = Entry {
            start: span.map_or(-1, |span| i64::from(span.lo())),
            length: span.map_or(-1, |span| i64::from(span.len())),
            source,
            jump: Some(item.jump),
        };

        // The number of leading fields to write: everything up to the last changed one.
        let fields = if entry.jump != prev.jump {
            4
        } else if entry.source != prev.source {
            3
        } else if entry.length != prev.length {
            2
        } else if entry.start != prev.start {
            1
        } else {
            0
        };
        if fields >= 1 && entry.start != prev.start {
            out.push_str(&entry.start.to_string());
        }
        if fields >= 2 {
            out.push(':');
            if entry.length != prev.length {
                out.push_str(&entry.length.to_string());
            }
        }
        if fields >= 3 {
            out.push(':');
            if entry.source != prev.source {
                out.push_str(&entry.source.to_string());
            }
        }
        if fields >= 4 {
            out.push(':');
            out.push_str(&item.jump.to_string());
        }
        prev = entry;
    }
    out
}
