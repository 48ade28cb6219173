use sable_ast::{SourceParser, ast};
use sable_data_structures::{
    index::IndexVec,
    map::{FxHashMap, FxHashSet},
};
use sable_interface::{
    FileReader, ImportResolver, SourceId, Span,
    diagnostics::{DiagCtxt, ErrorKind},
};
use std::fmt;

/// Parses the sources of a compilation, loading missing imports along the way.
///
/// Sources discovered through imports are appended to the list and parsed in the same pass.
pub struct ParsingContext<'a> {
    /// The diagnostics context.
    pub dcx: &'a DiagCtxt,
    /// The parser collaborator.
    pub parser: &'a mut dyn SourceParser,
    /// Loads the text of imported sources that are not known yet.
    ///
    /// Without a reader, every unknown import is an error.
    pub reader: Option<&'a mut dyn FileReader>,
    /// Resolves import paths to source names.
    pub resolver: &'a ImportResolver,
}

impl ParsingContext<'_> {
    /// Parses every source that doesn't have a syntax tree yet, recursing into imports.
    ///
    /// Errors are emitted to the diagnostics context; parsing continues with the remaining
    /// sources.
    #[instrument(level = "debug", skip_all)]
    pub fn parse(&mut self, sources: &mut Sources) {
        // `sources` grows while we iterate.
        for i in 0.. {
            let id = SourceId::new(i);
            let Some(source) = sources.get(id) else { break };
            if source.ast.is_some() || source.parse_failed {
                continue;
            }

            let _span = debug_span!("parse_one", name = %source.name).entered();
            let ast = self.parser.parse_source(id, &source.name, &source.text, self.dcx);
            let Ok(ast) = ast else {
                sources.sources[id].parse_failed = true;
                continue;
            };
            let importer = source.name.clone();
            let imports = self.load_imports(sources, &importer, &ast);
            let source = &mut sources.sources[id];
            source.imports = imports;
            source.ast = Some(ast);
        }
        debug!(num_sources = sources.len(), "parsed all sources");
    }

    /// Resolves the imports of a source, fetching the ones that aren't known.
    ///
    /// Returns the imports that could be resolved, with the span of their directive.
    fn load_imports(
        &mut self,
        sources: &mut Sources,
        importer: &str,
        ast: &ast::SourceUnit,
    ) -> Vec<(Span, SourceId)> {
        let mut imports = Vec::new();
        for (span, import) in ast.imports() {
            let name = self.resolver.resolve(&import.path.value, importer);
            trace!(path = %import.path.value, %name, "import path resolved");
            if let Some(id) = sources.find(&name) {
                imports.push((span, id));
                continue;
            }

            debug!(%name, "fetching imported source");
            let text = match self.reader.as_deref_mut() {
                Some(reader) => reader.read(&name),
                None => Err("File not found.".to_string()),
            };
            match text {
                Ok(text) => {
                    let (id, _) = sources.add(name, text, false);
                    imports.push((span, id));
                }
                Err(msg) => {
                    self.dcx.err(ErrorKind::ParseError, msg).span(span).emit();
                }
            }
        }
        imports
    }
}

/// The sources of a compilation, in registration order.
#[derive(Default)]
pub struct Sources {
    sources: IndexVec<SourceId, Source>,
    by_name: FxHashMap<String, SourceId>,
}

impl fmt::Debug for Sources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sources")?;
        self.sources.fmt(f)
    }
}

impl Sources {
    /// Creates a new, empty list of sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source, or replaces the content of the source with the same name.
    ///
    /// Returns the source's ID and whether a source with that name already existed. Replacing a
    /// source drops its syntax tree and imports.
    pub fn add(&mut self, name: String, text: String, is_library: bool) -> (SourceId, bool) {
        if let Some(&id) = self.by_name.get(&name) {
            self.sources[id] = Source::new(name, text, is_library);
            return (id, true);
        }
        let id = self.sources.push(Source::new(name.clone(), text, is_library));
        self.by_name.insert(name, id);
        (id, false)
    }

    /// Returns the ID of the source named `name`.
    pub fn find(&self, name: &str) -> Option<SourceId> {
        self.by_name.get(name).copied()
    }

    /// Returns the source with the given ID.
    #[inline]
    pub fn source(&self, id: SourceId) -> &Source {
        &self.sources[id]
    }

    /// Returns an iterator over the sources and their IDs.
    pub fn iter_enumerated(&self) -> impl ExactSizeIterator<Item = (SourceId, &Source)> + '_ {
        self.sources.iter_enumerated()
    }

    /// Drops the syntax trees and imports of every source, keeping their content.
    pub fn clear_derived(&mut self) {
        for source in self.sources.iter_mut() {
            source.ast = None;
            source.imports.clear();
            source.parse_failed = false;
        }
    }

    /// Returns the order in which sources must be processed: every source comes after the
    /// sources it imports, unless they import each other.
    ///
    /// The traversal starts from the non-library sources, in registration order. Library sources
    /// are only included if they are imported.
    #[instrument(level = "debug", skip_all)]
    pub fn topo_order(&self) -> Vec<SourceId> {
        let mut order = Vec::with_capacity(self.sources.len());
        let mut seen = FxHashSet::default();
        debug_span!("topo_order").in_scope(|| {
            for (id, source) in self.sources.iter_enumerated() {
                if !source.is_library {
                    self.visit(id, &mut order, &mut seen);
                }
            }
        });
        order
    }

    fn visit(&self, id: SourceId, order: &mut Vec<SourceId>, seen: &mut FxHashSet<SourceId>) {
        if !seen.insert(id) {
            return;
        }
        for &(_, import) in &self.sources[id].imports {
            self.visit(import, order, seen);
        }
        order.push(id);
    }
}

impl std::ops::Deref for Sources {
    type Target = IndexVec<SourceId, Source>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.sources
    }
}

/// A single source.
pub struct Source {
    /// The source name, as registered or resolved from an import.
    pub name: String,
    /// The source text.
    pub text: String,
    /// Whether the source was added as a library. Library sources are only processed when
    /// imported.
    pub is_library: bool,
    /// The spans of the import directives and the source IDs they resolved to.
    pub imports: Vec<(Span, SourceId)>,
    /// The syntax tree.
    ///
    /// `None` if not yet parsed, or if the parser failed.
    pub ast: Option<ast::SourceUnit>,
    parse_failed: bool,
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name)
            .field("is_library", &self.is_library)
            .field("imports", &self.imports)
            .field("ast", &self.ast.as_ref().map(|ast| format!("{} items", ast.items.len())))
            .finish()
    }
}

impl Source {
    /// Creates a new, unparsed source.
    pub fn new(name: String, text: String, is_library: bool) -> Self {
        Self { name, text, is_library, imports: Vec::new(), ast: None, parse_failed: false }
    }
}
