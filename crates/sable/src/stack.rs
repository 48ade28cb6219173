use crate::{
    CompiledContract, Contract, StackError,
    contract::cached,
    metadata::{self, ContractOutputs},
};
use alloy_primitives::Address;
use sable_ast::SourceParser;
use sable_codegen::{
    AbiFunctions, AssembledObject, Backend, BackendContext, LinkerObject, compute_source_mapping,
};
use sable_config::{CompilerSettings, Remapping, version};
use sable_data_structures::map::{FxHashMap, FxHashSet, FxIndexMap};
use sable_interface::{
    FileReader, ImportResolver, SourceId,
    diagnostics::{DiagCtxt, Diagnostic},
};
use sable_sema::{Analysis, ParsingContext, Sources, abi, analyze, hir::ContractId, natspec};
use std::fmt;

/// How far a [`CompilerStack`] got.
///
/// Every stage includes the previous ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StackState {
    Empty,
    SourcesAdded,
    /// All sources and their imports were parsed without errors.
    Parsed,
    /// Analysis succeeded: names and types are resolved.
    Resolved,
    Compiled,
}

/// The multi-file compilation driver.
///
/// Sources are added by name, then [parsed](Self::parse) (which also loads missing imports and
/// runs semantic analysis) and [compiled](Self::compile). Adding a source or changing the
/// settings discards everything derived from the previous sources.
///
/// # Examples
///
/// ```
/// use sable::{
///     CompilerStack, StackState,
///     ast::{ast::{ContractKind, SourceUnit}, build::AstBuilder},
///     codegen::{AssembledObject, BackendContext, BackendError},
///     data_structures::map::FxIndexMap,
///     interface::{Result, SourceId, diagnostics::DiagCtxt},
/// };
///
/// let parser = |id: SourceId, _: &str, _: &str, _: &DiagCtxt| -> Result<SourceUnit> {
///     let mut b = AstBuilder::new(id);
///     Ok(SourceUnit::new(vec![b.contract(ContractKind::Contract, "C", &[], vec![])]))
/// };
/// let backend = |_: BackendContext<'_>| -> Result<AssembledObject, BackendError> {
///     Ok(AssembledObject::default())
/// };
/// let mut stack = CompilerStack::new(parser, backend);
/// stack.add_source("c.sol", "contract C {}", false);
/// assert!(stack.compile(&FxIndexMap::default()).unwrap());
/// assert_eq!(stack.state(), StackState::Compiled);
/// assert_eq!(stack.contract_names().unwrap(), ["C"]);
/// ```
pub struct CompilerStack {
    parser: Box<dyn SourceParser>,
    backend: Box<dyn Backend>,
    reader: Option<Box<dyn FileReader>>,
    resolver: ImportResolver,
    settings: CompilerSettings,
    dcx: DiagCtxt,
    state: StackState,
    sources: Sources,
    analysis: Option<Analysis>,
    /// Records of every contract, by name, in processing order.
    contracts: FxIndexMap<String, Contract>,
    libraries: FxIndexMap<String, Address>,
    abi_functions: AbiFunctions,
}

impl fmt::Debug for CompilerStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerStack")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .field("sources", &self.sources)
            .field("contracts", &self.contracts.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl CompilerStack {
    /// Creates a new compiler stack.
    ///
    /// Without a [reader](Self::with_reader), every import of a source that was not added is an
    /// error.
    pub fn new(parser: impl SourceParser + 'static, backend: impl Backend + 'static) -> Self {
        let settings = CompilerSettings::default();
        Self {
            parser: Box::new(parser),
            backend: Box::new(backend),
            reader: None,
            resolver: ImportResolver::default(),
            abi_functions: AbiFunctions::new(settings.evm_version),
            settings,
            dcx: DiagCtxt::new(),
            state: StackState::Empty,
            sources: Sources::new(),
            analysis: None,
            contracts: FxIndexMap::default(),
            libraries: FxIndexMap::default(),
        }
    }

    /// Sets the reader used to load imported sources that were not added.
    pub fn with_reader(mut self, reader: impl FileReader + 'static) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    /// Sets the import remappings. Resets the derived state.
    pub fn set_remappings(&mut self, remappings: Vec<Remapping>) {
        self.settings.remappings = remappings;
        self.apply_settings();
    }

    /// Sets the compiler settings, including the remappings. Resets the derived state.
    pub fn set_settings(&mut self, settings: CompilerSettings) {
        self.settings = settings;
        self.apply_settings();
    }

    fn apply_settings(&mut self) {
        self.resolver.set_remappings(self.settings.remappings.clone());
        self.abi_functions = AbiFunctions::new(self.settings.evm_version);
        self.reset(true);
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    pub fn state(&self) -> StackState {
        self.state
    }

    /// Discards every result derived from the sources: syntax trees, analysis, compiled
    /// contracts, cached outputs, diagnostics and generated ABI functions.
    ///
    /// The sources themselves are discarded too unless `keep_sources` is set.
    pub fn reset(&mut self, keep_sources: bool) {
        self.analysis = None;
        self.contracts.clear();
        self.libraries.clear();
        self.abi_functions.clear();
        self.dcx.reset();
        if keep_sources {
            self.sources.clear_derived();
        } else {
            self.sources = Sources::new();
        }
        self.state =
            if self.sources.is_empty() { StackState::Empty } else { StackState::SourcesAdded };
    }

    /// Adds a source, replacing the content of the source with the same name.
    ///
    /// Library sources are only processed if imported. Returns `true` if a source with that name
    /// already existed.
    pub fn add_source(
        &mut self,
        name: impl Into<String>,
        content: impl Into<String>,
        is_library: bool,
    ) -> bool {
        self.reset(true);
        let (_, existed) = self.sources.add(name.into(), content.into(), is_library);
        self.state = StackState::SourcesAdded;
        existed
    }

    /// Returns the names of all sources, including the ones loaded through imports, in the
    /// order they were added.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name.as_str()).collect()
    }

    /// Parses all sources, loading missing imports, and analyzes them.
    ///
    /// Returns `true` if no error was reported. The result is memoized until the next reset.
    #[instrument(level = "debug", skip_all)]
    pub fn parse(&mut self) -> bool {
        if self.state >= StackState::Resolved {
            return true;
        }
        if self.state == StackState::Parsed || self.dcx.has_errors().is_err() {
            // A previous attempt failed: start over.
            self.reset(true);
        }

        ParsingContext {
            dcx: &self.dcx,
            parser: &mut *self.parser,
            reader: self.reader.as_deref_mut().map(|reader| reader as &mut dyn FileReader),
            resolver: &self.resolver,
        }
        .parse(&mut self.sources);

        if version::version_is_prerelease() {
            self.dcx
                .warn("This is a pre-release compiler version, please do not use it in production.")
                .emit();
        }
        if self.dcx.has_errors().is_err() {
            return false;
        }
        self.state = StackState::Parsed;

        let analysis = analyze(&self.sources, &self.dcx, &version::version());
        if self.dcx.has_errors().is_err() {
            return false;
        }

        for &source in &analysis.order {
            for id in analysis.hir.contracts_in(source) {
                let name = analysis.hir.contract(id).name.to_string();
                self.contracts.insert(name.clone(), Contract::new(id, name));
            }
        }
        debug!(contracts = self.contracts.len(), "resolved");
        self.analysis = Some(analysis);
        self.state = StackState::Resolved;
        true
    }

    /// Compiles every deployable contract and links the results against `libraries`.
    ///
    /// Parses first if needed. Contracts are compiled in processing order, each one after the
    /// contracts it depends on. Library names are either fully qualified (`source:Name`) or bare
    /// contract names.
    ///
    /// Returns `Ok(false)` if the sources have errors, which are available through
    /// [`errors`](Self::errors). Failures of the backend abort the compilation.
    #[instrument(level = "debug", skip_all)]
    pub fn compile(&mut self, libraries: &FxIndexMap<String, Address>) -> Result<bool, StackError> {
        if !self.parse() {
            return Ok(false);
        }
        if self.state < StackState::Compiled {
            self.compile_contracts()?;
            self.state = StackState::Compiled;
        }
        self.link(libraries);
        Ok(true)
    }

    fn compile_contracts(&mut self) -> Result<(), StackError> {
        let Some(analysis) = &self.analysis else {
            return Err(StackError::Internal("compiling without analysis".into()));
        };
        let mut cx = CompileCx {
            analysis,
            backend: &mut *self.backend,
            abi_functions: &mut self.abi_functions,
            settings: &self.settings,
            compiled: FxIndexMap::default(),
            in_progress: FxHashSet::default(),
            requested: FxHashMap::default(),
        };
        for &source in &analysis.order {
            for id in analysis.hir.contracts_in(source) {
                cx.compile_contract(id)?;
            }
        }

        let CompileCx { mut compiled, mut requested, .. } = cx;
        for contract in self.contracts.values_mut() {
            let compiled = match compiled.swap_remove(&contract.id) {
                Some(assembled) => CompiledContract {
                    object: assembled.creation.clone(),
                    runtime_object: assembled.runtime.clone(),
                    clone_object: assembled.clone.clone(),
                    abi_functions: requested.remove(&contract.id).unwrap_or_default(),
                    assembled,
                },
                None => CompiledContract::default(),
            };
            contract.compiled = Some(compiled);
        }
        Ok(())
    }

    /// Links every compiled contract against `libraries`, starting from the unlinked objects.
    fn link(&mut self, libraries: &FxIndexMap<String, Address>) {
        self.libraries = libraries.clone();
        for contract in self.contracts.values_mut() {
            let Some(compiled) = &mut contract.compiled else { continue };
            let link = |object: &LinkerObject| {
                let mut object = object.clone();
                object.link(libraries);
                object
            };
            compiled.object = link(&compiled.assembled.creation);
            compiled.runtime_object = link(&compiled.assembled.runtime);
            compiled.clone_object = compiled.assembled.clone.as_ref().map(link);
            // The metadata records the libraries.
            contract.metadata.take();
        }
    }

    /// Returns the diagnostics reported so far.
    pub fn errors(&self) -> Vec<Diagnostic> {
        self.dcx.diagnostics()
    }

    /// Returns the analysis results, if parsing succeeded.
    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    /// Returns the names of all contracts, sorted.
    pub fn contract_names(&self) -> Result<Vec<&str>, StackError> {
        self.resolved()?;
        let mut names: Vec<_> = self.contracts.keys().map(String::as_str).collect();
        names.sort_unstable();
        Ok(names)
    }

    /// Returns the record of the contract `name`.
    ///
    /// An empty name selects the only contract, if there is exactly one.
    pub fn contract(&self, name: &str) -> Result<&Contract, StackError> {
        self.resolved()?;
        let contract = if name.is_empty() {
            match self.contracts.len() {
                1 => self.contracts.last().map(|(_, contract)| contract),
                _ => None,
            }
        } else {
            self.contracts.get(name)
        };
        contract.ok_or_else(|| StackError::ContractNotFound(name.to_string()))
    }

    /// Returns the JSON ABI of a contract.
    pub fn interface(&self, name: &str) -> Result<&str, StackError> {
        let contract = self.contract(name)?;
        let analysis = self.resolved()?;
        cached(&contract.interface, || {
            Ok(serde_json::to_string(&abi::contract_abi(&analysis.hir, contract.id))?)
        })
    }

    /// Returns the user documentation of a contract as JSON.
    pub fn user_documentation(&self, name: &str) -> Result<&str, StackError> {
        let contract = self.contract(name)?;
        let analysis = self.resolved()?;
        cached(&contract.userdoc, || {
            Ok(serde_json::to_string(&natspec::user_documentation(&analysis.hir, contract.id))?)
        })
    }

    /// Returns the developer documentation of a contract as JSON.
    pub fn dev_documentation(&self, name: &str) -> Result<&str, StackError> {
        let contract = self.contract(name)?;
        let analysis = self.resolved()?;
        cached(&contract.devdoc, || {
            Ok(serde_json::to_string(&natspec::dev_documentation(&analysis.hir, contract.id))?)
        })
    }

    /// Returns the metadata JSON of a compiled contract.
    pub fn metadata(&self, name: &str) -> Result<&str, StackError> {
        let (contract, _) = self.compiled(name)?;
        let analysis = self.resolved()?;
        cached(&contract.metadata, || {
            let hir = &analysis.hir;
            let outputs = ContractOutputs {
                source: hir.contract(contract.id).source,
                name: &contract.name,
                abi: &abi::contract_abi(hir, contract.id),
                userdoc: &natspec::user_documentation(hir, contract.id),
                devdoc: &natspec::dev_documentation(hir, contract.id),
            };
            Ok(metadata::metadata(outputs, &self.sources, &self.settings, &self.libraries)?)
        })
    }

    /// Returns the linked creation bytecode of a contract.
    pub fn object(&self, name: &str) -> Result<&LinkerObject, StackError> {
        self.compiled(name).map(|(_, compiled)| &compiled.object)
    }

    /// Returns the linked runtime bytecode of a contract.
    pub fn runtime_object(&self, name: &str) -> Result<&LinkerObject, StackError> {
        self.compiled(name).map(|(_, compiled)| &compiled.runtime_object)
    }

    /// Returns the linked clone bytecode of a contract, if the backend produced one.
    pub fn clone_object(&self, name: &str) -> Result<Option<&LinkerObject>, StackError> {
        self.compiled(name).map(|(_, compiled)| compiled.clone_object.as_ref())
    }

    /// Returns the compressed source mapping of the creation bytecode of a contract.
    pub fn source_mapping(&self, name: &str) -> Result<&str, StackError> {
        let (contract, compiled) = self.compiled(name)?;
        cached(&contract.source_mapping, || {
            Ok(compute_source_mapping(&compiled.assembled.creation_items, &self.source_indices()))
        })
    }

    /// Returns the compressed source mapping of the runtime bytecode of a contract.
    pub fn runtime_source_mapping(&self, name: &str) -> Result<&str, StackError> {
        let (contract, compiled) = self.compiled(name)?;
        cached(&contract.runtime_source_mapping, || {
            Ok(compute_source_mapping(&compiled.assembled.runtime_items, &self.source_indices()))
        })
    }

    /// Returns the Yul code of the ABI helper functions requested while compiling a contract.
    pub fn abi_functions(&self, name: &str) -> Result<&str, StackError> {
        self.compiled(name).map(|(_, compiled)| compiled.abi_functions.as_str())
    }

    fn resolved(&self) -> Result<&Analysis, StackError> {
        match &self.analysis {
            Some(analysis) if self.state >= StackState::Resolved => Ok(analysis),
            _ => Err(StackError::NotParsed),
        }
    }

    fn compiled(&self, name: &str) -> Result<(&Contract, &CompiledContract), StackError> {
        let contract = self.contract(name)?;
        match &contract.compiled {
            Some(compiled) if self.state >= StackState::Compiled => Ok((contract, compiled)),
            _ => Err(StackError::NotCompiled),
        }
    }

    /// Source indices in source maps: the position of each source when sorted by name.
    fn source_indices(&self) -> FxHashMap<SourceId, usize> {
        let mut sources: Vec<_> =
            self.sources.iter_enumerated().map(|(id, source)| (source.name.as_str(), id)).collect();
        sources.sort_unstable();
        sources.into_iter().enumerate().map(|(index, (_, id))| (id, index)).collect()
    }
}

/// State of a single [`CompilerStack::compile`] run.
struct CompileCx<'a> {
    analysis: &'a Analysis,
    backend: &'a mut dyn Backend,
    abi_functions: &'a mut AbiFunctions,
    settings: &'a CompilerSettings,
    compiled: FxIndexMap<ContractId, AssembledObject>,
    in_progress: FxHashSet<ContractId>,
    /// The ABI functions requested by each compiled contract.
    requested: FxHashMap<ContractId, String>,
}

impl CompileCx<'_> {
    /// Compiles a contract after its dependencies, unless it is already compiled or can't be
    /// deployed.
    fn compile_contract(&mut self, id: ContractId) -> Result<(), StackError> {
        let analysis = self.analysis;
        let hir = &analysis.hir;
        let contract = hir.contract(id);
        if self.compiled.contains_key(&id) || !contract.fully_implemented {
            return Ok(());
        }
        if !self.in_progress.insert(id) {
            return Err(StackError::Internal(format!(
                "cyclic dependency on contract `{}`",
                contract.name
            )));
        }
        for &dependency in &contract.dependencies {
            self.compile_contract(dependency)?;
        }

        let _guard = debug_span!("compile_contract", name = %contract.name).entered();
        self.abi_functions.begin_unit();
        let ctx = BackendContext {
            hir,
            contract: id,
            compiled: &self.compiled,
            abi: &mut *self.abi_functions,
            evm_version: self.settings.evm_version,
            optimizer: self.settings.optimizer,
        };
        let assembled = self.backend.assemble(ctx)?;
        debug!(
            creation = assembled.creation.bytecode.len(),
            runtime = assembled.runtime.bytecode.len(),
            abi_functions = self.abi_functions.requested_functions().len(),
            "compiled"
        );
        self.requested.insert(id, self.abi_functions.requested_code());
        self.compiled.insert(id, assembled);
        self.in_progress.remove(&id);
        Ok(())
    }
}
