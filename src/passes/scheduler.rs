//! Pass scheduling by declared dependency
//!
//! Each pass declares a kind, an execution granularity, and the pass kinds
//! it depends on. The compiler topologically orders registered passes and
//! runs each at its granularity; per-unit passes run over units ordered so
//! that imported units resolve before their importers. A pass result, once
//! published, is immutable and is the only channel through which later
//! passes or sibling units observe it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::debug;

use crate::frontend::ast::{Decl, SourceFile, Spec};
use crate::resolve::DefinedTypes;
use crate::types::TypeArena;
use crate::utils::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    TypeResolution,
    TypeVerify,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassKind::TypeResolution => "type resolution",
            PassKind::TypeVerify => "type verify",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    PerUnit,
    WholeProgram,
}

/// Published output of one pass for one unit.
#[derive(Debug, Clone)]
pub enum PassOutput {
    Types(DefinedTypes),
    Summary(crate::passes::verify::VerifySummary),
}

impl PassOutput {
    pub fn as_types(&self) -> Option<&DefinedTypes> {
        match self {
            PassOutput::Types(types) => Some(types),
            _ => None,
        }
    }
}

/// One analysis stage. Implementations override the run method matching
/// their declared granularity; the other one signals a scheduling bug.
pub trait Pass {
    fn kind(&self) -> PassKind;
    fn granularity(&self) -> Granularity;
    fn dependencies(&self) -> Vec<PassKind>;

    fn run_unit(
        &self,
        _unit: &SourceFile,
        _arena: &mut TypeArena,
        _results: &PassResults,
    ) -> Result<PassOutput> {
        Err(Error::internal(format!(
            "pass `{}` does not run per unit",
            self.kind()
        )))
    }

    fn run_program(
        &self,
        _project: &Project,
        _arena: &mut TypeArena,
        _results: &PassResults,
    ) -> Result<Vec<(String, PassOutput)>> {
        Err(Error::internal(format!(
            "pass `{}` does not run whole-program",
            self.kind()
        )))
    }
}

/// Per-(pass kind, unit path) result store.
#[derive(Default)]
pub struct PassResults {
    store: HashMap<(PassKind, String), PassOutput>,
}

impl PassResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a result. Once stored it never changes; publishing the same
    /// key twice is a scheduling bug.
    pub fn publish(&mut self, kind: PassKind, unit: &str, output: PassOutput) -> Result<()> {
        let key = (kind, unit.to_string());
        if self.store.contains_key(&key) {
            return Err(Error::internal(format!(
                "result of {} for `{}` published twice",
                kind, unit
            )));
        }
        self.store.insert(key, output);
        Ok(())
    }

    pub fn get(&self, kind: PassKind, unit: &str) -> Option<&PassOutput> {
        self.store.get(&(kind, unit.to_string()))
    }

    /// The resolved name table of a unit, if its resolution pass has run.
    pub fn types(&self, unit: &str) -> Option<&DefinedTypes> {
        self.get(PassKind::TypeResolution, unit)
            .and_then(PassOutput::as_types)
    }
}

/// All compilation units of one invocation, in file order.
#[derive(Default)]
pub struct Project {
    units: Vec<SourceFile>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, unit: SourceFile) {
        self.units.push(unit);
    }

    pub fn units(&self) -> &[SourceFile] {
        &self.units
    }

    /// Unit indices reordered so that imported units come before their
    /// importers: depth-first over import edges, file order otherwise.
    /// Import cycles are presumed absent and not detected here; an import
    /// left unpublished surfaces as `PackageNotFound` during resolution.
    fn resolution_order(&self) -> Vec<usize> {
        let index: HashMap<&str, usize> = self
            .units
            .iter()
            .enumerate()
            .map(|(i, unit)| (unit.path.as_str(), i))
            .collect();
        let mut state = vec![0u8; self.units.len()];
        let mut order = Vec::with_capacity(self.units.len());
        for i in 0..self.units.len() {
            self.visit(i, &index, &mut state, &mut order);
        }
        order
    }

    fn visit(
        &self,
        i: usize,
        index: &HashMap<&str, usize>,
        state: &mut Vec<u8>,
        order: &mut Vec<usize>,
    ) {
        if state[i] != 0 {
            return;
        }
        state[i] = 1;
        for path in unit_imports(&self.units[i]) {
            if let Some(&dep) = index.get(path) {
                self.visit(dep, index, state, order);
            }
        }
        state[i] = 2;
        order.push(i);
    }
}

fn unit_imports(unit: &SourceFile) -> Vec<&str> {
    let mut paths = Vec::new();
    for decl in &unit.decls {
        if let Decl::Group(group) = decl {
            for spec in &group.specs {
                if let Spec::Import(spec) = spec {
                    paths.push(spec.path.as_str());
                }
            }
        }
    }
    paths
}

/// Owns the project, the session type arena, the result store, and the
/// registered passes.
pub struct Compiler {
    pub project: Project,
    pub arena: TypeArena,
    pub results: PassResults,
    passes: Vec<Box<dyn Pass>>,
}

impl Compiler {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            arena: TypeArena::new(),
            results: PassResults::new(),
            passes: Vec::new(),
        }
    }

    pub fn register(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    /// Run every registered pass in dependency order.
    pub fn run(&mut self) -> Result<()> {
        let pass_order = self.pass_order()?;
        let unit_order = self.project.resolution_order();
        for pass_idx in pass_order {
            let pass = &self.passes[pass_idx];
            debug!("running pass `{}`", pass.kind());
            match pass.granularity() {
                Granularity::PerUnit => {
                    for &unit_idx in &unit_order {
                        let output = pass.run_unit(
                            &self.project.units[unit_idx],
                            &mut self.arena,
                            &self.results,
                        )?;
                        let path = self.project.units[unit_idx].path.clone();
                        self.results.publish(pass.kind(), &path, output)?;
                    }
                }
                Granularity::WholeProgram => {
                    let outputs =
                        pass.run_program(&self.project, &mut self.arena, &self.results)?;
                    for (path, output) in outputs {
                        self.results.publish(pass.kind(), &path, output)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Topological order over declared dependencies, keeping registration
    /// order among ready passes.
    fn pass_order(&self) -> Result<Vec<usize>> {
        let registered: HashSet<PassKind> = self.passes.iter().map(|p| p.kind()).collect();
        for pass in &self.passes {
            for dep in pass.dependencies() {
                if !registered.contains(&dep) {
                    return Err(Error::internal(format!(
                        "pass `{}` depends on unregistered pass `{}`",
                        pass.kind(),
                        dep
                    )));
                }
            }
        }

        let mut order = Vec::with_capacity(self.passes.len());
        let mut done: HashSet<PassKind> = HashSet::new();
        let mut pending: Vec<usize> = (0..self.passes.len()).collect();
        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|&i| {
                let pass = &self.passes[i];
                if pass.dependencies().iter().all(|dep| done.contains(dep)) {
                    done.insert(pass.kind());
                    order.push(i);
                    false
                } else {
                    true
                }
            });
            if pending.len() == before {
                return Err(Error::internal("circular pass dependencies"));
            }
        }
        Ok(order)
    }
}
