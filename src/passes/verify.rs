//! Post-resolution audit
//!
//! Confirms the published invariant behind every later pass: each name a
//! unit defines maps to a completed type. A violation here is a bug in the
//! resolution pass, surfaced as an internal consistency error rather than
//! an input diagnostic.

use log::debug;

use crate::frontend::ast::SourceFile;
use crate::passes::{Granularity, Pass, PassKind, PassOutput, PassResults};
use crate::types::TypeArena;
use crate::utils::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifySummary {
    pub resolved: usize,
}

pub struct TypeVerifyPass;

impl Pass for TypeVerifyPass {
    fn kind(&self) -> PassKind {
        PassKind::TypeVerify
    }

    fn granularity(&self) -> Granularity {
        Granularity::PerUnit
    }

    fn dependencies(&self) -> Vec<PassKind> {
        vec![PassKind::TypeResolution]
    }

    fn run_unit(
        &self,
        unit: &SourceFile,
        arena: &mut TypeArena,
        results: &PassResults,
    ) -> Result<PassOutput> {
        let types = results.types(&unit.path).ok_or_else(|| {
            Error::internal(format!(
                "verify scheduled before resolution of `{}`",
                unit.path
            ))
        })?;
        for (name, &ty) in &types.defined {
            if !arena.is_completed(ty) {
                return Err(Error::internal(format!(
                    "`{}` published incomplete type `{}`",
                    name,
                    arena.display(ty)
                )));
            }
        }
        let summary = VerifySummary {
            resolved: types.defined.len(),
        };
        debug!("verified {} names in {}", summary.resolved, unit.path);
        Ok(PassOutput::Summary(summary))
    }
}
