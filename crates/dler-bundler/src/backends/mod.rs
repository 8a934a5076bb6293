//! Build backends and the dispatcher that runs them.
//!
//! The four backend kinds are fixed ([`BuilderKind`]); each has one
//! [`Backend`] implementation. Backends only read the context and hand back
//! a [`BackendOutput`]; the dispatcher appends outputs to the context in
//! canonical order so parallel runs produce the same context as sequential
//! ones.

mod bundle;
mod copy;
mod declaration;
mod mirror;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dler_config::BuilderKind;
use futures::future::try_join_all;
use indexmap::IndexSet;

pub use bundle::{BundleBackend, ExternalsPlugin};
pub use copy::CopyBackend;
pub use declaration::DeclarationBackend;
pub use mirror::{MirrorBackend, rewrite_relative_imports};

use crate::context::{BuildContext, BuildEntry, Entry};
use crate::{Error, Result};

/// What one backend run contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOutput {
    pub entries: Vec<BuildEntry>,
    pub used_imports: IndexSet<String>,
    pub warnings: IndexSet<String>,
}

impl BackendOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_entry(&mut self, entry: BuildEntry) {
        self.entries.push(entry);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.insert(message.into());
    }

    /// Folds `other` into `self`, keeping first-seen order.
    pub fn extend(&mut self, other: BackendOutput) {
        self.entries.extend(other.entries);
        self.used_imports.extend(other.used_imports);
        self.warnings.extend(other.warnings);
    }

    fn merge_into(self, ctx: &mut BuildContext) {
        ctx.build_entries.extend(self.entries);
        ctx.used_imports.extend(self.used_imports);
        for warning in self.warnings {
            ctx.warn(warning);
        }
    }
}

/// One compilation strategy.
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BuilderKind;

    /// Builds `entries` (all of this backend's kind) and reports what was
    /// emitted.
    async fn build(&self, ctx: &BuildContext, entries: &[Entry]) -> Result<BackendOutput>;
}

/// Dispatch table: at most one backend per kind.
#[derive(Clone, Default)]
pub struct BackendSet {
    backends: BTreeMap<BuilderKind, Arc<dyn Backend>>,
}

impl fmt::Debug for BackendSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.backends.keys()).finish()
    }
}

impl BackendSet {
    /// The four built-in backends.
    pub fn standard() -> Self {
        Self::empty()
            .with_backend(DeclarationBackend)
            .with_backend(MirrorBackend)
            .with_backend(BundleBackend)
            .with_backend(CopyBackend)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Registers `backend`, replacing any backend of the same kind.
    pub fn with_backend<B: Backend + 'static>(mut self, backend: B) -> Self {
        self.backends.insert(backend.kind(), Arc::new(backend));
        self
    }

    pub fn get(&self, kind: BuilderKind) -> Option<&Arc<dyn Backend>> {
        self.backends.get(&kind)
    }
}

/// Runs every backend that has entries, in canonical order.
///
/// With `options.parallel` the backends run concurrently; their outputs are
/// still merged in canonical order. The first backend error aborts the
/// dispatch.
pub async fn run_backends(ctx: &mut BuildContext, backends: &BackendSet) -> Result<()> {
    let mut jobs: Vec<(Arc<dyn Backend>, Vec<Entry>)> = Vec::new();
    for kind in BuilderKind::ALL {
        let entries: Vec<Entry> = ctx.entries_for(kind).cloned().collect();
        if entries.is_empty() {
            continue;
        }
        let backend = backends.get(kind).ok_or_else(|| Error::Backend {
            backend: kind,
            message: "no backend registered for this builder".to_string(),
        })?;
        jobs.push((Arc::clone(backend), entries));
    }

    if ctx.options.parallel {
        tracing::debug!(package = %ctx.options.name, backends = jobs.len(), "running backends in parallel");
        let shared: &BuildContext = ctx;
        let outputs = try_join_all(
            jobs.iter()
                .map(|(backend, entries)| run_one(shared, backend.as_ref(), entries)),
        )
        .await?;
        for output in outputs {
            output.merge_into(ctx);
        }
    } else {
        for (backend, entries) in &jobs {
            let output = run_one(ctx, backend.as_ref(), entries).await?;
            output.merge_into(ctx);
        }
    }

    Ok(())
}

async fn run_one(ctx: &BuildContext, backend: &dyn Backend, entries: &[Entry]) -> Result<BackendOutput> {
    let kind = backend.kind();
    tracing::debug!(package = %ctx.options.name, backend = %kind, entries = entries.len(), "running backend");
    let output = backend.build(ctx, entries).await?;
    tracing::debug!(
        package = %ctx.options.name,
        backend = %kind,
        emitted = output.entries.len(),
        "backend finished"
    );
    Ok(output)
}
