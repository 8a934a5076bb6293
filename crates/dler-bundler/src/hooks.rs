//! Lifecycle hooks: ordered callback lists run at fixed pipeline points.

use std::fmt;
use std::sync::Arc;

use crate::Result;
use crate::context::BuildContext;

pub type HookFn = Arc<dyn Fn(&mut BuildContext) -> Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    /// After the context is assembled, before entries are normalized.
    Prepare,
    /// After cleaning, before the backends run.
    Before,
    /// After validation (or right after the backends in stub/watch mode).
    Done,
}

impl HookStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "build:prepare",
            Self::Before => "build:before",
            Self::Done => "build:done",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Default)]
pub struct BuildHooks {
    prepare: Vec<HookFn>,
    before: Vec<HookFn>,
    done: Vec<HookFn>,
}

impl fmt::Debug for BuildHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildHooks")
            .field("prepare", &self.prepare.len())
            .field("before", &self.before.len())
            .field("done", &self.done.len())
            .finish()
    }
}

impl BuildHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback to `stage`.
    pub fn on<F>(&mut self, stage: HookStage, hook: F) -> &mut Self
    where
        F: Fn(&mut BuildContext) -> Result<()> + Send + Sync + 'static,
    {
        self.list_mut(stage).push(Arc::new(hook));
        self
    }

    pub fn with<F>(mut self, stage: HookStage, hook: F) -> Self
    where
        F: Fn(&mut BuildContext) -> Result<()> + Send + Sync + 'static,
    {
        self.on(stage, hook);
        self
    }

    /// Appends every callback of `other` after the existing ones.
    pub fn extend(&mut self, other: BuildHooks) {
        self.prepare.extend(other.prepare);
        self.before.extend(other.before);
        self.done.extend(other.done);
    }

    pub fn len(&self, stage: HookStage) -> usize {
        self.list(stage).len()
    }

    /// Runs the callbacks for `stage` in registration order; the first
    /// error stops the run.
    pub fn call(&self, stage: HookStage, ctx: &mut BuildContext) -> Result<()> {
        let hooks = self.list(stage);
        if !hooks.is_empty() {
            tracing::debug!(hook = %stage, count = hooks.len(), "running hooks");
        }
        for hook in hooks {
            hook(ctx)?;
        }
        Ok(())
    }

    fn list(&self, stage: HookStage) -> &[HookFn] {
        match stage {
            HookStage::Prepare => &self.prepare,
            HookStage::Before => &self.before,
            HookStage::Done => &self.done,
        }
    }

    fn list_mut(&mut self, stage: HookStage) -> &mut Vec<HookFn> {
        match stage {
            HookStage::Prepare => &mut self.prepare,
            HookStage::Before => &mut self.before,
            HookStage::Done => &mut self.done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dler_config::{BuildOptions, PackageManifest};

    fn ctx() -> BuildContext {
        let options: BuildOptions = serde_json::from_value(serde_json::json!({
            "name": "pkg", "rootDir": "/p", "outDir": "/p/dist"
        }))
        .unwrap();
        BuildContext::new(options, PackageManifest::default())
    }

    #[test]
    fn hooks_run_in_registration_order() {
        let hooks = BuildHooks::new()
            .with(HookStage::Before, |ctx| {
                ctx.warn("first");
                Ok(())
            })
            .with(HookStage::Before, |ctx| {
                ctx.warn("second");
                Ok(())
            });

        let mut ctx = ctx();
        hooks.call(HookStage::Before, &mut ctx).unwrap();
        hooks.call(HookStage::Done, &mut ctx).unwrap();
        let warnings: Vec<_> = ctx.warnings.iter().cloned().collect();
        assert_eq!(warnings, vec!["first", "second"]);
    }

    #[test]
    fn hook_error_stops_the_stage() {
        let hooks = BuildHooks::new()
            .with(HookStage::Prepare, |_| {
                Err(crate::Error::Hook {
                    stage: HookStage::Prepare,
                    message: "boom".into(),
                })
            })
            .with(HookStage::Prepare, |ctx| {
                ctx.warn("unreachable");
                Ok(())
            });

        let mut ctx = ctx();
        assert!(hooks.call(HookStage::Prepare, &mut ctx).is_err());
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn extend_appends_after_existing() {
        let mut hooks = BuildHooks::new().with(HookStage::Done, |_| Ok(()));
        hooks.extend(BuildHooks::new().with(HookStage::Done, |_| Ok(())));
        assert_eq!(hooks.len(HookStage::Done), 2);
        assert_eq!(hooks.len(HookStage::Prepare), 0);
    }
}
