use crate::context::{ExecutionContext, Inline};
use crate::Error;
use std::fmt;
use std::sync::Arc;

/// Which failures `catch` and `recover` hand to their closures.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CatchPolicy {
    /// Every failure, cancellations included.
    AllErrors,
    /// Every failure except those classified as cancellations.
    #[default]
    AllErrorsExceptCancellation,
}

impl CatchPolicy {
    pub(crate) fn skips(self, error: &Error) -> bool {
        self == CatchPolicy::AllErrorsExceptCancellation && error.is_cancelled()
    }
}

/// The contexts and error policy a chain runs with.
///
/// Every promise carries a `Config`, and every promise derived from it by a
/// combinator inherits that config. Transforms (`then`, `map`, `recover`, ...)
/// run on the *map* context; terminal steps (`done`, `catch`, `ensure`,
/// `finally`) run on the *finish* context.
#[derive(Clone)]
pub struct Config {
    map: Arc<dyn ExecutionContext>,
    finish: Arc<dyn ExecutionContext>,
    catch_policy: CatchPolicy,
}

impl Config {
    /// Uses `context` for both transforms and terminal steps.
    pub fn with_context<C: ExecutionContext + 'static>(self, context: C) -> Self {
        let context: Arc<dyn ExecutionContext> = Arc::new(context);
        Self {
            map: context.clone(),
            finish: context,
            ..self
        }
    }

    pub fn with_map_context<C: ExecutionContext + 'static>(self, context: C) -> Self {
        Self {
            map: Arc::new(context),
            ..self
        }
    }

    pub fn with_finish_context<C: ExecutionContext + 'static>(self, context: C) -> Self {
        Self {
            finish: Arc::new(context),
            ..self
        }
    }

    pub fn with_catch_policy(self, catch_policy: CatchPolicy) -> Self {
        Self {
            catch_policy,
            ..self
        }
    }

    pub fn map_context(&self) -> &Arc<dyn ExecutionContext> {
        &self.map
    }

    pub fn finish_context(&self) -> &Arc<dyn ExecutionContext> {
        &self.finish
    }

    pub fn catch_policy(&self) -> CatchPolicy {
        self.catch_policy
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            map: Arc::new(Inline),
            finish: Arc::new(Inline),
            catch_policy: CatchPolicy::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("catch_policy", &self.catch_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{CatchPolicy, Config};
    use crate::Error;

    #[test]
    fn test_default_policy_skips_only_cancellation() {
        let policy = Config::default().catch_policy();
        assert_eq!(policy, CatchPolicy::AllErrorsExceptCancellation);
        assert!(policy.skips(&Error::Cancelled));
        assert!(!policy.skips(&Error::msg("real failure")));
        assert!(!CatchPolicy::AllErrors.skips(&Error::Cancelled));
    }
}
