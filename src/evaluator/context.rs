//! Evaluation context and variable scoping
//!
//! A context carries the current focus, the root input, `$index`/`$total`
//! inside iterative functions, user variables, environment constants and
//! the engine configuration. Contexts are immutable: every change produces
//! a child, so expression arguments re-entering the evaluator can never
//! disturb their caller.

use crate::model::{Collection, ModelProvider, Resource};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Callback invoked by `trace(name)` with the traced values
pub type TraceHook = dyn Fn(&str, &Collection) + Send + Sync;

/// Engine knobs shared by every context of an evaluation
#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    /// Fail on unknown identifiers instead of yielding empty
    pub strict_mode: bool,
    /// Defer unknown function names to a runtime registry lookup
    pub allow_unknown_functions: bool,
    /// Safety bound for `repeat` / `descendants`
    pub max_repeat_iterations: usize,
    /// Static type of the input focus, for the typed pipeline
    pub root_type: Option<String>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            allow_unknown_functions: false,
            max_repeat_iterations: 5000,
            root_type: None,
        }
    }
}

/// Lexically scoped variable bindings; child scopes shadow their parents
#[derive(Debug, Clone, Default)]
pub struct VariableScope {
    variables: FxHashMap<String, Collection>,
    parent: Option<Arc<VariableScope>>,
}

impl VariableScope {
    /// Create an empty root scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a child scope with one extra binding
    pub fn bind(self: &Arc<Self>, name: String, value: Collection) -> VariableScope {
        let mut variables = FxHashMap::default();
        variables.insert(name, value);
        VariableScope {
            variables,
            parent: Some(Arc::clone(self)),
        }
    }

    /// Look a name up through the scope chain
    pub fn get(&self, name: &str) -> Option<&Collection> {
        match self.variables.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_deref().and_then(|p| p.get(name)),
        }
    }

    /// Whether the name is bound anywhere in the chain
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Runtime context for one evaluation
#[derive(Clone)]
pub struct EvaluationContext {
    /// Current focus (`$this`)
    pub input: Collection,
    /// Root input of the evaluation (`%context`)
    pub root: Collection,
    /// `$index` inside iterative functions
    pub index: Option<i64>,
    /// `$total` inside `aggregate`
    pub total: Option<Collection>,
    /// User and `defineVariable` bindings
    pub variables: Arc<VariableScope>,
    /// `%`-environment constants supplied by the caller
    pub environment: Arc<FxHashMap<String, Collection>>,
    /// Schema collaborator, when configured
    pub model: Option<Arc<dyn ModelProvider>>,
    /// `trace()` sink, when installed
    pub trace_hook: Option<Arc<TraceHook>>,
    /// Shared engine knobs
    pub config: Arc<EvaluationConfig>,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationContext {
    /// Create an empty context; the engine installs the input when an
    /// evaluation starts
    pub fn new() -> Self {
        Self {
            input: Collection::empty(),
            root: Collection::empty(),
            index: None,
            total: None,
            variables: Arc::new(VariableScope::new()),
            environment: Arc::new(FxHashMap::default()),
            model: None,
            trace_hook: None,
            config: Arc::new(EvaluationConfig::default()),
        }
    }

    /// Add an initial `$`-variable binding
    pub fn with_variable(mut self, name: impl Into<String>, value: Collection) -> Self {
        self.variables = Arc::new(self.variables.bind(name.into(), value));
        self
    }

    /// Add a `%`-environment constant
    pub fn with_env_constant(mut self, name: impl Into<String>, value: Collection) -> Self {
        let mut environment = (*self.environment).clone();
        environment.insert(name.into(), value);
        self.environment = Arc::new(environment);
        self
    }

    /// Install a model provider
    pub fn with_model_provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.model = Some(provider);
        self
    }

    /// Declare the static type of the input focus
    pub fn with_root_type(mut self, root_type: impl Into<String>) -> Self {
        let mut config = (*self.config).clone();
        config.root_type = Some(root_type.into());
        self.config = Arc::new(config);
        self
    }

    /// Fail on unknown identifiers and functions
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        let mut config = (*self.config).clone();
        config.strict_mode = strict;
        self.config = Arc::new(config);
        self
    }

    /// Defer unknown function names to runtime lookup
    pub fn with_allow_unknown_functions(mut self, allow: bool) -> Self {
        let mut config = (*self.config).clone();
        config.allow_unknown_functions = allow;
        self.config = Arc::new(config);
        self
    }

    /// Install a `trace()` hook
    pub fn with_trace_hook(mut self, hook: Arc<TraceHook>) -> Self {
        self.trace_hook = Some(hook);
        self
    }

    /// Override the `repeat` iteration bound
    pub fn with_max_repeat_iterations(mut self, limit: usize) -> Self {
        let mut config = (*self.config).clone();
        config.max_repeat_iterations = limit;
        self.config = Arc::new(config);
        self
    }

    /// Child context focused on a new input
    pub fn with_input(&self, input: Collection) -> Self {
        Self {
            input,
            ..self.clone()
        }
    }

    /// Child context for one iteration step: new focus plus `$index`
    pub fn with_iteration(&self, input: Collection, index: i64) -> Self {
        Self {
            input,
            index: Some(index),
            ..self.clone()
        }
    }

    /// Child context carrying an aggregate `$total`
    pub fn with_total(&self, total: Collection) -> Self {
        Self {
            total: Some(total),
            ..self.clone()
        }
    }

    /// Child context with an additional variable binding
    pub fn bind_variable(&self, name: String, value: Collection) -> Self {
        Self {
            variables: Arc::new(self.variables.bind(name, value)),
            ..self.clone()
        }
    }

    /// The first root item, when it is a resource (used by `resolve()` and
    /// `%resource`)
    pub fn root_resource(&self) -> Option<Resource> {
        self.root.iter().find_map(|v| match v {
            crate::model::Value::Resource(r) => Some(r.clone()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn test_scope_shadowing() {
        let root = Arc::new(VariableScope::new());
        let outer = Arc::new(root.bind("x".into(), Collection::singleton(Value::Integer(1))));
        let inner = outer.bind("x".into(), Collection::singleton(Value::Integer(2)));

        assert_eq!(
            inner.get("x").and_then(Collection::as_singleton),
            Some(&Value::Integer(2))
        );
        assert_eq!(
            outer.get("x").and_then(Collection::as_singleton),
            Some(&Value::Integer(1))
        );
    }

    #[test]
    fn test_child_contexts_do_not_leak() {
        let ctx = EvaluationContext::new();
        let child = ctx.bind_variable("v".into(), Collection::singleton(Value::Boolean(true)));
        assert!(child.variables.contains("v"));
        assert!(!ctx.variables.contains("v"));
    }
}
