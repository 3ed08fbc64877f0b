// Evaluation environment
// The flat name -> value namespace visible to expressions

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::evaluator::{Evaluator, EvaluatorError};
use crate::functions::{self, ExpressionGlobals};
use crate::signature::Arguments;
use crate::value::{Function, Value};

/// A provider of named environment members.
///
/// Implementors list the functions and constants they contribute. Names
/// starting with `_` are treated as private and skipped by
/// [`Environment::from_provider`].
pub trait Globals {
    fn members(&self) -> Vec<(String, Value)>;
}

/// Name -> value mapping used as the expression namespace
///
/// Every environment contains the coercion names (`bool`, `dict`, `float`,
/// `int`, `list`, `str`); entries supplied by the caller shadow them.
/// Cloning is cheap.
#[derive(Clone)]
pub struct Environment {
    names: Rc<IndexMap<String, Value>>,
}

impl Environment {
    /// Only the coercion names
    pub fn bare() -> Self {
        let names = functions::coerce::members().into_iter().collect();
        Environment {
            names: Rc::new(names),
        }
    }

    /// Coercions plus the given entries
    pub fn from_map(map: IndexMap<String, Value>) -> Self {
        let mut env = Self::bare();
        Rc::make_mut(&mut env.names).extend(map);
        env
    }

    /// Coercions plus the public members of a provider
    pub fn from_provider<P: Globals + ?Sized>(provider: &P) -> Self {
        let public = provider
            .members()
            .into_iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .collect();
        Self::from_map(public)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Rc::make_mut(&mut self.names).insert(name.into(), value.into());
        self
    }

    /// Add a native function under `name`
    pub fn with_function<F>(self, name: &str, call: F) -> Self
    where
        F: Fn(&mut Evaluator, Arguments) -> Result<Value, EvaluatorError> + 'static,
    {
        let function = Function::native(name, call);
        self.with(name, function)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for Environment {
    /// Coercions plus the built-in expression library
    fn default() -> Self {
        Self::from_provider(&ExpressionGlobals)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.names.keys().collect::<Vec<_>>())
            .finish()
    }
}
