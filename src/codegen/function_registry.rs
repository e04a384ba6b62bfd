//! Deduplicating store of shader helper functions.
//!
//! Nodes request helpers by name with [`FunctionRegistry::provide_function`];
//! the first request for a name wins and later ones are ignored, so several
//! nodes sharing a helper emit it once. Builders run when the pass finishes.
//! A builder may request further helpers; those are generated immediately so
//! they precede the helper that needs them.

use std::collections::HashMap;

use log::trace;

use super::code_builder::ShaderStringBuilder;
use super::error::{GenError, GenResult};

/// Writes one helper into its own builder. Receives the registry so it can
/// request the helpers it depends on.
pub type FunctionBuilder =
    Box<dyn FnOnce(&mut ShaderStringBuilder, &mut FunctionRegistry) -> GenResult<()> + Send>;

/// A materialized helper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedFunction {
    pub name: String,
    pub text: String,
}

enum EntryState {
    Pending(FunctionBuilder),
    InProgress,
    Completed(String),
}

struct Entry {
    name: String,
    state: EntryState,
}

#[derive(Default)]
pub struct FunctionRegistry {
    /// First-registration order.
    entries: Vec<Entry>,
    index_by_name: HashMap<String, usize>,
    /// Completion order, which is the emission order.
    completed: Vec<usize>,
    depth: usize,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `builder` for `name` unless `name` is already known.
    ///
    /// Fails only when `name` is currently being generated, i.e. a helper
    /// depends on itself.
    pub fn provide_function<F>(&mut self, name: impl Into<String>, builder: F) -> GenResult<()>
    where
        F: FnOnce(&mut ShaderStringBuilder, &mut FunctionRegistry) -> GenResult<()> + Send + 'static,
    {
        let name = name.into();
        if let Some(&idx) = self.index_by_name.get(&name) {
            let state = &self.entries[idx].state;
            if matches!(state, EntryState::InProgress) {
                return Err(GenError::CyclicFunctionDependency { name });
            }
            if matches!(state, EntryState::Pending(_)) && self.depth > 0 {
                return self.materialize(idx);
            }
            trace!("function {name} already provided");
            return Ok(());
        }

        let idx = self.entries.len();
        self.entries.push(Entry {
            name: name.clone(),
            state: EntryState::Pending(Box::new(builder)),
        });
        self.index_by_name.insert(name, idx);

        if self.depth > 0 {
            self.materialize(idx)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn materialize(&mut self, idx: usize) -> GenResult<()> {
        let state = std::mem::replace(&mut self.entries[idx].state, EntryState::InProgress);
        let builder = match state {
            EntryState::Pending(builder) => builder,
            other => {
                self.entries[idx].state = other;
                return Ok(());
            }
        };

        trace!("generating function {}", self.entries[idx].name);
        let mut sb = ShaderStringBuilder::new();
        self.depth += 1;
        let result = builder(&mut sb, self);
        self.depth -= 1;
        result?;

        self.entries[idx].state = EntryState::Completed(sb.build());
        self.completed.push(idx);
        Ok(())
    }

    /// Run every pending builder and return the helpers in emission order.
    pub fn finish_functions(mut self) -> GenResult<Vec<GeneratedFunction>> {
        let mut idx = 0;
        while idx < self.entries.len() {
            self.materialize(idx)?;
            idx += 1;
        }

        let mut out = Vec::with_capacity(self.completed.len());
        for idx in self.completed {
            let entry = std::mem::replace(&mut self.entries[idx].state, EntryState::InProgress);
            if let EntryState::Completed(text) = entry {
                out.push(GeneratedFunction {
                    name: std::mem::take(&mut self.entries[idx].name),
                    text,
                });
            }
        }
        Ok(out)
    }

    /// Run every pending builder and concatenate the generated helpers.
    pub fn finish(self) -> GenResult<String> {
        Ok(self
            .finish_functions()?
            .into_iter()
            .map(|f| f.text)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registration_wins() {
        let mut registry = FunctionRegistry::new();
        registry
            .provide_function("Helper", |sb, _| {
                sb.append_line("first");
                Ok(())
            })
            .unwrap();
        registry
            .provide_function("Helper", |sb, _| {
                sb.append_line("second");
                Ok(())
            })
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.finish().unwrap(), "first\n");
    }

    #[test]
    fn emits_in_first_registration_order() {
        let mut registry = FunctionRegistry::new();
        for name in ["B", "A", "C", "A"] {
            registry
                .provide_function(name, move |sb, _| {
                    sb.append_line(name);
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(registry.finish().unwrap(), "B\nA\nC\n");
    }

    #[test]
    fn nested_dependencies_precede_dependents() {
        let mut registry = FunctionRegistry::new();
        registry
            .provide_function("Outer", |sb, registry| {
                registry.provide_function("Inner", |sb, _| {
                    sb.append_line("inner");
                    Ok(())
                })?;
                sb.append_line("outer");
                Ok(())
            })
            .unwrap();
        registry
            .provide_function("Later", |sb, registry| {
                // Already generated for "Outer"; this builder never runs.
                registry.provide_function("Inner", |sb, _| {
                    sb.append_line("inner again");
                    Ok(())
                })?;
                sb.append_line("later");
                Ok(())
            })
            .unwrap();

        assert_eq!(registry.finish().unwrap(), "inner\nouter\nlater\n");
    }

    #[test]
    fn finished_functions_keep_their_names() {
        let mut registry = FunctionRegistry::new();
        registry
            .provide_function("Outer", |sb, registry| {
                registry.provide_function("Inner", |sb, _| {
                    sb.append_line("inner");
                    Ok(())
                })?;
                sb.append_line("outer");
                Ok(())
            })
            .unwrap();

        let names: Vec<String> = registry
            .finish_functions()
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["Inner", "Outer"]);
    }

    #[test]
    fn pending_dependency_is_pulled_forward() {
        let mut registry = FunctionRegistry::new();
        registry
            .provide_function("User", |sb, registry| {
                registry.provide_function("Shared", |sb, _| {
                    sb.append_line("never used");
                    Ok(())
                })?;
                sb.append_line("user");
                Ok(())
            })
            .unwrap();
        registry
            .provide_function("Shared", |sb, _| {
                sb.append_line("shared");
                Ok(())
            })
            .unwrap();

        // "Shared" is still pending when "User" asks for it, so its first
        // builder runs first.
        assert_eq!(registry.finish().unwrap(), "shared\nuser\n");
    }

    #[test]
    fn self_dependency_is_reported_as_cycle() {
        let mut registry = FunctionRegistry::new();
        registry
            .provide_function("Loop", |sb, registry| {
                sb.append_line("loop");
                registry.provide_function("Loop", |_, _| Ok(()))
            })
            .unwrap();

        assert_eq!(
            registry.finish().unwrap_err(),
            GenError::CyclicFunctionDependency {
                name: "Loop".to_string()
            }
        );
    }

    #[test]
    fn mutual_dependency_is_reported_as_cycle() {
        fn provide_a(registry: &mut FunctionRegistry) -> GenResult<()> {
            registry.provide_function("A", |_, registry| provide_b(registry))
        }
        fn provide_b(registry: &mut FunctionRegistry) -> GenResult<()> {
            registry.provide_function("B", |_, registry| provide_a(registry))
        }

        let mut registry = FunctionRegistry::new();
        provide_a(&mut registry).unwrap();
        let err = registry.finish().unwrap_err();
        assert_eq!(
            err,
            GenError::CyclicFunctionDependency {
                name: "A".to_string()
            }
        );
    }
}
