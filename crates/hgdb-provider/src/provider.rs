//! The symbol provider capability set.
//!
//! A [`SymbolProvider`] answers the lookups an engine performs while a
//! session runs. Eight lookups are required. The rest carry documented
//! defaults, so a minimal provider only describes breakpoints, instances and
//! their variables.
//!
//! # Example
//!
//! ```rust
//! use hgdb_core::HgdbError;
//! use hgdb_core::types::{BreakpointSymbol, ContextVariable, GeneratorVariable, Variable};
//! use hgdb_provider::SymbolProvider;
//!
//! struct OneBreakpoint;
//!
//! impl SymbolProvider for OneBreakpoint {
//!     async fn get_breakpoint(&self, id: u64) -> Result<Option<BreakpointSymbol>, HgdbError> {
//!         Ok((id == 0).then(|| BreakpointSymbol::new(0, 0, "top.sv", 6)))
//!     }
//!     async fn get_breakpoints(&self, filename: &str, line_num: u32, column_num: u32)
//!         -> Result<Vec<BreakpointSymbol>, HgdbError> {
//!         let bp = BreakpointSymbol::new(0, 0, "top.sv", 6);
//!         Ok(bp.matches(filename, line_num, column_num).then_some(bp).into_iter().collect())
//!     }
//!     async fn get_instance_name(&self, id: u64) -> Result<Option<String>, HgdbError> {
//!         Ok((id == 0).then(|| "top".to_string()))
//!     }
//!     async fn get_instance_id_by_name(&self, name: &str) -> Result<Option<u64>, HgdbError> {
//!         Ok((name == "top").then_some(0))
//!     }
//!     async fn get_instance_id_by_bp(&self, id: u64) -> Result<Option<u64>, HgdbError> {
//!         Ok((id == 0).then_some(0))
//!     }
//!     async fn get_context_variables(&self, _: u64)
//!         -> Result<Vec<(ContextVariable, Variable)>, HgdbError> {
//!         Ok(Vec::new())
//!     }
//!     async fn get_generator_variables(&self, _: u64)
//!         -> Result<Vec<(GeneratorVariable, Variable)>, HgdbError> {
//!         Ok(Vec::new())
//!     }
//!     async fn get_instance_names(&self) -> Result<Vec<String>, HgdbError> {
//!         Ok(vec!["top".to_string()])
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use hgdb_core::error::HgdbError;
use hgdb_core::types::{BreakpointSymbol, ContextVariable, GeneratorVariable, Variable};

/// Constant integer values by name.
pub type StaticValues = BTreeMap<String, i64>;

/// Symbol lookups served to an engine.
///
/// Implementations are shared by every connection of a provider server, so
/// lookups take `&self` and must tolerate concurrent readers.
pub trait SymbolProvider: Send + Sync {
    /// Look up a breakpoint by id.
    fn get_breakpoint(
        &self,
        breakpoint_id: u64,
    ) -> impl Future<Output = Result<Option<BreakpointSymbol>, HgdbError>> + Send;

    /// Breakpoints at a location. A zero `column_num` matches the whole line.
    fn get_breakpoints(
        &self,
        filename: &str,
        line_num: u32,
        column_num: u32,
    ) -> impl Future<Output = Result<Vec<BreakpointSymbol>, HgdbError>> + Send;

    /// Hierarchical name of an instance.
    fn get_instance_name(
        &self,
        instance_id: u64,
    ) -> impl Future<Output = Result<Option<String>, HgdbError>> + Send;

    /// Instance id by hierarchical name.
    fn get_instance_id_by_name(
        &self,
        instance_name: &str,
    ) -> impl Future<Output = Result<Option<u64>, HgdbError>> + Send;

    /// Id of the instance owning a breakpoint.
    fn get_instance_id_by_bp(
        &self,
        breakpoint_id: u64,
    ) -> impl Future<Output = Result<Option<u64>, HgdbError>> + Send;

    /// Names visible at a breakpoint with the variables they bind.
    fn get_context_variables(
        &self,
        breakpoint_id: u64,
    ) -> impl Future<Output = Result<Vec<(ContextVariable, Variable)>, HgdbError>> + Send;

    /// Names in an instance's top-level scope with the variables they bind.
    fn get_generator_variables(
        &self,
        instance_id: u64,
    ) -> impl Future<Output = Result<Vec<(GeneratorVariable, Variable)>, HgdbError>> + Send;

    /// Every instance name.
    fn get_instance_names(&self) -> impl Future<Output = Result<Vec<String>, HgdbError>> + Send;

    /// Context names bound to integer constants at a breakpoint.
    ///
    /// Defaults to empty.
    fn get_context_static_values(
        &self,
        _breakpoint_id: u64,
    ) -> impl Future<Output = Result<StaticValues, HgdbError>> + Send {
        async { Ok(StaticValues::new()) }
    }

    /// Values stored under an annotation name, e.g. `clock` for clock
    /// signals with non-standard names.
    ///
    /// Defaults to empty.
    fn get_annotation_values(
        &self,
        _name: &str,
    ) -> impl Future<Output = Result<Vec<String>, HgdbError>> + Send {
        async { Ok(Vec::new()) }
    }

    /// Signal names of every array variable. Only needed when the engine's
    /// structural backend cannot enumerate arrays itself.
    ///
    /// Defaults to empty.
    fn get_all_array_names(&self) -> impl Future<Output = Result<Vec<String>, HgdbError>> + Send {
        async { Ok(Vec::new()) }
    }

    /// Signal behind a name in a breakpoint's context.
    ///
    /// Defaults to `None`, leaving resolution to the engine.
    fn resolve_scoped_name_breakpoint(
        &self,
        _name: &str,
        _breakpoint_id: u64,
    ) -> impl Future<Output = Result<Option<String>, HgdbError>> + Send {
        async { Ok(None) }
    }

    /// Signal behind a name in an instance's scope.
    ///
    /// Defaults to `None`, leaving resolution to the engine.
    fn resolve_scoped_name_instance(
        &self,
        _name: &str,
        _instance_id: u64,
    ) -> impl Future<Output = Result<Option<String>, HgdbError>> + Send {
        async { Ok(None) }
    }

    /// Breakpoint ids in execution order. Only needed when execution order
    /// differs from lexical order.
    ///
    /// Defaults to empty.
    fn execution_bp_orders(&self) -> impl Future<Output = Result<Vec<u64>, HgdbError>> + Send {
        async { Ok(Vec::new()) }
    }
}

impl<P: SymbolProvider> SymbolProvider for Arc<P> {
    fn get_breakpoint(
        &self,
        breakpoint_id: u64,
    ) -> impl Future<Output = Result<Option<BreakpointSymbol>, HgdbError>> + Send {
        (**self).get_breakpoint(breakpoint_id)
    }

    fn get_breakpoints(
        &self,
        filename: &str,
        line_num: u32,
        column_num: u32,
    ) -> impl Future<Output = Result<Vec<BreakpointSymbol>, HgdbError>> + Send {
        (**self).get_breakpoints(filename, line_num, column_num)
    }

    fn get_instance_name(
        &self,
        instance_id: u64,
    ) -> impl Future<Output = Result<Option<String>, HgdbError>> + Send {
        (**self).get_instance_name(instance_id)
    }

    fn get_instance_id_by_name(
        &self,
        instance_name: &str,
    ) -> impl Future<Output = Result<Option<u64>, HgdbError>> + Send {
        (**self).get_instance_id_by_name(instance_name)
    }

    fn get_instance_id_by_bp(
        &self,
        breakpoint_id: u64,
    ) -> impl Future<Output = Result<Option<u64>, HgdbError>> + Send {
        (**self).get_instance_id_by_bp(breakpoint_id)
    }

    fn get_context_variables(
        &self,
        breakpoint_id: u64,
    ) -> impl Future<Output = Result<Vec<(ContextVariable, Variable)>, HgdbError>> + Send {
        (**self).get_context_variables(breakpoint_id)
    }

    fn get_generator_variables(
        &self,
        instance_id: u64,
    ) -> impl Future<Output = Result<Vec<(GeneratorVariable, Variable)>, HgdbError>> + Send {
        (**self).get_generator_variables(instance_id)
    }

    fn get_instance_names(&self) -> impl Future<Output = Result<Vec<String>, HgdbError>> + Send {
        (**self).get_instance_names()
    }

    fn get_context_static_values(
        &self,
        breakpoint_id: u64,
    ) -> impl Future<Output = Result<StaticValues, HgdbError>> + Send {
        (**self).get_context_static_values(breakpoint_id)
    }

    fn get_annotation_values(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<String>, HgdbError>> + Send {
        (**self).get_annotation_values(name)
    }

    fn get_all_array_names(&self) -> impl Future<Output = Result<Vec<String>, HgdbError>> + Send {
        (**self).get_all_array_names()
    }

    fn resolve_scoped_name_breakpoint(
        &self,
        name: &str,
        breakpoint_id: u64,
    ) -> impl Future<Output = Result<Option<String>, HgdbError>> + Send {
        (**self).resolve_scoped_name_breakpoint(name, breakpoint_id)
    }

    fn resolve_scoped_name_instance(
        &self,
        name: &str,
        instance_id: u64,
    ) -> impl Future<Output = Result<Option<String>, HgdbError>> + Send {
        (**self).resolve_scoped_name_instance(name, instance_id)
    }

    fn execution_bp_orders(&self) -> impl Future<Output = Result<Vec<u64>, HgdbError>> + Send {
        (**self).execution_bp_orders()
    }
}

/// Context names bound to integer literals.
///
/// RTL signals are skipped, as are literals that do not parse as `i64`.
#[must_use]
pub fn static_values(bindings: &[(ContextVariable, Variable)]) -> StaticValues {
    bindings
        .iter()
        .filter(|(_, var)| !var.is_rtl)
        .filter_map(|(binding, var)| {
            var.value
                .trim()
                .parse::<i64>()
                .ok()
                .map(|value| (binding.name.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Minimal;

    impl SymbolProvider for Minimal {
        async fn get_breakpoint(&self, _: u64) -> Result<Option<BreakpointSymbol>, HgdbError> {
            Ok(None)
        }
        async fn get_breakpoints(
            &self,
            _: &str,
            _: u32,
            _: u32,
        ) -> Result<Vec<BreakpointSymbol>, HgdbError> {
            Ok(Vec::new())
        }
        async fn get_instance_name(&self, _: u64) -> Result<Option<String>, HgdbError> {
            Ok(None)
        }
        async fn get_instance_id_by_name(&self, _: &str) -> Result<Option<u64>, HgdbError> {
            Ok(None)
        }
        async fn get_instance_id_by_bp(&self, _: u64) -> Result<Option<u64>, HgdbError> {
            Ok(None)
        }
        async fn get_context_variables(
            &self,
            _: u64,
        ) -> Result<Vec<(ContextVariable, Variable)>, HgdbError> {
            Ok(Vec::new())
        }
        async fn get_generator_variables(
            &self,
            _: u64,
        ) -> Result<Vec<(GeneratorVariable, Variable)>, HgdbError> {
            Ok(Vec::new())
        }
        async fn get_instance_names(&self) -> Result<Vec<String>, HgdbError> {
            Ok(vec!["top".to_string()])
        }
    }

    #[tokio::test]
    async fn test_optional_lookups_default_to_empty() {
        let provider = Arc::new(Minimal);
        assert!(provider.get_context_static_values(0).await.unwrap().is_empty());
        assert!(provider.get_annotation_values("clock").await.unwrap().is_empty());
        assert!(provider.get_all_array_names().await.unwrap().is_empty());
        assert!(provider.resolve_scoped_name_breakpoint("a", 0).await.unwrap().is_none());
        assert!(provider.resolve_scoped_name_instance("a", 0).await.unwrap().is_none());
        assert!(provider.execution_bp_orders().await.unwrap().is_empty());
        assert_eq!(provider.get_instance_names().await.unwrap(), vec!["top".to_string()]);
    }

    #[test]
    fn test_static_values_keep_integer_literals() {
        let bindings = vec![
            (ContextVariable::new("width", 0, 0), Variable::new(0, "8", false)),
            (ContextVariable::new("sig", 0, 1), Variable::new(1, "top.sig", true)),
            (ContextVariable::new("mode", 0, 2), Variable::new(2, "fast", false)),
            (ContextVariable::new("neg", 0, 3), Variable::new(3, "-3", false)),
        ];
        let values = static_values(&bindings);
        assert_eq!(values.len(), 2);
        assert_eq!(values["width"], 8);
        assert_eq!(values["neg"], -3);
    }
}
