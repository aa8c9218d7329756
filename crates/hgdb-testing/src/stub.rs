//! A provider with fixed answers.

use std::sync::atomic::{AtomicUsize, Ordering};

use hgdb_core::error::HgdbError;
use hgdb_core::types::{BreakpointSymbol, ContextVariable, GeneratorVariable, Variable};
use hgdb_provider::{StaticValues, SymbolProvider, static_values};

/// Answers lookups about a single breakpoint in a single instance.
///
/// - breakpoint `0` at `waveform1.sv:6` in instance `0` named `child`
/// - context `a` (signal `a`) and `WIDTH` (constant `16`)
/// - generator `clk` (signal `clk`)
/// - annotation `clock = top.clk`
///
/// Every other id or name is unknown. Each lookup is counted.
#[derive(Debug, Default)]
pub struct StubProvider {
    queries: AtomicUsize,
}

impl StubProvider {
    /// File of the only breakpoint.
    pub const FILENAME: &'static str = "waveform1.sv";
    /// Line of the only breakpoint.
    pub const LINE: u32 = 6;
    /// Name of the only instance.
    pub const INSTANCE: &'static str = "child";

    /// Create a stub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lookups answered so far.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }

    fn breakpoint() -> BreakpointSymbol {
        BreakpointSymbol::new(0, 0, Self::FILENAME, Self::LINE)
    }

    fn context() -> Vec<(ContextVariable, Variable)> {
        vec![
            (ContextVariable::new("a", 0, 0), Variable::new(0, "a", true)),
            (ContextVariable::new("WIDTH", 0, 1), Variable::new(1, "16", false)),
        ]
    }
}

impl SymbolProvider for StubProvider {
    async fn get_breakpoint(&self, breakpoint_id: u64) -> Result<Option<BreakpointSymbol>, HgdbError> {
        self.count();
        Ok((breakpoint_id == 0).then(Self::breakpoint))
    }

    async fn get_breakpoints(
        &self,
        filename: &str,
        line_num: u32,
        column_num: u32,
    ) -> Result<Vec<BreakpointSymbol>, HgdbError> {
        self.count();
        let bp = Self::breakpoint();
        Ok(if bp.matches(filename, line_num, column_num) {
            vec![bp]
        } else {
            Vec::new()
        })
    }

    async fn get_instance_name(&self, instance_id: u64) -> Result<Option<String>, HgdbError> {
        self.count();
        Ok((instance_id == 0).then(|| Self::INSTANCE.to_string()))
    }

    async fn get_instance_id_by_name(&self, instance_name: &str) -> Result<Option<u64>, HgdbError> {
        self.count();
        Ok((instance_name == Self::INSTANCE).then_some(0))
    }

    async fn get_instance_id_by_bp(&self, breakpoint_id: u64) -> Result<Option<u64>, HgdbError> {
        self.count();
        Ok((breakpoint_id == 0).then_some(0))
    }

    async fn get_context_variables(
        &self,
        breakpoint_id: u64,
    ) -> Result<Vec<(ContextVariable, Variable)>, HgdbError> {
        self.count();
        Ok(if breakpoint_id == 0 { Self::context() } else { Vec::new() })
    }

    async fn get_generator_variables(
        &self,
        instance_id: u64,
    ) -> Result<Vec<(GeneratorVariable, Variable)>, HgdbError> {
        self.count();
        Ok(if instance_id == 0 {
            vec![(GeneratorVariable::new("clk", 0, 2), Variable::new(2, "clk", true))]
        } else {
            Vec::new()
        })
    }

    async fn get_instance_names(&self) -> Result<Vec<String>, HgdbError> {
        self.count();
        Ok(vec![Self::INSTANCE.to_string()])
    }

    async fn get_context_static_values(&self, breakpoint_id: u64) -> Result<StaticValues, HgdbError> {
        let context = self.get_context_variables(breakpoint_id).await?;
        Ok(static_values(&context))
    }

    async fn get_annotation_values(&self, name: &str) -> Result<Vec<String>, HgdbError> {
        self.count();
        Ok(if name == "clock" {
            vec!["top.clk".to_string()]
        } else {
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hgdb_provider::{ProviderQuery, route_query};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_fixed_answers() {
        let stub = StubProvider::new();

        let bps = stub.get_breakpoints("waveform1.sv", 6, 0).await.unwrap();
        assert_eq!(bps.len(), 1);
        assert!(stub.get_breakpoints("waveform1.sv", 7, 0).await.unwrap().is_empty());
        assert_eq!(stub.get_instance_id_by_name("child").await.unwrap(), Some(0));
        assert_eq!(stub.get_breakpoint(1).await.unwrap(), None);
        assert_eq!(stub.query_count(), 4);
    }

    #[tokio::test]
    async fn test_static_values_and_defaults() {
        let stub = StubProvider::new();

        let reply = route_query(&stub, &ProviderQuery::GetContextStaticValues { breakpoint_id: 0 }).await;
        assert_eq!(reply, json!({"result": {"WIDTH": 16}}));

        let reply = route_query(&stub, &ProviderQuery::GetAllArrayNames).await;
        assert_eq!(reply, json!({"result": []}));

        let reply = route_query(
            &stub,
            &ProviderQuery::ResolveScopedNameInstance {
                name: "clk".to_string(),
                instance_id: 0,
            },
        )
        .await;
        assert_eq!(reply, json!({}));
    }
}
