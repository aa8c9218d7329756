//! Providers backed by pre-built symbol tables.
//!
//! Both the SQLite store and the in-memory index can be served live, so a
//! table written ahead of time and a document lowered at startup look the
//! same to an engine.

use hgdb_core::error::HgdbError;
use hgdb_core::types::{BreakpointSymbol, ContextVariable, GeneratorVariable, Variable};
use hgdb_symbols::{DebugSymbolTable, SymbolIndex};

use crate::provider::{StaticValues, SymbolProvider, static_values};

impl SymbolProvider for DebugSymbolTable {
    async fn get_breakpoint(&self, breakpoint_id: u64) -> Result<Option<BreakpointSymbol>, HgdbError> {
        Ok(Self::get_breakpoint(self, breakpoint_id).await?)
    }

    async fn get_breakpoints(
        &self,
        filename: &str,
        line_num: u32,
        column_num: u32,
    ) -> Result<Vec<BreakpointSymbol>, HgdbError> {
        Ok(Self::get_breakpoints(self, filename, line_num, column_num).await?)
    }

    async fn get_instance_name(&self, instance_id: u64) -> Result<Option<String>, HgdbError> {
        Ok(Self::get_instance_name(self, instance_id).await?)
    }

    async fn get_instance_id_by_name(&self, instance_name: &str) -> Result<Option<u64>, HgdbError> {
        Ok(Self::get_instance_id_by_name(self, instance_name).await?)
    }

    async fn get_instance_id_by_bp(&self, breakpoint_id: u64) -> Result<Option<u64>, HgdbError> {
        Ok(Self::get_instance_id_by_bp(self, breakpoint_id).await?)
    }

    async fn get_context_variables(
        &self,
        breakpoint_id: u64,
    ) -> Result<Vec<(ContextVariable, Variable)>, HgdbError> {
        Ok(Self::get_context_variables(self, breakpoint_id).await?)
    }

    async fn get_generator_variables(
        &self,
        instance_id: u64,
    ) -> Result<Vec<(GeneratorVariable, Variable)>, HgdbError> {
        Ok(Self::get_generator_variables(self, instance_id).await?)
    }

    async fn get_instance_names(&self) -> Result<Vec<String>, HgdbError> {
        Ok(Self::get_instance_names(self).await?)
    }

    async fn get_context_static_values(&self, breakpoint_id: u64) -> Result<StaticValues, HgdbError> {
        let bindings = Self::get_context_variables(self, breakpoint_id).await?;
        Ok(static_values(&bindings))
    }

    async fn get_annotation_values(&self, name: &str) -> Result<Vec<String>, HgdbError> {
        Ok(Self::get_annotation_values(self, name).await?)
    }

    async fn get_all_array_names(&self) -> Result<Vec<String>, HgdbError> {
        Ok(Self::get_all_array_names(self).await?)
    }

    async fn resolve_scoped_name_breakpoint(
        &self,
        name: &str,
        breakpoint_id: u64,
    ) -> Result<Option<String>, HgdbError> {
        let bindings = Self::get_context_variables(self, breakpoint_id).await?;
        Ok(bindings
            .into_iter()
            .find(|(binding, _)| binding.name == name)
            .map(|(_, var)| var.value))
    }

    async fn resolve_scoped_name_instance(
        &self,
        name: &str,
        instance_id: u64,
    ) -> Result<Option<String>, HgdbError> {
        let bindings = Self::get_generator_variables(self, instance_id).await?;
        Ok(bindings
            .into_iter()
            .find(|(binding, _)| binding.name == name)
            .map(|(_, var)| var.value))
    }

    async fn execution_bp_orders(&self) -> Result<Vec<u64>, HgdbError> {
        Ok(Self::execution_bp_orders(self).await?)
    }
}

impl SymbolProvider for SymbolIndex {
    async fn get_breakpoint(&self, breakpoint_id: u64) -> Result<Option<BreakpointSymbol>, HgdbError> {
        Ok(Self::get_breakpoint(self, breakpoint_id).cloned())
    }

    async fn get_breakpoints(
        &self,
        filename: &str,
        line_num: u32,
        column_num: u32,
    ) -> Result<Vec<BreakpointSymbol>, HgdbError> {
        Ok(Self::get_breakpoints(self, filename, line_num, column_num))
    }

    async fn get_instance_name(&self, instance_id: u64) -> Result<Option<String>, HgdbError> {
        Ok(Self::get_instance_name(self, instance_id))
    }

    async fn get_instance_id_by_name(&self, instance_name: &str) -> Result<Option<u64>, HgdbError> {
        Ok(Self::get_instance_id_by_name(self, instance_name))
    }

    async fn get_instance_id_by_bp(&self, breakpoint_id: u64) -> Result<Option<u64>, HgdbError> {
        Ok(Self::get_instance_id_by_bp(self, breakpoint_id))
    }

    async fn get_context_variables(
        &self,
        breakpoint_id: u64,
    ) -> Result<Vec<(ContextVariable, Variable)>, HgdbError> {
        Ok(Self::get_context_variables(self, breakpoint_id))
    }

    async fn get_generator_variables(
        &self,
        instance_id: u64,
    ) -> Result<Vec<(GeneratorVariable, Variable)>, HgdbError> {
        Ok(Self::get_generator_variables(self, instance_id))
    }

    async fn get_instance_names(&self) -> Result<Vec<String>, HgdbError> {
        Ok(Self::get_instance_names(self))
    }

    async fn get_context_static_values(&self, breakpoint_id: u64) -> Result<StaticValues, HgdbError> {
        Ok(static_values(&Self::get_context_variables(self, breakpoint_id)))
    }

    async fn get_annotation_values(&self, name: &str) -> Result<Vec<String>, HgdbError> {
        Ok(Self::get_annotation_values(self, name))
    }

    async fn get_all_array_names(&self) -> Result<Vec<String>, HgdbError> {
        Ok(Self::get_all_array_names(self))
    }

    async fn resolve_scoped_name_breakpoint(
        &self,
        name: &str,
        breakpoint_id: u64,
    ) -> Result<Option<String>, HgdbError> {
        Ok(Self::resolve_scoped_name_breakpoint(self, name, breakpoint_id))
    }

    async fn resolve_scoped_name_instance(
        &self,
        name: &str,
        instance_id: u64,
    ) -> Result<Option<String>, HgdbError> {
        Ok(Self::resolve_scoped_name_instance(self, name, instance_id))
    }

    async fn execution_bp_orders(&self) -> Result<Vec<u64>, HgdbError> {
        Ok(Self::execution_bp_orders(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ProviderQuery, route_query};
    use hgdb_core::types::Instance;
    use hgdb_symbols::document::{DocVariable, ScopeContainer};
    use hgdb_symbols::SymbolDocument;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn index() -> SymbolIndex {
        let mut doc = SymbolDocument::new("test");
        let top = doc.add_module("top");
        top.set_filename("top.sv");
        top.add_decl(DocVariable::new("width", "4", false), 2);
        top.add_assign(DocVariable::new("a", "top.a", true), 3);
        SymbolIndex::from_document(&doc).unwrap()
    }

    #[tokio::test]
    async fn test_index_answers_queries() {
        let index = index();

        let reply = route_query(&index, &ProviderQuery::GetInstanceNames).await;
        assert_eq!(reply, json!({"result": ["top"]}));

        let reply = route_query(
            &index,
            &ProviderQuery::GetBreakpoints {
                filename: "top.sv".to_string(),
                line_num: 3,
                column_num: 0,
            },
        )
        .await;
        assert_eq!(reply["result"].as_array().unwrap().len(), 1);
        assert_eq!(reply["result"][0]["line_num"], 3);

        let bp_id = reply["result"][0]["id"].as_u64().unwrap();
        let reply = route_query(
            &index,
            &ProviderQuery::GetContextStaticValues {
                breakpoint_id: bp_id,
            },
        )
        .await;
        assert_eq!(reply, json!({"result": {"width": 4}}));

        let reply = route_query(
            &index,
            &ProviderQuery::ResolveScopedNameBreakpoint {
                name: "a".to_string(),
                breakpoint_id: bp_id,
            },
        )
        .await;
        assert_eq!(reply, json!({"result": "top.a"}));
    }

    #[tokio::test]
    async fn test_missing_answers_are_empty() {
        let index = index();
        let reply = route_query(&index, &ProviderQuery::GetBreakpoint { breakpoint_id: 99 }).await;
        assert_eq!(reply, json!({}));
        let reply = route_query(
            &index,
            &ProviderQuery::GetInstanceIdByName {
                instance_name: "nope".to_string(),
            },
        )
        .await;
        assert_eq!(reply, json!({}));
    }

    #[tokio::test]
    async fn test_table_answers_queries() {
        let table = DebugSymbolTable::in_memory().await.unwrap();
        table.store_instance(&Instance::new(0, "top")).await.unwrap();
        table
            .store_breakpoint(&BreakpointSymbol::new(0, 0, "top.sv", 6))
            .await
            .unwrap();
        table.store_variable(&Variable::new(0, "top.b", true)).await.unwrap();
        table
            .store_generator_variable(&GeneratorVariable::new("b", 0, 0))
            .await
            .unwrap();

        let reply = route_query(&table, &ProviderQuery::GetInstanceIdByBp { breakpoint_id: 0 }).await;
        assert_eq!(reply, json!({"result": 0}));

        let reply =
            route_query(&table, &ProviderQuery::GetGeneratorVariables { instance_id: 0 }).await;
        assert_eq!(reply["result"][0][0]["name"], "b");
        assert_eq!(reply["result"][0][1]["value"], "top.b");

        let resolved = SymbolProvider::resolve_scoped_name_instance(&table, "b", 0)
            .await
            .unwrap();
        assert_eq!(resolved.as_deref(), Some("top.b"));
    }
}
