//! In-memory symbol index lowered from a [`SymbolDocument`].
//!
//! The index flattens the module hierarchy into the same entities the
//! structured store holds, so either can back a provider or be persisted.

use std::collections::{BTreeMap, HashMap, HashSet};

use hgdb_core::types::{
    Annotation, BreakpointSymbol, ContextVariable, GeneratorVariable, Instance, Variable,
};

use crate::document::{DocVariable, ScopeNode, SymbolDocument, VarRef};
use crate::error::{Result, SymbolTableError};
use crate::table::DebugSymbolTable;

/// Flat symbol tables built from a hierarchical document.
#[derive(Debug, Clone, Default)]
pub struct SymbolIndex {
    instances: Vec<Instance>,
    variables: Vec<Variable>,
    breakpoints: Vec<BreakpointSymbol>,
    context: BTreeMap<u64, Vec<ContextVariable>>,
    generator: BTreeMap<u64, Vec<GeneratorVariable>>,
    annotations: Vec<Annotation>,
    execution_order: Vec<u64>,
}

impl SymbolIndex {
    /// Lower a document.
    ///
    /// Every top module is instantiated under its own name and children get
    /// `parent.child` paths. One breakpoint is created for each leaf that
    /// carries a line number.
    pub fn from_document(doc: &SymbolDocument) -> Result<Self> {
        doc.validate()?;
        let tops = doc.top_names();
        if tops.is_empty() && !doc.modules().is_empty() {
            return Err(SymbolTableError::document(
                "every module is instantiated: the hierarchy has a cycle",
            ));
        }

        let mut builder = Builder {
            doc,
            index: Self::default(),
            variable_ids: HashMap::new(),
            stack: Vec::new(),
        };
        for top in &tops {
            builder.instantiate(top, top.clone())?;
        }

        let index = builder.index;
        tracing::debug!(
            instances = index.instances.len(),
            breakpoints = index.breakpoints.len(),
            variables = index.variables.len(),
            "symbol index built"
        );
        Ok(index)
    }

    /// Attach an annotation, e.g. a clock name.
    #[must_use]
    pub fn with_annotation(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.push(Annotation::new(name, value));
        self
    }

    /// All instances, by id.
    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// All variables, by id.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// All breakpoints, by id.
    #[must_use]
    pub fn breakpoints(&self) -> &[BreakpointSymbol] {
        &self.breakpoints
    }

    /// Look up a breakpoint.
    #[must_use]
    pub fn get_breakpoint(&self, id: u64) -> Option<&BreakpointSymbol> {
        usize::try_from(id).ok().and_then(|i| self.breakpoints.get(i))
    }

    /// Breakpoints at a location; a zero column matches the whole line.
    #[must_use]
    pub fn get_breakpoints(&self, filename: &str, line_num: u32, column_num: u32) -> Vec<BreakpointSymbol> {
        self.breakpoints
            .iter()
            .filter(|bp| bp.matches(filename, line_num, column_num))
            .cloned()
            .collect()
    }

    /// Name of an instance.
    #[must_use]
    pub fn get_instance_name(&self, instance_id: u64) -> Option<String> {
        usize::try_from(instance_id)
            .ok()
            .and_then(|i| self.instances.get(i))
            .map(|inst| inst.name.clone())
    }

    /// Id of an instance by hierarchical name.
    #[must_use]
    pub fn get_instance_id_by_name(&self, name: &str) -> Option<u64> {
        self.instances.iter().find(|i| i.name == name).map(|i| i.id)
    }

    /// Id of the instance owning a breakpoint.
    #[must_use]
    pub fn get_instance_id_by_bp(&self, breakpoint_id: u64) -> Option<u64> {
        self.get_breakpoint(breakpoint_id).map(|bp| bp.instance_id)
    }

    /// Context bindings of a breakpoint with their variables.
    #[must_use]
    pub fn get_context_variables(&self, breakpoint_id: u64) -> Vec<(ContextVariable, Variable)> {
        self.context
            .get(&breakpoint_id)
            .into_iter()
            .flatten()
            .filter_map(|c| self.variable(c.variable_id).map(|v| (c.clone(), v.clone())))
            .collect()
    }

    /// Generator bindings of an instance with their variables.
    #[must_use]
    pub fn get_generator_variables(&self, instance_id: u64) -> Vec<(GeneratorVariable, Variable)> {
        self.generator
            .get(&instance_id)
            .into_iter()
            .flatten()
            .filter_map(|g| self.variable(g.variable_id).map(|v| (g.clone(), v.clone())))
            .collect()
    }

    /// All instance names, by id.
    #[must_use]
    pub fn get_instance_names(&self) -> Vec<String> {
        self.instances.iter().map(|i| i.name.clone()).collect()
    }

    /// Values stored under an annotation name.
    #[must_use]
    pub fn get_annotation_values(&self, name: &str) -> Vec<String> {
        self.annotations
            .iter()
            .filter(|a| a.name == name)
            .map(|a| a.value.clone())
            .collect()
    }

    /// Signal names of array variables.
    #[must_use]
    pub fn get_all_array_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .variables
            .iter()
            .filter(|v| v.is_rtl && v.indices.is_some())
            .map(|v| v.value.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Signal behind a name in a breakpoint's context.
    #[must_use]
    pub fn resolve_scoped_name_breakpoint(&self, name: &str, breakpoint_id: u64) -> Option<String> {
        self.get_context_variables(breakpoint_id)
            .into_iter()
            .find(|(c, _)| c.name == name)
            .map(|(_, v)| v.value)
    }

    /// Signal behind a name in an instance's scope.
    #[must_use]
    pub fn resolve_scoped_name_instance(&self, name: &str, instance_id: u64) -> Option<String> {
        self.get_generator_variables(instance_id)
            .into_iter()
            .find(|(g, _)| g.name == name)
            .map(|(_, v)| v.value)
    }

    /// Breakpoint ids in lexical order.
    #[must_use]
    pub fn execution_bp_orders(&self) -> Vec<u64> {
        self.execution_order.clone()
    }

    fn variable(&self, id: u64) -> Option<&Variable> {
        usize::try_from(id).ok().and_then(|i| self.variables.get(i))
    }

    /// Persist the index in one transaction. Nothing is written on failure.
    pub async fn write_to(&self, table: &DebugSymbolTable) -> Result<()> {
        table.begin_transaction().await?;
        match self.store_all(table).await {
            Ok(()) => table.end_transaction().await,
            Err(e) => {
                tracing::warn!(error = %e, location = table.location(), "rolling back symbol index write");
                table.rollback_transaction().await?;
                Err(e)
            }
        }
    }

    async fn store_all(&self, table: &DebugSymbolTable) -> Result<()> {
        for instance in &self.instances {
            table.store_instance(instance).await?;
        }
        for variable in &self.variables {
            table.store_variable(variable).await?;
        }
        for breakpoint in &self.breakpoints {
            table.store_breakpoint(breakpoint).await?;
        }
        for binding in self.context.values().flatten() {
            table.store_context_variable(binding).await?;
        }
        for binding in self.generator.values().flatten() {
            table.store_generator_variable(binding).await?;
        }
        for annotation in &self.annotations {
            table.store_annotation(annotation).await?;
        }
        if !self.execution_order.is_empty() {
            table.store_scope(0, &self.execution_order).await?;
        }
        Ok(())
    }
}

struct Builder<'a> {
    doc: &'a SymbolDocument,
    index: SymbolIndex,
    variable_ids: HashMap<(String, bool), u64>,
    stack: Vec<&'a str>,
}

/// Lexical state while walking one module's scopes.
struct Walk<'w> {
    instance_id: u64,
    conditions: Vec<&'w str>,
}

impl<'a> Builder<'a> {
    fn instantiate(&mut self, module_name: &str, path: String) -> Result<()> {
        let doc = self.doc;
        let module = doc
            .module(module_name)
            .ok_or_else(|| SymbolTableError::document(format!("unknown module '{module_name}'")))?;
        if self.stack.contains(&module.name.as_str()) {
            return Err(SymbolTableError::document(format!(
                "instantiation cycle through module '{}'",
                module.name
            )));
        }
        self.stack.push(&module.name);

        let instance_id = self.index.instances.len() as u64;
        self.index.instances.push(Instance::new(instance_id, path.clone()));

        for slot in &module.variables {
            let var = self.resolve(slot)?;
            let variable_id = self.intern(var);
            self.index
                .generator
                .entry(instance_id)
                .or_default()
                .push(GeneratorVariable::new(var.name.clone(), instance_id, variable_id));
        }

        let mut walk = Walk {
            instance_id,
            conditions: Vec::new(),
        };
        self.walk(&module.scopes, &module.location.filename, &mut walk, &[])?;

        for binding in &module.instances {
            self.instantiate(&binding.module, format!("{path}.{}", binding.name))?;
        }
        self.stack.pop();
        Ok(())
    }

    /// `visible` holds bindings from enclosing levels, nearest last.
    fn walk<'w>(
        &mut self,
        nodes: &'a [ScopeNode],
        filename: &str,
        walk: &mut Walk<'w>,
        visible: &[(String, u64)],
    ) -> Result<()>
    where
        'a: 'w,
    {
        let mut scope: Vec<(String, u64)> = visible.to_vec();
        for node in nodes {
            let location = node.location();
            let node_file = if location.filename.is_empty() {
                filename
            } else {
                location.filename.as_str()
            };
            let condition = node.condition();
            if !condition.is_empty() {
                walk.conditions.push(condition);
            }

            match node {
                ScopeNode::Block(block) if !block.scopes.is_empty() => {
                    self.walk(&block.scopes, node_file, walk, &scope)?;
                }
                _ => {
                    if let Some(stmt) = node.statement() {
                        let var = self.resolve(&stmt.variable)?;
                        let variable_id = self.intern(var);
                        scope.push((var.name.clone(), variable_id));
                    }
                    if let Some(line) = location.line {
                        self.add_breakpoint(walk, node_file, line, location.column, &scope);
                    }
                }
            }

            if !condition.is_empty() {
                walk.conditions.pop();
            }
        }
        Ok(())
    }

    fn add_breakpoint(
        &mut self,
        walk: &Walk<'_>,
        filename: &str,
        line: u32,
        column: u32,
        scope: &[(String, u64)],
    ) {
        let id = self.index.breakpoints.len() as u64;
        let condition = match walk.conditions.as_slice() {
            [] => String::new(),
            [single] => (*single).to_string(),
            many => many
                .iter()
                .map(|c| format!("({c})"))
                .collect::<Vec<_>>()
                .join(" && "),
        };
        self.index.breakpoints.push(
            BreakpointSymbol::new(id, walk.instance_id, filename, line)
                .with_column(column)
                .with_condition(condition),
        );
        self.index.execution_order.push(id);

        // Nearest binding of a name shadows outer ones.
        let mut seen = HashSet::new();
        let mut bindings: Vec<ContextVariable> = scope
            .iter()
            .rev()
            .filter(|(name, _)| seen.insert(name.as_str()))
            .map(|(name, variable_id)| ContextVariable::new(name.clone(), id, *variable_id))
            .collect();
        bindings.reverse();
        if !bindings.is_empty() {
            self.index.context.insert(id, bindings);
        }
    }

    fn resolve(&self, slot: &'a VarRef) -> Result<&'a DocVariable> {
        self.doc
            .resolve(slot)
            .ok_or_else(|| SymbolTableError::document("reference to a missing pooled variable"))
    }

    fn intern(&mut self, var: &DocVariable) -> u64 {
        let key = (var.value.clone(), var.rtl);
        if let Some(&id) = self.variable_ids.get(&key) {
            return id;
        }
        let id = self.index.variables.len() as u64;
        self.index
            .variables
            .push(Variable::new(id, var.value.clone(), var.rtl));
        self.variable_ids.insert(key, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocVariable, ScopeContainer};
    use pretty_assertions::assert_eq;

    fn design() -> SymbolDocument {
        let mut doc = SymbolDocument::new("test");
        let top = doc.add_module("top");
        top.set_filename("top.sv");
        top.add_variable(DocVariable::new("clk", "clk", true));
        top.add_decl(DocVariable::new("a", "a", true), 2);
        let block = top.create_scope();
        block.set_line(3).set_condition("en");
        block.add_assign(DocVariable::new("b", "b_0", true), 4);
        let inner = block.create_scope();
        inner.set_condition("mode == 1");
        inner.add_assign(DocVariable::new("b", "b_1", true), 5).set_column(9);
        top.add_instance("u0", "child");

        let child = doc.add_module("child");
        child.set_filename("child.sv");
        child.add_variable(DocVariable::new("WIDTH", "8", false));
        child.add_assign(DocVariable::new("x", "x", true), 10);
        doc
    }

    #[test]
    fn test_instances_follow_hierarchy() {
        let index = SymbolIndex::from_document(&design()).unwrap();
        assert_eq!(index.get_instance_names(), vec!["top".to_string(), "top.u0".to_string()]);
        assert_eq!(index.get_instance_id_by_name("top.u0"), Some(1));
        let generator = index.get_generator_variables(1);
        assert_eq!(generator[0].0.name, "WIDTH");
        assert_eq!(generator[0].1.value, "8");
        assert_eq!(index.resolve_scoped_name_instance("clk", 0).as_deref(), Some("clk"));
    }

    #[test]
    fn test_breakpoints_inherit_location_and_conditions() {
        let index = SymbolIndex::from_document(&design()).unwrap();
        let bps = index.breakpoints();
        assert_eq!(bps.len(), 4);

        assert_eq!(bps[0].filename, "top.sv");
        assert_eq!(bps[0].line_num, 2);
        assert_eq!(bps[0].condition, "");

        assert_eq!(bps[1].line_num, 4);
        assert_eq!(bps[1].condition, "en");

        assert_eq!(bps[2].line_num, 5);
        assert_eq!(bps[2].column_num, 9);
        assert_eq!(bps[2].condition, "(en) && (mode == 1)");

        assert_eq!(bps[3].filename, "child.sv");
        assert_eq!(bps[3].instance_id, 1);

        assert_eq!(index.get_breakpoints("top.sv", 5, 0).len(), 1);
        assert!(index.get_breakpoints("top.sv", 5, 3).is_empty());
        assert_eq!(index.execution_bp_orders(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_context_shadowing() {
        let index = SymbolIndex::from_document(&design()).unwrap();

        let names = |bp: u64| -> Vec<(String, String)> {
            index
                .get_context_variables(bp)
                .into_iter()
                .map(|(c, v)| (c.name, v.value))
                .collect()
        };
        assert_eq!(names(0), vec![("a".to_string(), "a".to_string())]);
        assert_eq!(
            names(1),
            vec![("a".to_string(), "a".to_string()), ("b".to_string(), "b_0".to_string())]
        );
        // The inner assignment shadows the outer `b`.
        assert_eq!(
            names(2),
            vec![("a".to_string(), "a".to_string()), ("b".to_string(), "b_1".to_string())]
        );
        assert_eq!(index.resolve_scoped_name_breakpoint("b", 2).as_deref(), Some("b_1"));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut doc = SymbolDocument::new("test");
        doc.add_module("top").add_instance("a", "a");
        doc.add_module("a").add_instance("b", "b");
        doc.add_module("b").add_instance("a", "a");
        let err = SymbolIndex::from_document(&doc).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[tokio::test]
    async fn test_write_to_table() {
        let index = SymbolIndex::from_document(&design())
            .unwrap()
            .with_annotation("clock", "clk");
        let table = DebugSymbolTable::in_memory().await.unwrap();
        index.write_to(&table).await.unwrap();

        assert_eq!(table.get_instance_names().await.unwrap(), index.get_instance_names());
        let stored = table.get_breakpoints("top.sv", 5, 9).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].condition, "(en) && (mode == 1)");
        assert_eq!(table.execution_bp_orders().await.unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(table.get_context_variables(2).await.unwrap().len(), 2);
        assert_eq!(table.get_annotation_values("clock").await.unwrap(), vec!["clk".to_string()]);
    }

    #[tokio::test]
    async fn test_write_to_rolls_back_on_conflict() {
        let index = SymbolIndex::from_document(&design()).unwrap();
        let table = DebugSymbolTable::in_memory().await.unwrap();
        table.store_variable(&Variable::new(3, "taken", true)).await.unwrap();

        let err = index.write_to(&table).await.unwrap_err();
        assert!(err.is_integrity());
        assert!(table.get_instance_names().await.unwrap().is_empty());
        assert!(!table.in_transaction());
    }
}
