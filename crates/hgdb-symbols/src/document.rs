//! Hierarchical symbol document.
//!
//! A file-serializable alternative to the structured store, for generators
//! that cannot easily target a database. The design is a forest of
//! [`Module`] roots; each root owns a tree of scopes whose leaves carry
//! variables.
//!
//! ```
//! use hgdb_symbols::document::{DocVariable, ScopeContainer, SymbolDocument};
//!
//! let mut doc = SymbolDocument::new("my-generator");
//! let top = doc.add_module("top");
//! top.set_filename("top.sv");
//! top.add_variable(DocVariable::new("WIDTH", "8", false));
//! top.create_scope()
//!     .set_line(3)
//!     .set_condition("en")
//!     .add_assign(DocVariable::new("a", "a0", true), 4);
//!
//! let json = doc.to_json().unwrap();
//! let parsed = hgdb_symbols::SymbolDocument::from_json(&json).unwrap();
//! assert_eq!(parsed, doc);
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SymbolTableError};

/// A variable as written in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocVariable {
    /// Source-level name.
    pub name: String,
    /// Signal name or literal.
    pub value: String,
    /// `true` when `value` names a live signal.
    pub rtl: bool,
    /// Pool id, set only on entries of the document's variable pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl DocVariable {
    /// Create an inline variable.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, rtl: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            rtl,
            id: None,
        }
    }

    fn same_symbol(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value && self.rtl == other.rtl
    }
}

/// A variable slot: written inline or referencing the pool by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarRef {
    /// Variable written in place.
    Inline(DocVariable),
    /// Index into [`SymbolDocument::variable_pool`].
    Pooled(u64),
}

impl From<DocVariable> for VarRef {
    fn from(var: DocVariable) -> Self {
        Self::Inline(var)
    }
}

/// Source position of a node. An empty filename inherits the parent's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Source file, empty when inherited.
    pub filename: String,
    /// Line number, if the node maps to one.
    pub line: Option<u32>,
    /// Column, 0 when unspecified.
    pub column: u32,
}

/// A child-instance binding inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceBinding {
    /// Instance name relative to the parent.
    pub name: String,
    /// Name of the instantiated module.
    pub module: String,
}

/// A lexical block. Serialized as `block`, or `none` without children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockScope {
    /// Position.
    pub location: Location,
    /// Guard expression, empty when unconditional.
    pub condition: String,
    /// Children in lexical order.
    pub scopes: Vec<ScopeNode>,
}

/// A statement binding one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarStmt {
    /// Position.
    pub location: Location,
    /// Guard expression, empty when unconditional.
    pub condition: String,
    /// The bound variable.
    pub variable: VarRef,
}

impl VarStmt {
    fn new(variable: VarRef, line: u32) -> Self {
        Self {
            location: Location {
                line: Some(line),
                ..Location::default()
            },
            condition: String::new(),
            variable,
        }
    }

    /// Set the source file.
    pub fn set_filename(&mut self, filename: impl Into<String>) -> &mut Self {
        self.location.filename = filename.into();
        self
    }

    /// Set the column.
    pub fn set_column(&mut self, column: u32) -> &mut Self {
        self.location.column = column;
        self
    }

    /// Set the guard expression.
    pub fn set_condition(&mut self, condition: impl Into<String>) -> &mut Self {
        self.condition = condition.into();
        self
    }
}

/// A non-root node of the scope tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeNode {
    /// Nested block or empty leaf.
    Block(BlockScope),
    /// Variable declaration.
    Decl(VarStmt),
    /// Variable assignment.
    Assign(VarStmt),
}

impl ScopeNode {
    /// Wire name of the node kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Block(block) if block.scopes.is_empty() => "none",
            Self::Block(_) => "block",
            Self::Decl(_) => "decl",
            Self::Assign(_) => "assign",
        }
    }

    /// Position of the node.
    #[must_use]
    pub fn location(&self) -> &Location {
        match self {
            Self::Block(block) => &block.location,
            Self::Decl(stmt) | Self::Assign(stmt) => &stmt.location,
        }
    }

    fn location_mut(&mut self) -> &mut Location {
        match self {
            Self::Block(block) => &mut block.location,
            Self::Decl(stmt) | Self::Assign(stmt) => &mut stmt.location,
        }
    }

    /// Guard expression of the node.
    #[must_use]
    pub fn condition(&self) -> &str {
        match self {
            Self::Block(block) => &block.condition,
            Self::Decl(stmt) | Self::Assign(stmt) => &stmt.condition,
        }
    }

    /// The statement, for `decl` and `assign` nodes.
    #[must_use]
    pub fn statement(&self) -> Option<&VarStmt> {
        match self {
            Self::Block(_) => None,
            Self::Decl(stmt) | Self::Assign(stmt) => Some(stmt),
        }
    }
}

/// Anything that holds child scopes: a [`Module`] or a [`BlockScope`].
pub trait ScopeContainer {
    /// The children, in lexical order.
    fn children_mut(&mut self) -> &mut Vec<ScopeNode>;

    /// Append an empty block and return it.
    fn create_scope(&mut self) -> &mut BlockScope {
        let children = self.children_mut();
        children.push(ScopeNode::Block(BlockScope::default()));
        match children.last_mut() {
            Some(ScopeNode::Block(block)) => block,
            _ => unreachable!("a block was just pushed"),
        }
    }

    /// Append a declaration at `line`.
    fn add_decl(&mut self, variable: impl Into<VarRef>, line: u32) -> &mut VarStmt {
        push_stmt(self.children_mut(), ScopeNode::Decl(VarStmt::new(variable.into(), line)))
    }

    /// Append an assignment at `line`.
    fn add_assign(&mut self, variable: impl Into<VarRef>, line: u32) -> &mut VarStmt {
        push_stmt(self.children_mut(), ScopeNode::Assign(VarStmt::new(variable.into(), line)))
    }
}

fn push_stmt(children: &mut Vec<ScopeNode>, node: ScopeNode) -> &mut VarStmt {
    children.push(node);
    match children.last_mut() {
        Some(ScopeNode::Decl(stmt) | ScopeNode::Assign(stmt)) => stmt,
        _ => unreachable!("a statement was just pushed"),
    }
}

impl BlockScope {
    /// Set the source file.
    pub fn set_filename(&mut self, filename: impl Into<String>) -> &mut Self {
        self.location.filename = filename.into();
        self
    }

    /// Set the line.
    pub fn set_line(&mut self, line: u32) -> &mut Self {
        self.location.line = Some(line);
        self
    }

    /// Set the column.
    pub fn set_column(&mut self, column: u32) -> &mut Self {
        self.location.column = column;
        self
    }

    /// Set the guard expression.
    pub fn set_condition(&mut self, condition: impl Into<String>) -> &mut Self {
        self.condition = condition.into();
        self
    }
}

impl ScopeContainer for BlockScope {
    fn children_mut(&mut self) -> &mut Vec<ScopeNode> {
        &mut self.scopes
    }
}

/// A design module: the only kind of root node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Module name.
    pub name: String,
    /// Position.
    pub location: Location,
    /// Top-level scopes in lexical order.
    pub scopes: Vec<ScopeNode>,
    /// Variables visible in every instance of the module.
    pub variables: Vec<VarRef>,
    /// Child instances.
    pub instances: Vec<InstanceBinding>,
}

impl Module {
    fn new(name: String) -> Self {
        Self {
            name,
            location: Location::default(),
            scopes: Vec::new(),
            variables: Vec::new(),
            instances: Vec::new(),
        }
    }

    /// Set the source file every scope inherits.
    pub fn set_filename(&mut self, filename: impl Into<String>) -> &mut Self {
        self.location.filename = filename.into();
        self
    }

    /// Set the line of the module header.
    pub fn set_line(&mut self, line: u32) -> &mut Self {
        self.location.line = Some(line);
        self
    }

    /// Declare a module-level variable.
    pub fn add_variable(&mut self, variable: impl Into<VarRef>) -> &mut Self {
        self.variables.push(variable.into());
        self
    }

    /// Instantiate `module` under `name`. The child is no longer a top.
    pub fn add_instance(&mut self, name: impl Into<String>, module: impl Into<String>) -> &mut Self {
        self.instances.push(InstanceBinding {
            name: name.into(),
            module: module.into(),
        });
        self
    }
}

impl ScopeContainer for Module {
    fn children_mut(&mut self) -> &mut Vec<ScopeNode> {
        &mut self.scopes
    }
}

/// A complete hierarchical symbol document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDocument {
    generator: String,
    modules: Vec<Module>,
    variables: Vec<DocVariable>,
    reorder: bool,
}

impl SymbolDocument {
    /// Create an empty document tagged with its producer.
    #[must_use]
    pub fn new(generator: impl Into<String>) -> Self {
        Self {
            generator: generator.into(),
            modules: Vec::new(),
            variables: Vec::new(),
            reorder: true,
        }
    }

    /// Producer tag.
    #[must_use]
    pub fn generator(&self) -> &str {
        &self.generator
    }

    /// Start a new module root.
    pub fn add_module(&mut self, name: impl Into<String>) -> &mut Module {
        let index = self.modules.len();
        self.modules.push(Module::new(name.into()));
        &mut self.modules[index]
    }

    /// All modules in insertion order.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Look up a module by name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Modules not instantiated by any other module, sorted.
    #[must_use]
    pub fn top_names(&self) -> Vec<String> {
        let instantiated: HashSet<&str> = self
            .modules
            .iter()
            .flat_map(|m| m.instances.iter().map(|i| i.module.as_str()))
            .collect();
        self.modules
            .iter()
            .map(|m| m.name.as_str())
            .filter(|name| !instantiated.contains(name))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// The shared variable pool built by [`compress`](Self::compress).
    #[must_use]
    pub fn variable_pool(&self) -> &[DocVariable] {
        &self.variables
    }

    /// Resolve a variable slot against the pool.
    #[must_use]
    pub fn resolve<'a>(&'a self, var: &'a VarRef) -> Option<&'a DocVariable> {
        match var {
            VarRef::Inline(var) => Some(var),
            VarRef::Pooled(id) => usize::try_from(*id).ok().and_then(|i| self.variables.get(i)),
        }
    }

    /// Whether consumers may reorder breakpoints.
    #[must_use]
    pub const fn reorder(&self) -> bool {
        self.reorder
    }

    /// Tell consumers to keep lexical breakpoint order.
    pub fn disable_reorder(&mut self) {
        self.reorder = false;
    }

    /// Shrink the document: pool variables used more than once, and drop
    /// filenames a node would inherit anyway.
    pub fn compress(&mut self) {
        self.compress_variables();
        for module in &mut self.modules {
            let inherited = module.location.filename.clone();
            for node in &mut module.scopes {
                clear_inherited_filename(node, &inherited, true);
            }
        }
    }

    fn compress_variables(&mut self) {
        let mut counts: Vec<(DocVariable, usize)> = Vec::new();
        for module in &self.modules {
            for var in &module.variables {
                count_variable(&mut counts, var);
            }
            visit_statements(&module.scopes, &mut |stmt| count_variable(&mut counts, &stmt.variable));
        }

        let mut pooled: Vec<(DocVariable, u64)> = Vec::new();
        for (var, count) in counts {
            if count > 1 {
                let id = self.variables.len() as u64;
                let mut entry = var.clone();
                entry.id = Some(id.to_string());
                self.variables.push(entry);
                pooled.push((var, id));
            }
        }
        if pooled.is_empty() {
            return;
        }

        let lookup = |slot: &mut VarRef| {
            if let VarRef::Inline(var) = slot {
                if let Some((_, id)) = pooled.iter().find(|(p, _)| p.same_symbol(var)) {
                    *slot = VarRef::Pooled(*id);
                }
            }
        };
        for module in &mut self.modules {
            for slot in &mut module.variables {
                lookup(slot);
            }
            visit_statements_mut(&mut module.scopes, &mut |stmt| lookup(&mut stmt.variable));
        }
        tracing::debug!(pooled = pooled.len(), "pooled shared document variables");
    }

    /// Check structural invariants: unique module names, and every instance
    /// binding naming an existing module.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for module in &self.modules {
            if !names.insert(module.name.as_str()) {
                return Err(SymbolTableError::document(format!(
                    "module '{}' is defined twice",
                    module.name
                )));
            }
        }
        for module in &self.modules {
            for binding in &module.instances {
                if !names.contains(binding.module.as_str()) {
                    return Err(SymbolTableError::document(format!(
                        "instance '{}' in '{}' references unknown module '{}'",
                        binding.name, module.name, binding.module
                    )));
                }
            }
        }
        Ok(())
    }

    /// Serialize the document.
    pub fn to_json(&self) -> Result<String> {
        self.validate()?;
        Ok(serde_json::to_string(&self.to_raw())?)
    }

    /// Serialize the document with indentation.
    pub fn to_json_pretty(&self) -> Result<String> {
        self.validate()?;
        Ok(serde_json::to_string_pretty(&self.to_raw())?)
    }

    /// Parse a document. Roots must be modules and no module may nest.
    ///
    /// Pool entries may carry their ids in any order; references are
    /// renumbered to pool positions on the way in.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawDocument = serde_json::from_str(json)?;
        let mut modules = raw
            .table
            .into_iter()
            .map(module_from_raw)
            .collect::<Result<Vec<_>>>()?;
        let mut variables = raw
            .variables
            .into_iter()
            .map(|var| match var {
                RawVar::Inline(var) => Ok(var),
                RawVar::Ref(id) => Err(SymbolTableError::document(format!(
                    "variable pool entry '{id}' is a reference"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        renumber_pool(&mut variables, &mut modules)?;

        let doc = Self {
            generator: raw.generator,
            modules,
            variables,
            reorder: raw.reorder,
        };
        doc.validate()?;
        Ok(doc)
    }

    fn to_raw(&self) -> RawDocument {
        let tops = self.top_names();
        let top = if tops.len() == 1 {
            RawTop::One(tops.into_iter().next().unwrap_or_default())
        } else {
            RawTop::Many(tops)
        };
        RawDocument {
            generator: self.generator.clone(),
            top,
            table: self.modules.iter().map(module_to_raw).collect(),
            variables: self.variables.iter().cloned().map(RawVar::Inline).collect(),
            reorder: self.reorder,
        }
    }
}

fn count_variable(counts: &mut Vec<(DocVariable, usize)>, slot: &VarRef) {
    if let VarRef::Inline(var) = slot {
        match counts.iter_mut().find(|(seen, _)| seen.same_symbol(var)) {
            Some((_, count)) => *count += 1,
            None => counts.push((var.clone(), 1)),
        }
    }
}

fn visit_statements(nodes: &[ScopeNode], f: &mut impl FnMut(&VarStmt)) {
    for node in nodes {
        match node {
            ScopeNode::Block(block) => visit_statements(&block.scopes, f),
            ScopeNode::Decl(stmt) | ScopeNode::Assign(stmt) => f(stmt),
        }
    }
}

fn visit_statements_mut(nodes: &mut [ScopeNode], f: &mut impl FnMut(&mut VarStmt)) {
    for node in nodes {
        match node {
            ScopeNode::Block(block) => visit_statements_mut(&mut block.scopes, f),
            ScopeNode::Decl(stmt) | ScopeNode::Assign(stmt) => f(stmt),
        }
    }
}

/// Point every pooled reference at its entry's position in the pool, and
/// rewrite pool ids to match.
fn renumber_pool(variables: &mut [DocVariable], modules: &mut [Module]) -> Result<()> {
    let mut positions: HashMap<u64, u64> = HashMap::new();
    for (position, var) in variables.iter_mut().enumerate() {
        let id = var
            .id
            .as_deref()
            .and_then(|id| id.parse::<u64>().ok())
            .ok_or_else(|| {
                SymbolTableError::document(format!(
                    "variable pool entry '{}' has no numeric id",
                    var.name
                ))
            })?;
        if positions.insert(id, position as u64).is_some() {
            return Err(SymbolTableError::document(format!(
                "variable pool id {id} is used twice"
            )));
        }
        var.id = Some(position.to_string());
    }

    for module in modules {
        let mut missing = None;
        {
            let mut remap = |slot: &mut VarRef| {
                if let VarRef::Pooled(id) = slot {
                    match positions.get(&*id) {
                        Some(position) => *id = *position,
                        None => {
                            missing.get_or_insert(*id);
                        }
                    }
                }
            };
            for slot in &mut module.variables {
                remap(slot);
            }
            visit_statements_mut(&mut module.scopes, &mut |stmt| remap(&mut stmt.variable));
        }
        if let Some(id) = missing {
            return Err(SymbolTableError::document(format!(
                "module '{}' references missing pooled variable {id}",
                module.name
            )));
        }
    }
    Ok(())
}

/// Direct children of a module keep their filename.
fn clear_inherited_filename(node: &mut ScopeNode, inherited: &str, under_module: bool) {
    let location = node.location_mut();
    let effective = if location.filename.is_empty() {
        inherited.to_string()
    } else {
        location.filename.clone()
    };
    if !under_module && !location.filename.is_empty() && location.filename == inherited {
        location.filename.clear();
    }
    if let ScopeNode::Block(block) = node {
        for child in &mut block.scopes {
            clear_inherited_filename(child, &effective, false);
        }
    }
}

// ============================================================================
// Wire form
// ============================================================================

#[derive(Serialize, Deserialize)]
struct RawDocument {
    #[serde(default)]
    generator: String,
    #[serde(default)]
    top: RawTop,
    #[serde(default)]
    table: Vec<RawNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    variables: Vec<RawVar>,
    #[serde(default = "default_reorder", skip_serializing_if = "is_true")]
    reorder: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawTop {
    One(String),
    Many(Vec<String>),
}

impl Default for RawTop {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawVar {
    Ref(String),
    Inline(DocVariable),
}

#[derive(Serialize, Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(default, alias = "col", skip_serializing_if = "is_zero")]
    column: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<Vec<RawNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    variable: Option<RawVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instances: Option<Vec<InstanceBinding>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    variables: Option<Vec<RawVar>>,
}

impl RawNode {
    fn new(kind: &str, location: &Location, condition: &str) -> Self {
        Self {
            kind: kind.to_string(),
            filename: location.filename.clone(),
            line: location.line,
            // A column without a line is meaningless.
            column: if location.line.is_some() { location.column } else { 0 },
            condition: condition.to_string(),
            scope: None,
            variable: None,
            name: None,
            instances: None,
            variables: None,
        }
    }

    fn location(&self) -> Location {
        Location {
            filename: self.filename.clone(),
            line: self.line,
            column: self.column,
        }
    }
}

const fn default_reorder() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_true(value: &bool) -> bool {
    *value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn var_to_raw(var: &VarRef) -> RawVar {
    match var {
        VarRef::Inline(var) => RawVar::Inline(var.clone()),
        VarRef::Pooled(id) => RawVar::Ref(id.to_string()),
    }
}

fn var_from_raw(var: RawVar) -> Result<VarRef> {
    match var {
        RawVar::Inline(var) => Ok(VarRef::Inline(var)),
        RawVar::Ref(id) => id
            .parse::<u64>()
            .map(VarRef::Pooled)
            .map_err(|_| SymbolTableError::document(format!("invalid variable reference '{id}'"))),
    }
}

fn module_to_raw(module: &Module) -> RawNode {
    let mut raw = RawNode::new("module", &module.location, "");
    raw.scope = Some(module.scopes.iter().map(node_to_raw).collect());
    raw.name = Some(module.name.clone());
    raw.instances = Some(module.instances.clone());
    raw.variables = Some(module.variables.iter().map(var_to_raw).collect());
    raw
}

fn node_to_raw(node: &ScopeNode) -> RawNode {
    let mut raw = RawNode::new(node.kind(), node.location(), node.condition());
    match node {
        ScopeNode::Block(block) if !block.scopes.is_empty() => {
            raw.scope = Some(block.scopes.iter().map(node_to_raw).collect());
        }
        ScopeNode::Block(_) => {}
        ScopeNode::Decl(stmt) | ScopeNode::Assign(stmt) => {
            raw.variable = Some(var_to_raw(&stmt.variable));
        }
    }
    raw
}

fn module_from_raw(raw: RawNode) -> Result<Module> {
    if raw.kind != "module" {
        return Err(SymbolTableError::document(format!(
            "root node of type '{}' is not a module",
            raw.kind
        )));
    }
    let location = raw.location();
    let name = raw
        .name
        .ok_or_else(|| SymbolTableError::document("module without a name"))?;
    let scopes = raw
        .scope
        .unwrap_or_default()
        .into_iter()
        .map(node_from_raw)
        .collect::<Result<Vec<_>>>()?;
    let variables = raw
        .variables
        .unwrap_or_default()
        .into_iter()
        .map(var_from_raw)
        .collect::<Result<Vec<_>>>()?;
    Ok(Module {
        name,
        location,
        scopes,
        variables,
        instances: raw.instances.unwrap_or_default(),
    })
}

fn node_from_raw(raw: RawNode) -> Result<ScopeNode> {
    let location = raw.location();
    match raw.kind.as_str() {
        "none" | "block" => {
            let scopes = raw
                .scope
                .unwrap_or_default()
                .into_iter()
                .map(node_from_raw)
                .collect::<Result<Vec<_>>>()?;
            Ok(ScopeNode::Block(BlockScope {
                location,
                condition: raw.condition,
                scopes,
            }))
        }
        "decl" | "assign" => {
            let variable = raw.variable.ok_or_else(|| {
                SymbolTableError::document(format!("'{}' node without a variable", raw.kind))
            })?;
            let stmt = VarStmt {
                location,
                condition: raw.condition,
                variable: var_from_raw(variable)?,
            };
            Ok(if raw.kind == "decl" {
                ScopeNode::Decl(stmt)
            } else {
                ScopeNode::Assign(stmt)
            })
        }
        "module" => Err(SymbolTableError::document(format!(
            "module '{}' nested inside another scope",
            raw.name.unwrap_or_default()
        ))),
        other => Err(SymbolTableError::document(format!("unknown scope type '{other}'"))),
    }
}
