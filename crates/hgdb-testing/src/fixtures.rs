//! Pre-built designs for common test scenarios.
//!
//! The sample design is a `top` module in `top.sv` instantiating `child`
//! from `child.sv`:
//!
//! | breakpoint | instance | location | context |
//! |---|---|---|---|
//! | 0 | `top` | `top.sv:2` | `a` |
//! | 1 | `top` | `top.sv:3` | `a`, `b` |
//! | 2 | `top.child` | `child.sv:5` | `c` |
//! | 3 | `top.child` | `child.sv:6` | `c`, `d` |
//!
//! `top` carries the generator variable `clk` and `top.child` the constant
//! `WIDTH = 8`.

use hgdb_symbols::SymbolDocument;
use hgdb_symbols::SymbolIndex;
use hgdb_symbols::document::{DocVariable, ScopeContainer};

use crate::timeline::Timeline;

/// Clock signal of the sample design.
pub const SAMPLE_CLOCK: &str = "top.clk";

/// The sample design as a hierarchical document.
#[must_use]
pub fn sample_document() -> SymbolDocument {
    let mut doc = SymbolDocument::new("hgdb-testing");

    let top = doc.add_module("top");
    top.set_filename("top.sv").set_line(1);
    top.add_variable(DocVariable::new("clk", SAMPLE_CLOCK, true));
    top.add_decl(DocVariable::new("a", "top.a", true), 2);
    top.add_assign(DocVariable::new("b", "top.b", true), 3);
    top.add_instance("child", "child");

    let child = doc.add_module("child");
    child.set_filename("child.sv").set_line(4);
    child.add_variable(DocVariable::new("WIDTH", "8", false));
    child.add_decl(DocVariable::new("c", "top.child.c", true), 5);
    child.add_assign(DocVariable::new("d", "top.child.d", true), 6);

    doc
}

/// The sample design lowered into an index, with its clock annotated.
///
/// # Panics
///
/// Never in practice: the sample document is well formed.
#[must_use]
pub fn sample_index() -> SymbolIndex {
    SymbolIndex::from_document(&sample_document())
        .expect("sample document is well formed")
        .with_annotation("clock", SAMPLE_CLOCK)
}

/// Four clock cycles over the sample design. Every breakpoint is evaluated
/// twice:
///
/// | time | breakpoints | writes |
/// |---|---|---|
/// | 0 | 0, 2 | `top.a = 1`, `top.child.c = 3` |
/// | 10 | 1, 3 | `top.b = 2`, `top.child.d = 4` |
/// | 20 | 0, 2 | `top.a = 5` |
/// | 30 | 1, 3 | `top.child.d = 6` |
#[must_use]
pub fn sample_timeline() -> Timeline {
    Timeline::new()
        .at(0, 0)
        .write("top.a", 1)
        .at(0, 2)
        .write("top.child.c", 3)
        .at(10, 1)
        .write("top.b", 2)
        .at(10, 3)
        .write("top.child.d", 4)
        .at(20, 0)
        .write("top.a", 5)
        .at(20, 2)
        .at(30, 1)
        .at(30, 3)
        .write("top.child.d", 6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sample_index_layout() {
        let index = sample_index();
        assert_eq!(index.get_instance_names(), vec!["top", "top.child"]);
        assert_eq!(index.breakpoints().len(), 4);

        let bp = index.get_breakpoint(3).unwrap();
        assert_eq!((bp.filename.as_str(), bp.line_num, bp.instance_id), ("child.sv", 6, 1));

        let names: Vec<String> = index
            .get_context_variables(3)
            .into_iter()
            .map(|(c, _)| c.name)
            .collect();
        assert_eq!(names, vec!["c", "d"]);

        assert_eq!(index.resolve_scoped_name_instance("clk", 0).as_deref(), Some(SAMPLE_CLOCK));
        assert_eq!(index.get_annotation_values("clock"), vec![SAMPLE_CLOCK]);
    }

    #[test]
    fn test_sample_timeline_covers_every_breakpoint() {
        let timeline = sample_timeline();
        assert_eq!(timeline.len(), 8);
        for id in 0..4 {
            let hits = timeline
                .points()
                .iter()
                .filter(|p| p.breakpoint_id == id)
                .count();
            assert_eq!(hits, 2, "breakpoint {id}");
        }
    }
}
