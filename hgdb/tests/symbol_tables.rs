//! Symbol documents, SQLite stores and serving a store live.

use std::sync::Arc;

use hgdb::prelude::*;
use hgdb_testing::{init_tracing, sample_document, sample_index};
use pretty_assertions::assert_eq;

#[test]
fn test_document_json_round_trip() {
    let doc = sample_document();
    let json = doc.to_json().unwrap();
    let parsed = SymbolDocument::from_json(&json).unwrap();

    let original = SymbolIndex::from_document(&doc).unwrap();
    let reparsed = SymbolIndex::from_document(&parsed).unwrap();
    assert_eq!(reparsed.breakpoints(), original.breakpoints());
    assert_eq!(reparsed.get_instance_names(), original.get_instance_names());
    assert_eq!(reparsed.get_context_variables(3), original.get_context_variables(3));
}

#[tokio::test]
async fn test_index_persists_to_disk() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("design.db");
    let index = sample_index();

    {
        let table = DebugSymbolTable::open(&path).await.unwrap();
        index.write_to(&table).await.unwrap();
    }

    let table = DebugSymbolTable::open(&path).await.unwrap();
    assert_eq!(table.get_instance_names().await.unwrap(), vec!["top", "top.child"]);
    assert_eq!(
        table.get_breakpoints_in_file("child.sv").await.unwrap(),
        index
            .breakpoints()
            .iter()
            .filter(|bp| bp.filename == "child.sv")
            .cloned()
            .collect::<Vec<_>>()
    );
    assert_eq!(table.get_context_variables(1).await.unwrap(), index.get_context_variables(1));
    assert_eq!(table.get_annotation_values("clock").await.unwrap(), vec!["top.clk"]);
    assert_eq!(table.execution_bp_orders().await.unwrap(), index.execution_bp_orders());
}

#[tokio::test]
async fn test_writer_rejects_dangling_ids() {
    let table = DebugSymbolTable::in_memory().await.unwrap();

    let err = table
        .store_breakpoint(&BreakpointSymbol::new(0, 7, "top.sv", 1))
        .await
        .unwrap_err();
    assert!(err.is_integrity());
    assert!(matches!(HgdbError::from(err), HgdbError::Integrity { .. }));

    table.store_instance(&Instance::new(0, "top")).await.unwrap();
    let err = table.store_instance(&Instance::new(0, "again")).await.unwrap_err();
    assert!(err.is_integrity());
    assert!(!table.has_breakpoint_id(0).await.unwrap());
}

#[tokio::test]
async fn test_store_served_as_provider() {
    init_tracing();
    let table = DebugSymbolTable::in_memory().await.unwrap();
    sample_index().write_to(&table).await.unwrap();

    let server = Arc::new(ProviderServer::new(table, ProviderConfig::default()));
    let (client_side, server_side) = MemoryTransport::pair();
    let serving = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.serve_transport(server_side).await })
    };

    let client = ProviderClient::new(client_side);
    let bps = client.get_breakpoints("top.sv", 3, 0).await.unwrap();
    assert_eq!(bps.len(), 1);
    assert_eq!(client.get_instance_id_by_bp(bps[0].id).await.unwrap(), Some(0));
    assert_eq!(
        client.resolve_scoped_name_breakpoint("b", bps[0].id).await.unwrap().as_deref(),
        Some("top.b")
    );
    assert!(client.get_context_static_values(2).await.unwrap().is_empty());
    assert_eq!(
        client.resolve_scoped_name_instance("WIDTH", 1).await.unwrap().as_deref(),
        Some("8")
    );

    client.close().await.unwrap();
    serving.await.unwrap().unwrap();
}
