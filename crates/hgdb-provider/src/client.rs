//! The querying side of the provider protocol.
//!
//! A [`ProviderClient`] is itself a [`SymbolProvider`]: every lookup becomes
//! one query frame, and an empty reply becomes `None` or an empty list.

use std::collections::BTreeMap;

use async_lock::Mutex;
use hgdb_core::error::{HgdbError, TransportErrorKind};
use hgdb_core::types::{BreakpointSymbol, ContextVariable, GeneratorVariable, Variable};
use hgdb_transport::{Transport, WebSocketConfig, WebSocketTransport};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::provider::{StaticValues, SymbolProvider};
use crate::query::ProviderQuery;

/// A connection to a symbol provider.
///
/// Queries on one client are answered strictly in order.
pub struct ProviderClient<T: Transport> {
    transport: T,
    exchange: Mutex<()>,
}

impl ProviderClient<WebSocketTransport> {
    /// Connect to a provider over WebSocket.
    pub async fn connect(url: impl Into<String>) -> Result<Self, HgdbError> {
        let url = url.into();
        info!(url = %url, "connecting to symbol provider");
        let transport = WebSocketTransport::connect(WebSocketConfig::new(url))
            .await
            .map_err(HgdbError::from)?;
        Ok(Self::new(transport))
    }
}

impl<T: Transport> ProviderClient<T> {
    /// Query over an established transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            exchange: Mutex::new(()),
        }
    }

    /// Send a raw frame and return the raw reply object.
    pub async fn request(&self, frame: String) -> Result<Value, HgdbError> {
        let _turn = self.exchange.lock().await;
        self.transport.send(frame).await.map_err(Into::into)?;
        let reply = self.transport.recv().await.map_err(Into::into)?.ok_or_else(|| {
            HgdbError::transport(
                TransportErrorKind::ConnectionClosed,
                "provider closed the connection before replying",
            )
        })?;
        serde_json::from_str(&reply)
            .map_err(|e| HgdbError::protocol(format!("malformed provider reply: {e}")))
    }

    /// Run a query. `None` is the empty reply.
    pub async fn query(&self, query: &ProviderQuery) -> Result<Option<Value>, HgdbError> {
        debug!(query = %query, "sending provider query");
        let reply = self.request(query.to_frame()).await?;
        Ok(reply.get("result").cloned())
    }

    async fn fetch<R: DeserializeOwned>(&self, query: ProviderQuery) -> Result<Option<R>, HgdbError> {
        self.query(&query)
            .await?
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    HgdbError::protocol(format!("unexpected answer to {query}: {e}"))
                })
            })
            .transpose()
    }

    async fn fetch_list<R: DeserializeOwned>(&self, query: ProviderQuery) -> Result<Vec<R>, HgdbError> {
        Ok(self.fetch(query).await?.unwrap_or_default())
    }

    /// Close the connection.
    pub async fn close(&self) -> Result<(), HgdbError> {
        self.transport.close().await.map_err(Into::into)
    }
}

impl<T: Transport> SymbolProvider for ProviderClient<T> {
    async fn get_breakpoint(&self, breakpoint_id: u64) -> Result<Option<BreakpointSymbol>, HgdbError> {
        self.fetch(ProviderQuery::GetBreakpoint { breakpoint_id }).await
    }

    async fn get_breakpoints(
        &self,
        filename: &str,
        line_num: u32,
        column_num: u32,
    ) -> Result<Vec<BreakpointSymbol>, HgdbError> {
        self.fetch_list(ProviderQuery::GetBreakpoints {
            filename: filename.to_string(),
            line_num,
            column_num,
        })
        .await
    }

    async fn get_instance_name(&self, instance_id: u64) -> Result<Option<String>, HgdbError> {
        self.fetch(ProviderQuery::GetInstanceName { instance_id }).await
    }

    async fn get_instance_id_by_name(&self, instance_name: &str) -> Result<Option<u64>, HgdbError> {
        self.fetch(ProviderQuery::GetInstanceIdByName {
            instance_name: instance_name.to_string(),
        })
        .await
    }

    async fn get_instance_id_by_bp(&self, breakpoint_id: u64) -> Result<Option<u64>, HgdbError> {
        self.fetch(ProviderQuery::GetInstanceIdByBp { breakpoint_id }).await
    }

    async fn get_context_variables(
        &self,
        breakpoint_id: u64,
    ) -> Result<Vec<(ContextVariable, Variable)>, HgdbError> {
        self.fetch_list(ProviderQuery::GetContextVariables { breakpoint_id })
            .await
    }

    async fn get_generator_variables(
        &self,
        instance_id: u64,
    ) -> Result<Vec<(GeneratorVariable, Variable)>, HgdbError> {
        self.fetch_list(ProviderQuery::GetGeneratorVariables { instance_id })
            .await
    }

    async fn get_instance_names(&self) -> Result<Vec<String>, HgdbError> {
        self.fetch_list(ProviderQuery::GetInstanceNames).await
    }

    async fn get_context_static_values(&self, breakpoint_id: u64) -> Result<StaticValues, HgdbError> {
        Ok(self
            .fetch::<BTreeMap<String, i64>>(ProviderQuery::GetContextStaticValues { breakpoint_id })
            .await?
            .unwrap_or_default())
    }

    async fn get_annotation_values(&self, name: &str) -> Result<Vec<String>, HgdbError> {
        self.fetch_list(ProviderQuery::GetAnnotationValues {
            name: name.to_string(),
        })
        .await
    }

    async fn get_all_array_names(&self) -> Result<Vec<String>, HgdbError> {
        self.fetch_list(ProviderQuery::GetAllArrayNames).await
    }

    async fn resolve_scoped_name_breakpoint(
        &self,
        name: &str,
        breakpoint_id: u64,
    ) -> Result<Option<String>, HgdbError> {
        self.fetch(ProviderQuery::ResolveScopedNameBreakpoint {
            name: name.to_string(),
            breakpoint_id,
        })
        .await
    }

    async fn resolve_scoped_name_instance(
        &self,
        name: &str,
        instance_id: u64,
    ) -> Result<Option<String>, HgdbError> {
        self.fetch(ProviderQuery::ResolveScopedNameInstance {
            name: name.to_string(),
            instance_id,
        })
        .await
    }

    async fn execution_bp_orders(&self) -> Result<Vec<u64>, HgdbError> {
        self.fetch_list(ProviderQuery::ExecutionBpOrders).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{ProviderConfig, ProviderServer};
    use hgdb_symbols::SymbolIndex;
    use hgdb_symbols::SymbolDocument;
    use hgdb_symbols::document::{DocVariable, ScopeContainer};
    use hgdb_transport::MemoryTransport;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn served() -> (ProviderClient<MemoryTransport>, tokio::task::JoinHandle<()>) {
        let mut doc = SymbolDocument::new("test");
        let top = doc.add_module("top");
        top.set_filename("top.sv");
        top.add_assign(DocVariable::new("a", "top.a", true), 4);
        let index = SymbolIndex::from_document(&doc).unwrap().with_annotation("clock", "top.clk");

        let server = Arc::new(ProviderServer::new(index, ProviderConfig::default()));
        let (peer, conn) = MemoryTransport::pair();
        let task = tokio::spawn(async move {
            server.serve_transport(conn).await.unwrap();
        });
        (ProviderClient::new(peer), task)
    }

    #[tokio::test]
    async fn test_remote_lookups() {
        let (client, task) = served();

        assert_eq!(client.get_instance_names().await.unwrap(), vec!["top".to_string()]);
        assert_eq!(client.get_instance_id_by_name("top").await.unwrap(), Some(0));
        assert_eq!(client.get_instance_id_by_name("missing").await.unwrap(), None);

        let bps = client.get_breakpoints("top.sv", 4, 0).await.unwrap();
        assert_eq!(bps.len(), 1);
        let bp = client.get_breakpoint(bps[0].id).await.unwrap().unwrap();
        assert_eq!(bp, bps[0]);

        let context = client.get_context_variables(bp.id).await.unwrap();
        assert_eq!(context[0].0.name, "a");
        assert_eq!(context[0].1.value, "top.a");

        assert_eq!(
            client.get_annotation_values("clock").await.unwrap(),
            vec!["top.clk".to_string()]
        );
        assert!(client.get_breakpoints("other.sv", 1, 0).await.unwrap().is_empty());

        client.close().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_query_then_valid_query() {
        let (client, task) = served();

        let reply = client
            .request(r#"{"payload": {"type": "unknown_query"}}"#.to_string())
            .await
            .unwrap();
        assert_eq!(reply, serde_json::json!({}));
        assert_eq!(client.get_instance_name(0).await.unwrap().as_deref(), Some("top"));

        client.close().await.unwrap();
        task.await.unwrap();
    }
}
