use async_graphql::{EmptySubscription, Schema};
use std::sync::Arc;

use crate::app_state::Services;
use crate::graphql::mutation::Mutation;
use crate::graphql::query::Query;

/// Per-request client metadata extracted from headers, injected into the
/// GraphQL context so login can record ip/user-agent on the session.
#[derive(Debug, Clone)]
pub struct ClientMeta {
    pub ip: String,
    pub user_agent: String,
}

/// The complete GraphQL schema.
pub type AppSchema = Schema<Query, Mutation, EmptySubscription>;

/// Create a new GraphQL schema over the shared services.
pub fn build_schema(services: Arc<Services>) -> AppSchema {
    Schema::build(Query, Mutation, EmptySubscription)
        .data(services)
        .finish()
}
