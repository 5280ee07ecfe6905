//! Connection abstractions between the engine and the PostgreSQL driver.
//!
//! The engine never talks to a concrete driver type. It talks to three small
//! traits:
//!
//! - [`Queryer`]: anything that can execute statements and run queries (a
//!   connection, a pooled connection, or an open transaction)
//! - [`Connection`]: a [`Queryer`] that can also begin a transaction
//! - [`TransactionHandle`]: an open transaction, consumed by commit/rollback
//!
//! Implementations are provided for `tokio_postgres::Client` and
//! `tokio_postgres::Transaction`, and for `deadpool_postgres::Object` so
//! pooled callers can hand a checked-out connection straight to
//! [`Migrator::apply`](crate::Migrator::apply). Anything else (instrumented
//! wrappers, test doubles) can implement the traits directly and report
//! failures through [`SchemaError::Connection`](crate::SchemaError::Connection).

use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;

use crate::error::Result;

/// Execute statements and run queries against a live session.
///
/// Implemented by connections and by open transactions, so code that only
/// needs to read or execute can run in either context.
#[async_trait]
pub trait Queryer: Send + Sync {
    /// Execute a single statement, returning the number of rows affected.
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64>;

    /// Run a query and collect all resulting rows.
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>>;

    /// Execute a statement batch as one unit via the simple query protocol.
    ///
    /// Migration scripts go through this path: it accepts multiple
    /// `;`-separated statements but no bound parameters.
    async fn batch_execute(&self, sql: &str) -> Result<()>;
}

/// A [`Queryer`] that can open a transaction.
#[async_trait]
pub trait Connection: Queryer {
    /// Begin a transaction. The handle borrows this connection exclusively
    /// until it is committed or rolled back.
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn TransactionHandle + 'a>>;
}

/// An open transaction. Dropping the handle without committing rolls the
/// transaction back at the driver level.
#[async_trait]
pub trait TransactionHandle: Queryer {
    /// Commit the transaction.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Roll the transaction back explicitly.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

// =============================================================================
// tokio-postgres implementations
// =============================================================================

#[async_trait]
impl Queryer for tokio_postgres::Client {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        Ok(tokio_postgres::Client::execute(self, sql, params).await?)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }

    async fn batch_execute(&self, sql: &str) -> Result<()> {
        Ok(tokio_postgres::Client::batch_execute(self, sql).await?)
    }
}

#[async_trait]
impl Connection for tokio_postgres::Client {
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn TransactionHandle + 'a>> {
        let tx = tokio_postgres::Client::transaction(self).await?;
        Ok(Box::new(tx))
    }
}

#[async_trait]
impl Queryer for tokio_postgres::Transaction<'_> {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        Ok(tokio_postgres::Transaction::execute(self, sql, params).await?)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }

    async fn batch_execute(&self, sql: &str) -> Result<()> {
        Ok(tokio_postgres::Transaction::batch_execute(self, sql).await?)
    }
}

#[async_trait]
impl TransactionHandle for tokio_postgres::Transaction<'_> {
    async fn commit(self: Box<Self>) -> Result<()> {
        Ok((*self).commit().await?)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok((*self).rollback().await?)
    }
}

// =============================================================================
// deadpool-postgres implementations
// =============================================================================

#[async_trait]
impl Queryer for deadpool_postgres::Object {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let client: &tokio_postgres::Client = self;
        Ok(client.execute(sql, params).await?)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client: &tokio_postgres::Client = self;
        Ok(client.query(sql, params).await?)
    }

    async fn batch_execute(&self, sql: &str) -> Result<()> {
        let client: &tokio_postgres::Client = self;
        Ok(client.batch_execute(sql).await?)
    }
}

#[async_trait]
impl Connection for deadpool_postgres::Object {
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn TransactionHandle + 'a>> {
        let wrapper: &mut deadpool_postgres::ClientWrapper = self;
        let tx = wrapper.transaction().await?;
        Ok(Box::new(tx))
    }
}

#[async_trait]
impl Queryer for deadpool_postgres::Transaction<'_> {
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let tx: &tokio_postgres::Transaction<'_> = self;
        Ok(tx.execute(sql, params).await?)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let tx: &tokio_postgres::Transaction<'_> = self;
        Ok(tx.query(sql, params).await?)
    }

    async fn batch_execute(&self, sql: &str) -> Result<()> {
        let tx: &tokio_postgres::Transaction<'_> = self;
        Ok(tx.batch_execute(sql).await?)
    }
}

#[async_trait]
impl TransactionHandle for deadpool_postgres::Transaction<'_> {
    async fn commit(self: Box<Self>) -> Result<()> {
        Ok((*self).commit().await?)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok((*self).rollback().await?)
    }
}
