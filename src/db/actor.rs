use crate::db::models::{NewPerson, Person};
use crate::db::sqlite::PeopleStorage;
use crate::error::PersistError;

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

type Reply<T> = RpcReplyPort<Result<T, PersistError>>;

/// Statements the database actor executes, one at a time, in mailbox order.
#[derive(Debug)]
pub enum DbMessage {
    CountRows(Reply<i64>),
    ListPage { limit: i64, offset: i64, reply: Reply<Vec<Person>> },
    Insert(NewPerson, Reply<i64>),
    Update(i64, NewPerson, Reply<u64>),
    DeleteOne(i64, Reply<u64>),
    DeleteAll(Reply<u64>),
}

/// Handle for issuing statements to the database actor.
#[derive(Clone)]
pub struct DbHandle {
    actor: ActorRef<DbMessage>,
    statements: Arc<AtomicU64>,
}

impl DbHandle {
    pub async fn count_rows(&self) -> Result<i64, PersistError> {
        ractor::call!(self.actor, DbMessage::CountRows)
            .map_err(|e| PersistError::Actor(format!("CountRows RPC failed: {e}")))?
    }

    pub async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<Person>, PersistError> {
        ractor::call!(self.actor, |reply| DbMessage::ListPage {
            limit,
            offset,
            reply
        })
        .map_err(|e| PersistError::Actor(format!("ListPage RPC failed: {e}")))?
    }

    pub async fn insert(&self, person: NewPerson) -> Result<i64, PersistError> {
        ractor::call!(self.actor, DbMessage::Insert, person)
            .map_err(|e| PersistError::Actor(format!("Insert RPC failed: {e}")))?
    }

    pub async fn update(&self, id: i64, person: NewPerson) -> Result<u64, PersistError> {
        ractor::call!(self.actor, DbMessage::Update, id, person)
            .map_err(|e| PersistError::Actor(format!("Update RPC failed: {e}")))?
    }

    pub async fn delete_one(&self, id: i64) -> Result<u64, PersistError> {
        ractor::call!(self.actor, DbMessage::DeleteOne, id)
            .map_err(|e| PersistError::Actor(format!("DeleteOne RPC failed: {e}")))?
    }

    pub async fn delete_all(&self) -> Result<u64, PersistError> {
        ractor::call!(self.actor, DbMessage::DeleteAll)
            .map_err(|e| PersistError::Actor(format!("DeleteAll RPC failed: {e}")))?
    }

    /// Total statements executed since the actor started, schema bootstrap included.
    pub fn statements_executed(&self) -> u64 {
        self.statements.load(Ordering::Relaxed)
    }

    /// Stop the actor; queued statements are dropped.
    pub fn shutdown(&self) {
        self.actor.stop(None);
    }
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbMessage;
    type State = PeopleStorage;
    type Arguments = PeopleStorage;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        storage: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        storage
            .init_schema()
            .await
            .map_err(|e| ActorProcessingErr::from(format!("schema bootstrap failed: {e}")))?;
        info!("people table ready");
        Ok(storage)
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        storage: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbMessage::CountRows(reply) => {
                let res = storage.count().await;
                respond("count", reply, res);
            }
            DbMessage::ListPage {
                limit,
                offset,
                reply,
            } => {
                let res = storage.list_page(limit, offset).await;
                respond("list", reply, res);
            }
            DbMessage::Insert(person, reply) => {
                let res = storage.insert(&person).await;
                respond("insert", reply, res);
            }
            DbMessage::Update(id, person, reply) => {
                let res = storage.update_by_id(id, &person).await;
                respond("update", reply, res);
            }
            DbMessage::DeleteOne(id, reply) => {
                let res = storage.delete_by_id(id).await;
                respond("delete", reply, res);
            }
            DbMessage::DeleteAll(reply) => {
                let res = storage.delete_all().await;
                respond("delete_all", reply, res);
            }
        }
        Ok(())
    }
}

fn respond<T>(statement: &str, reply: Reply<T>, res: Result<T, PersistError>)
where
    T: Send + 'static,
{
    if let Err(e) = &res {
        warn!(statement, error = %e, "statement failed");
    } else {
        debug!(statement, "statement executed");
    }
    // The caller may have gone away; the statement already ran either way.
    let _ = reply.send(res);
}

/// Open the database, bootstrap the schema and start the actor that owns it.
///
/// Returns only once the table exists, so every handle is usable immediately.
pub async fn spawn(database_url: &str) -> Result<DbHandle, PersistError> {
    let storage = PeopleStorage::connect(database_url).await?;
    let statements = storage.statement_counter();
    let (actor, _jh) = Actor::spawn(None, DbActor, storage)
        .await
        .map_err(|e| PersistError::Actor(format!("failed to spawn DbActor: {e}")))?;
    Ok(DbHandle { actor, statements })
}
