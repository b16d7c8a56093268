pub mod access;
pub mod appresult;
pub mod config;
pub mod error;
pub mod families;
pub mod genealogy;
pub mod invitations;
pub mod memorials;
pub mod privacy;
pub mod session;

use axum::{extract::FromRef, Router};
use sqlx::{Sqlite, SqlitePool, Transaction};

pub use appresult::{AppError, AppResult};
pub use config::Config;
pub use error::{CoreError, CoreResult, ErrorKind};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub invitation_ttl: InvitationTtl,
}

/// How long a freshly issued invitation stays actionable.
#[derive(Debug, Clone, Copy)]
pub struct InvitationTtl(pub time::Duration);

impl Default for InvitationTtl {
    fn default() -> Self {
        Self(time::Duration::days(30))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .nest(
            "/families",
            families::router()
                .merge(invitations::family_router())
                .merge(genealogy::router())
                .merge(memorials::router()),
        )
        .nest("/invitations", invitations::router())
        .nest("/privacy", privacy::router().merge(access::router()))
}

/// Current wall-clock time as unix seconds, the unit every timestamp column uses.
pub(crate) fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// Opens a write transaction holding SQLite's write lock from the first statement.
///
/// A deferred transaction that reads before it writes can deadlock against another
/// one doing the same; SQLite then fails one of them immediately instead of waiting
/// out the busy timeout.
pub(crate) async fn begin_write(db_pool: &SqlitePool) -> CoreResult<Transaction<'static, Sqlite>> {
    Ok(db_pool.begin_with("BEGIN IMMEDIATE").await?)
}
