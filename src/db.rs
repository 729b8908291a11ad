use std::{fmt, str::FromStr};

use serde::Serialize;
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, SqlitePool};
use uuid::Uuid;

use crate::{clock, AppError, AppResult};

/// Recipient that makes a message visible to everyone.
pub const BROADCAST: &str = "Todos";

const SCHEMA: [&str; 2] = [
    r#"CREATE TABLE IF NOT EXISTS participants (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL UNIQUE,
        last_status INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS messages (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        from_name TEXT NOT NULL,
        to_name TEXT NOT NULL,
        text TEXT NOT NULL,
        type TEXT NOT NULL,
        time TEXT NOT NULL
    )"#,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    /// Last liveness signal, ms since epoch.
    pub last_status: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Message,
    PrivateMessage,
    Status,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        use MessageType::*;
        match self {
            Message => "message",
            PrivateMessage => "private_message",
            Status => "status",
        }
    }

    /// Parses a client-supplied type. `status` is reserved for the server.
    pub fn from_client(raw: &str) -> AppResult<MessageType> {
        match raw.parse() {
            Ok(MessageType::Status) | Err(_) => Err(AppError::InvalidType(raw.to_owned())),
            Ok(kind) => Ok(kind),
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(MessageType::Message),
            "private_message" => Ok(MessageType::PrivateMessage),
            "status" => Ok(MessageType::Status),
            other => Err(format!("unknown message type {other:?}")),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: String,
    pub from: String,
    pub to: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub time: String,
}

impl Message {
    pub fn is_visible_to(&self, user: &str) -> bool {
        self.to == BROADCAST || self.to == user || self.from == user
    }
}

type MessageRow = (String, String, String, String, String, String);

fn message_from_row((id, from, to, text, kind, time): MessageRow) -> Result<Message, sqlx::Error> {
    let kind = kind
        .parse::<MessageType>()
        .map_err(|err: String| sqlx::Error::Decode(err.into()))?;
    Ok(Message { id, from, to, text, kind, time })
}

/// Handle on the participant and message collections. Every call is a single statement;
/// nothing spans more than one row.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Store, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Store::with_pool(pool).await
    }

    /// Private database that lives as long as the store does.
    pub async fn in_memory() -> Result<Store, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Store::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Store, sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Store { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn insert_participant(&self, name: &str, last_status: i64) -> Result<Participant, sqlx::Error> {
        let id = Uuid::now_v7().to_string();
        sqlx::query("INSERT INTO participants (id,name,last_status) VALUES (?,?,?)")
            .bind(&id)
            .bind(name)
            .bind(last_status)
            .execute(&self.pool)
            .await?;

        Ok(Participant { id, name: name.to_owned(), last_status })
    }

    pub async fn find_participant(&self, name: &str) -> Result<Option<Participant>, sqlx::Error> {
        let row: Option<(String, String, i64)> =
            sqlx::query_as("SELECT id,name,last_status FROM participants WHERE name=?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, name, last_status)| Participant { id, name, last_status }))
    }

    pub async fn list_participants(&self) -> Result<Vec<Participant>, sqlx::Error> {
        let rows: Vec<(String, String, i64)> =
            sqlx::query_as("SELECT id,name,last_status FROM participants")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, last_status)| Participant { id, name, last_status })
            .collect())
    }

    /// Returns whether a participant with that name existed.
    pub async fn touch_participant(&self, name: &str, last_status: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE participants SET last_status=? WHERE name=?")
            .bind(last_status)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns whether a row was actually removed.
    pub async fn delete_participant(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM participants WHERE id=?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_message(
        &self,
        from: &str,
        to: &str,
        text: &str,
        kind: MessageType,
        at_ms: i64,
    ) -> Result<Message, sqlx::Error> {
        let message = Message {
            id: Uuid::now_v7().to_string(),
            from: from.to_owned(),
            to: to.to_owned(),
            text: text.to_owned(),
            kind,
            time: clock::hms(at_ms),
        };

        sqlx::query("INSERT INTO messages (id,from_name,to_name,text,type,time) VALUES (?,?,?,?,?,?)")
            .bind(&message.id)
            .bind(&message.from)
            .bind(&message.to)
            .bind(&message.text)
            .bind(kind.as_str())
            .bind(&message.time)
            .execute(&self.pool)
            .await?;

        Ok(message)
    }

    pub async fn find_message(&self, id: &str) -> Result<Option<Message>, sqlx::Error> {
        let row: Option<MessageRow> =
            sqlx::query_as("SELECT id,from_name,to_name,text,type,time FROM messages WHERE id=?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(message_from_row).transpose()
    }

    /// Messages `user` may see, oldest first. With a limit, only the most recent `limit` of them.
    pub async fn list_visible_messages(&self, user: &str, limit: Option<u32>) -> Result<Vec<Message>, sqlx::Error> {
        // sqlite reads a negative LIMIT as "no limit"
        let limit = limit.map(i64::from).unwrap_or(-1);

        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"SELECT id,from_name,to_name,text,type,time FROM messages
               WHERE to_name=?1 OR to_name=?2 OR from_name=?2
               ORDER BY seq DESC
               LIMIT ?3"#,
        )
            .bind(BROADCAST)
            .bind(user)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut messages = rows
            .into_iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    /// Returns whether the message still existed.
    pub async fn update_message(&self, id: &str, to: &str, text: &str, kind: MessageType) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE messages SET to_name=?, text=?, type=? WHERE id=?")
            .bind(to)
            .bind(text)
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_message(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM messages WHERE id=?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
