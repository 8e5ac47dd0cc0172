use crate::error::Result;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// Key layout shared by everything that persists interview data.
pub mod keys {
    pub fn session(session_id: &str) -> String {
        format!("session:{session_id}")
    }

    /// List of a user's session ids, newest first.
    pub fn user_sessions(user_id: &str) -> String {
        format!("user:{user_id}:sessions")
    }

    pub fn knowledge(user_id: &str) -> String {
        format!("knowledge:{user_id}")
    }
}

/// The narrow key-value contract the interview core needs from its store.
///
/// List operations follow Redis semantics: `list_push` prepends, and
/// `list_range` takes inclusive bounds where negative indices count from the end.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn list_push(&self, key: &str, value: &str) -> Result<()>;

    async fn list_range(&self, key: &str, start: isize, end: isize) -> Result<Vec<String>>;

    /// Appends `value` to the array under `field` of the JSON object at `key`
    /// as a single atomic step, creating the object and the array as needed.
    async fn json_array_push(&self, key: &str, field: &str, value: f64) -> Result<()>;
}

// Runs inside Redis so concurrent appends for one user never overwrite each other.
const JSON_ARRAY_PUSH: &str = r#"
local raw = redis.call('GET', KEYS[1])
local doc = {}
if raw then doc = cjson.decode(raw) end
local list = doc[ARGV[1]]
if type(list) ~= 'table' then list = {} end
table.insert(list, tonumber(ARGV[2]))
doc[ARGV[1]] = list
redis.call('SET', KEYS[1], cjson.encode(doc))
return #list
"#;

/// A `Store` backed by Redis through a multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Connected to Redis at {}", url);
        Ok(Self { conn })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn list_range(&self, key: &str, start: isize, end: isize) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.lrange::<_, Vec<String>>(key, start, end).await?)
    }

    async fn json_array_push(&self, key: &str, field: &str, value: f64) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::Script::new(JSON_ARRAY_PUSH)
            .key(key)
            .arg(field)
            .arg(value.to_string())
            .invoke_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }
}

/// An in-process `Store` used by tests and the console coach.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    lists: Mutex<HashMap<String, VecDeque<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<()> {
        self.lists
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .push_front(value.to_string());
        Ok(())
    }

    async fn list_range(&self, key: &str, start: isize, end: isize) -> Result<Vec<String>> {
        let lists = self.lists.lock().await;
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        Ok(match redis_bounds(list.len(), start, end) {
            Some((from, to)) => list.range(from..=to).cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn json_array_push(&self, key: &str, field: &str, value: f64) -> Result<()> {
        let mut values = self.values.lock().await;
        let mut doc = match values.get(key) {
            Some(raw) => serde_json::from_str::<serde_json::Map<String, Value>>(raw)?,
            None => serde_json::Map::new(),
        };
        let entry = doc
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(Value::from(value)),
            other => *other = Value::Array(vec![Value::from(value)]),
        }
        values.insert(key.to_string(), serde_json::to_string(&doc)?);
        Ok(())
    }
}

// Resolves LRANGE-style bounds to an inclusive index range, if non-empty.
fn redis_bounds(len: usize, start: isize, end: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let end = if end < 0 { end + len } else { end.min(len - 1) };
    if len == 0 || start > end || start >= len {
        return None;
    }
    Some((start as usize, end as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips_values() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn list_push_prepends() {
        let store = MemoryStore::new();
        for v in ["a", "b", "c"] {
            store.list_push("l", v).await.unwrap();
        }
        assert_eq!(store.list_range("l", 0, -1).await.unwrap(), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn list_range_follows_redis_index_rules() {
        let store = MemoryStore::new();
        for v in ["e", "d", "c", "b", "a"] {
            store.list_push("l", v).await.unwrap();
        }
        assert_eq!(store.list_range("l", 1, 2).await.unwrap(), vec!["b", "c"]);
        assert_eq!(store.list_range("l", -2, -1).await.unwrap(), vec!["d", "e"]);
        assert_eq!(store.list_range("l", 3, 100).await.unwrap(), vec!["d", "e"]);
        assert_eq!(store.list_range("l", -100, 0).await.unwrap(), vec!["a"]);
        assert!(store.list_range("l", 4, 1).await.unwrap().is_empty());
        assert!(store.list_range("l", 10, 20).await.unwrap().is_empty());
        assert!(store.list_range("missing", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn json_array_push_creates_and_extends() {
        let store = MemoryStore::new();
        store.json_array_push("k", "algorithms", 3.0).await.unwrap();
        store.json_array_push("k", "algorithms", 4.5).await.unwrap();
        store.json_array_push("k", "leadership", 7.0).await.unwrap();
        let doc: Value = serde_json::from_str(&store.get("k").await.unwrap().unwrap()).unwrap();
        assert_eq!(
            doc,
            serde_json::json!({"algorithms": [3.0, 4.5], "leadership": [7.0]})
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_json_array_pushes_are_all_kept() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.json_array_push("k", "algorithms", f64::from(i % 10)).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        let doc: Value = serde_json::from_str(&store.get("k").await.unwrap().unwrap()).unwrap();
        assert_eq!(doc["algorithms"].as_array().unwrap().len(), 50);
    }

    // Requires a running Redis. Run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn redis_store_round_trip() {
        dotenvy::dotenv().ok();
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let store = RedisStore::connect(&url).await.expect("redis should be reachable");
        let key = format!("forge-test:{}", uuid::Uuid::new_v4());
        store.set(&key, "value").await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("value"));

        let doc_key = format!("forge-test:{}", uuid::Uuid::new_v4());
        store.json_array_push(&doc_key, "algorithms", 3.0).await.unwrap();
        store.json_array_push(&doc_key, "algorithms", 4.5).await.unwrap();
        let doc: HashMap<String, Vec<f64>> =
            serde_json::from_str(&store.get(&doc_key).await.unwrap().unwrap()).unwrap();
        assert_eq!(doc["algorithms"], vec![3.0, 4.5]);
    }
}
