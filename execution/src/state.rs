use anyhow::Result;
use hacknet_types::{Key, KeyKind, Value};
use std::{collections::HashMap, future::Future};

/// Durable record storage.
///
/// `apply` is the only write path the engine uses outside of tests. Implementations must make it
/// all-or-nothing: either every change lands or none does.
pub trait State {
    fn get(&self, key: &Key) -> impl Future<Output = Result<Option<Value>>>;
    fn insert(&mut self, key: Key, value: Value) -> impl Future<Output = Result<()>>;
    fn delete(&mut self, key: &Key) -> impl Future<Output = Result<()>>;

    /// Every stored record of one kind, in no particular order.
    fn scan(&self, kind: KeyKind) -> impl Future<Output = Result<Vec<(Key, Value)>>>;

    fn apply(&mut self, changes: Vec<(Key, Status)>) -> impl Future<Output = Result<()>> {
        async {
            for (key, status) in changes {
                match status {
                    Status::Update(value) => self.insert(key, value).await?,
                    Status::Delete => self.delete(&key).await?,
                }
            }
            Ok(())
        }
    }
}

/// In-memory backend. Infallible, so the default `apply` is atomic.
#[derive(Default)]
pub struct Memory {
    state: HashMap<Key, Value>,
}

impl Memory {
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

impl State for Memory {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.state.get(key).cloned())
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.state.insert(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.state.remove(key);
        Ok(())
    }

    async fn scan(&self, kind: KeyKind) -> Result<Vec<(Key, Value)>> {
        Ok(self
            .state
            .iter()
            .filter(|(key, _)| key.kind() == kind)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Status {
    Update(Value),
    Delete,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hacknet_types::{PlayerId, Value};

    #[tokio::test]
    async fn apply_inserts_and_deletes() {
        let mut memory = Memory::default();
        let first = PlayerId::random();
        let second = PlayerId::random();
        memory
            .insert(Key::Handle("neo".to_string()), Value::PlayerRef(first))
            .await
            .unwrap();

        memory
            .apply(vec![
                (Key::Handle("neo".to_string()), Status::Delete),
                (
                    Key::Handle("trinity".to_string()),
                    Status::Update(Value::PlayerRef(second)),
                ),
            ])
            .await
            .unwrap();

        assert!(memory
            .get(&Key::Handle("neo".to_string()))
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            memory
                .get(&Key::Handle("trinity".to_string()))
                .await
                .unwrap(),
            Some(Value::PlayerRef(second))
        );
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn scan_filters_by_kind() {
        let mut memory = Memory::default();
        memory
            .insert(
                Key::Handle("neo".to_string()),
                Value::PlayerRef(PlayerId::random()),
            )
            .await
            .unwrap();
        assert_eq!(memory.scan(KeyKind::Handle).await.unwrap().len(), 1);
        assert!(memory.scan(KeyKind::Player).await.unwrap().is_empty());
    }
}
