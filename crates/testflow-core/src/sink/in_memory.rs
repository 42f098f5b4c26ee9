use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{PersistedResult, ResultSink};
use crate::errors::SinkError;
use crate::model::{ContainerResult, FixtureResult, TestResult};

/// Sink en memoria. Útil para tests y para adapters que renderizan en el
/// mismo proceso.
#[derive(Debug, Default)]
pub struct InMemoryResultSink {
    attachments: DashMap<String, Vec<u8>>,
    tests: DashMap<Uuid, TestResult>,
    fixtures: DashMap<Uuid, FixtureResult>,
    containers: DashMap<Uuid, ContainerResult>,
}

impl InMemoryResultSink {
    pub fn new() -> Self { Self::default() }

    pub fn test(&self, uuid: Uuid) -> Option<TestResult> { self.tests.get(&uuid).map(|t| t.clone()) }

    pub fn tests(&self) -> Vec<TestResult> { self.tests.iter().map(|t| t.value().clone()).collect() }

    /// Tests persistidos con ese nombre (puede haber varios).
    pub fn tests_named(&self, name: &str) -> Vec<TestResult> {
        self.tests.iter().filter(|t| t.item.name == name).map(|t| t.value().clone()).collect()
    }

    pub fn fixture(&self, uuid: Uuid) -> Option<FixtureResult> { self.fixtures.get(&uuid).map(|f| f.clone()) }

    pub fn fixtures(&self) -> Vec<FixtureResult> { self.fixtures.iter().map(|f| f.value().clone()).collect() }

    pub fn container(&self, uuid: Uuid) -> Option<ContainerResult> { self.containers.get(&uuid).map(|c| c.clone()) }

    pub fn attachment(&self, key: &str) -> Option<Vec<u8>> { self.attachments.get(key).map(|a| a.clone()) }

    pub fn attachment_keys(&self) -> Vec<String> { self.attachments.iter().map(|a| a.key().clone()).collect() }
}

impl ResultSink for InMemoryResultSink {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), SinkError> {
        match self.attachments.entry(key.to_string()) {
            Entry::Occupied(_) => Err(SinkError::Other(format!("attachment key reused: {key}"))),
            Entry::Vacant(slot) => {
                slot.insert(bytes.to_vec());
                Ok(())
            }
        }
    }

    fn persist(&self, item: PersistedResult) -> Result<(), SinkError> {
        match item {
            PersistedResult::Test(t) => {
                self.tests.insert(t.uuid, t);
            }
            PersistedResult::Fixture(f) => {
                self.fixtures.insert(f.uuid, f);
            }
            PersistedResult::Container(c) => {
                self.containers.insert(c.uuid, c);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reused_attachment_key_is_rejected() {
        let sink = InMemoryResultSink::new();
        assert!(sink.write("k-attachment.txt", b"a").is_ok());
        assert!(matches!(sink.write("k-attachment.txt", b"b"), Err(SinkError::Other(_))));
        assert_eq!(sink.attachment("k-attachment.txt"), Some(b"a".to_vec()));
    }
}
