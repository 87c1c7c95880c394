use crate::{Body, Chunks, Error, List, Store};
use bytes::{Bytes, BytesMut};
use futures::{stream, StreamExt};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

/// Default size of chunks returned by [Memory::open].
const DEFAULT_CHUNK_SIZE: usize = 4096;

/// A [Store] that keeps objects in memory.
///
/// Clones share the same objects.
#[derive(Clone)]
pub struct Memory {
    objects: Arc<Mutex<BTreeMap<String, Bytes>>>,
    commits: Arc<Mutex<Vec<String>>>,
    chunk_size: usize,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a store whose bodies are read back in chunks of `chunk_size` bytes.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            objects: Arc::default(),
            commits: Arc::default(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Insert an object directly, without recording a commit.
    pub fn put(&self, name: &str, data: Bytes) {
        self.objects.lock().unwrap().insert(name.to_string(), data);
    }

    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().remove(name)
    }

    /// Names of objects committed through [Store::write], in commit order.
    pub fn commits(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }
}

impl Store for Memory {
    async fn exists(&self, name: &str) -> Result<bool, Error> {
        Ok(self.objects.lock().unwrap().contains_key(name))
    }

    async fn open(&self, name: &str) -> Result<Body, Error> {
        let data = self
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let chunks = (0..data.len())
            .step_by(self.chunk_size)
            .map(|start| Ok(data.slice(start..(start + self.chunk_size).min(data.len()))))
            .collect::<Vec<_>>();
        Ok(stream::iter(chunks).boxed())
    }

    async fn write<B: Chunks>(&self, name: &str, mut body: B) -> Result<(), Error> {
        let mut data = BytesMut::new();
        while let Some(chunk) = body.next().await {
            data.extend_from_slice(&chunk?);
        }
        self.objects
            .lock()
            .unwrap()
            .insert(name.to_string(), data.freeze());
        self.commits.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

impl List for Memory {
    async fn list(&self) -> Result<Vec<String>, Error> {
        Ok(self.objects.lock().unwrap().keys().cloned().collect())
    }
}
