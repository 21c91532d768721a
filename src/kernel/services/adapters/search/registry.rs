//! provider 注册表：按注册顺序选出第一个能处理面板的工厂

use super::buffer::BufferSearchProvider;
use super::notebook::NotebookSearchProvider;
use super::output::OutputSearchProvider;
use crate::kernel::services::ports::search::{ProviderFactory, SearchProvider};
use crate::models::Panel;
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Changed,
}

/// `register` 返回的凭据，交回 `unregister` 即注销
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping the registration leaves the provider registered"]
pub struct ProviderRegistration {
    key: String,
    id: u64,
}

impl ProviderRegistration {
    pub fn key(&self) -> &str {
        &self.key
    }
}

struct Entry {
    key: String,
    id: u64,
    factory: ProviderFactory,
}

pub struct SearchProviderRegistry {
    entries: Vec<Entry>,
    next_id: u64,
    subscribers: Vec<Sender<RegistryEvent>>,
}

impl SearchProviderRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    /// notebook、editor、output 三个内置 provider
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let _ = registry.register("notebook", ProviderFactory::of::<NotebookSearchProvider>());
        let _ = registry.register("editor", ProviderFactory::of::<BufferSearchProvider>());
        let _ = registry.register("output", ProviderFactory::of::<OutputSearchProvider>());
        registry
    }

    /// 同名 key 原位替换
    pub fn register(&mut self, key: &str, factory: ProviderFactory) -> ProviderRegistration {
        let id = self.next_id;
        self.next_id += 1;
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.id = id;
                entry.factory = factory;
            }
            None => self.entries.push(Entry {
                key: key.to_string(),
                id,
                factory,
            }),
        }
        tracing::debug!(key, "search provider registered");
        self.emit(RegistryEvent::Changed);
        ProviderRegistration {
            key: key.to_string(),
            id,
        }
    }

    /// 凭据已被同名的新注册取代时不做任何事
    pub fn unregister(&mut self, registration: ProviderRegistration) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.key == registration.key && e.id == registration.id));
        let removed = self.entries.len() != before;
        if removed {
            tracing::debug!(key = %registration.key, "search provider unregistered");
            self.emit(RegistryEvent::Changed);
        }
        removed
    }

    pub fn provider_for_panel(&self, panel: &Panel) -> Option<Box<dyn SearchProvider>> {
        self.entries
            .iter()
            .find(|e| (e.factory.can_search_on)(panel))
            .map(|e| (e.factory.create)())
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn subscribe(&mut self) -> Receiver<RegistryEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: RegistryEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for SearchProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
