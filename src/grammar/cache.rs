//! Cache of compiled grammars.
//!
//! Keyed by the fingerprint of the schema model they were compiled from, so
//! registering the same schemas again (or re-initializing the runtime) reuses
//! the existing grammars. Entries are immutable once inserted.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{GrammarSet, builder};
use crate::message::MessageType;
use crate::schema::SchemaModel;
use crate::{FastHashMap, Result};

#[derive(Debug, Default)]
pub struct GrammarCache {
    sets: RwLock<FastHashMap<u64, Arc<GrammarSet>>>,
    messages: RwLock<FastHashMap<(u64, MessageType), usize>>,
}

impl GrammarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grammars for `model`, compiled on the first miss. `fingerprint` must be
    /// `model.fingerprint()`.
    pub fn grammars(&self, model: &SchemaModel, fingerprint: u64) -> Result<Arc<GrammarSet>> {
        if let Some(set) = self.sets.read().get(&fingerprint) {
            return Ok(Arc::clone(set));
        }
        let mut sets = self.sets.write();
        // Ein anderer Thread kann inzwischen kompiliert haben
        if let Some(set) = sets.get(&fingerprint) {
            return Ok(Arc::clone(set));
        }
        log::debug!("grammar cache miss for {fingerprint:016x}");
        let set = Arc::new(builder::compile_with_fingerprint(model, fingerprint)?);
        sets.insert(fingerprint, Arc::clone(&set));
        Ok(set)
    }

    /// Root element index of `message` in `grammars`.
    pub fn message_root(&self, grammars: &GrammarSet, message: MessageType) -> Result<usize> {
        let key = (grammars.fingerprint(), message);
        if let Some(&index) = self.messages.read().get(&key) {
            return Ok(index);
        }
        let index = message.resolve(grammars)?;
        self.messages.write().insert(key, index);
        Ok(index)
    }

    /// Number of compiled grammar sets.
    pub fn len(&self) -> usize {
        self.sets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.sets.write().clear();
        self.messages.write().clear();
    }
}
