//! Runtime context: lifecycle, registered schemas, options.
//!
//! A [`Runtime`] is an explicit context object. Tests create as many
//! independent instances as they need; the [`crate::api`] facade holds one
//! process-global instance.
//!
//! Encode and decode calls hold shared access to the state for their whole
//! duration, so they run in parallel and always see one consistent schema
//! model. Registration, options and shutdown take exclusive access.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::grammar::{GrammarCache, GrammarSet};
use crate::message::MessageType;
use crate::options::{CodecOptions, RuntimeOption};
use crate::schema::SchemaModel;
use crate::{Error, Result, bridge, decoder, encoder, xml, xml_serializer, xsd};

/// Crate version (`CARGO_PKG_VERSION`).
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[derive(Debug, Default)]
struct State {
    model: SchemaModel,
    /// Fingerprint of `model`, computed once per registration.
    fingerprint: u64,
    options: CodecOptions,
}

#[derive(Debug, Default)]
pub struct Runtime {
    state: RwLock<Option<State>>,
    cache: GrammarCache,
}

impl Runtime {
    /// A runtime that is not yet initialized.
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: a running runtime keeps its schemas and options.
    pub fn initialize(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.is_some() {
            log::debug!("runtime already initialized");
            return Ok(());
        }
        *state = Some(State::default());
        log::debug!("runtime initialized (v{})", version());
        Ok(())
    }

    /// Drops the registered schemas and resets all options. Compiled
    /// grammars stay cached for a later [`initialize`](Self::initialize).
    /// Nothing to do when not running.
    pub fn shutdown(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.take().is_some() {
            log::debug!("runtime shut down");
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().is_some()
    }

    /// Loads schema files and directories and merges them into the active
    /// model; later declarations replace earlier ones with the same name.
    ///
    /// Every path is loaded and the merged model compiled before anything
    /// changes. On error the active model is left as it was.
    pub fn register_schemas<P: AsRef<Path>>(&self, paths: &[P]) -> Result<()> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        let loaded = xsd::load_schema_paths(paths)?;

        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(Error::NotInitialized)?;
        let mut next = state.model.clone();
        let report = next.merge(loaded);
        let fingerprint = next.fingerprint();
        self.cache.grammars(&next, fingerprint)?;
        state.model = next;
        state.fingerprint = fingerprint;
        log::debug!(
            "registered {} path(s): {} declaration(s) added, {} replaced",
            paths.len(),
            report.added,
            report.replaced
        );
        Ok(())
    }

    /// Parses and applies a string-keyed option.
    pub fn set_option(&self, name: &str, value: &str) -> Result<()> {
        let option = RuntimeOption::parse(name, value)?;
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(Error::NotInitialized)?;
        if let RuntimeOption::LogLevel(level) = option {
            log::set_max_level(level);
        }
        state.options.apply(&option);
        log::debug!("option {} = {value}", option.name());
        Ok(())
    }

    pub fn options(&self) -> Result<CodecOptions> {
        let guard = self.state.read();
        guard.as_ref().map(|s| s.options).ok_or(Error::NotInitialized)
    }

    // ========================================================================
    // Codec operations
    // ========================================================================

    /// XML text → EXI.
    pub fn encode_xml(&self, xml: &str) -> Result<Vec<u8>> {
        self.with_grammars(|grammars, _| {
            let document = xml::parse_document(xml)?;
            encoder::encode(grammars, &document)
        })
    }

    /// EXI → XML text.
    pub fn decode_exi(&self, exi: &[u8]) -> Result<String> {
        self.with_grammars(|grammars, options| {
            let document = decoder::decode(grammars, exi, options)?;
            Ok(xml_serializer::to_xml(&document, options))
        })
    }

    /// JSON content of `message` → EXI.
    pub fn encode_struct(&self, message: MessageType, json: &[u8]) -> Result<Vec<u8>> {
        self.with_grammars(|grammars, _| {
            let root = self.cache.message_root(grammars, message)?;
            bridge::encode_struct(grammars, root, json)
        })
    }

    /// EXI → JSON content of `message`. The stream must carry that message.
    pub fn decode_struct(&self, message: MessageType, exi: &[u8]) -> Result<Vec<u8>> {
        self.with_grammars(|grammars, options| {
            let root = self.cache.message_root(grammars, message)?;
            bridge::decode_struct(grammars, root, exi, options)
        })
    }

    /// Grammars of the active model.
    pub fn grammars(&self) -> Result<Arc<GrammarSet>> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(Error::NotInitialized)?;
        self.compiled(state)
    }

    fn compiled(&self, state: &State) -> Result<Arc<GrammarSet>> {
        if state.model.is_empty() {
            return Err(Error::NoSchemaRegistered);
        }
        self.cache.grammars(&state.model, state.fingerprint)
    }

    fn with_grammars<T>(&self, f: impl FnOnce(&GrammarSet, &CodecOptions) -> Result<T>) -> Result<T> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(Error::NotInitialized)?;
        let grammars = self.compiled(state)?;
        f(&grammars, &state.options)
    }
}
