//! MAC-to-definition resolution.
//!
//! Glues the cache-wrapped backend lookup to the disambiguation and
//! unknown-MAC hooks. The resolver is deliberately small: policy lives in
//! the hooks, transport lives in the engine.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use backend::{BackendError, Definition};
use cache::DefinitionCache;
use engine::RequestMeta;
use hooks::Hooks;
use protocol::Packet;

/// What a lookup produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Known(Definition),
    Unknown,
}

pub struct Resolver {
    cache: Arc<DefinitionCache>,
    hooks: Arc<dyn Hooks>,
}

impl Resolver {
    pub fn new(cache: Arc<DefinitionCache>, hooks: Arc<dyn Hooks>) -> Self {
        Resolver { cache, hooks }
    }

    /// Flushes the cache and reinitialises the backend behind it.
    pub fn reinitialise(&self) -> Result<(), BackendError> {
        self.cache.reinitialise()
    }

    /// Resolves the request's MAC.
    ///
    /// Multi-record answers go through `filter_definitions`; an empty
    /// answer goes through `handle_unknown_mac`. Records that cannot be
    /// served are logged and treated as unknown, giving the hook its
    /// chance.
    pub fn resolve(
        &self,
        packet: &Packet,
        meta: &RequestMeta,
    ) -> Result<Resolution, BackendError> {
        let mut definitions = self.cache.lookup(&meta.mac)?;

        let definition = if definitions.len() > 1 {
            let hooks = self.hooks.to_owned();
            let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
                hooks.filter_definitions(definitions, meta)
            }));
            match outcome {
                Ok(definition) => definition,
                Err(_) => {
                    error!("filter_definitions hook panicked; treating {} as unknown", meta.mac);
                    None
                }
            }
        } else {
            definitions.pop()
        };

        let definition = match definition {
            Some(definition) => {
                if definition.is_well_formed() {
                    Some(definition)
                } else {
                    error!(
                        "Malformed definition for {} ({}:{}); treating the MAC as unknown",
                        meta.mac, definition.subnet, definition.serial
                    );
                    None
                }
            }
            None => None,
        };

        if let Some(definition) = definition {
            return Ok(Resolution::Known(definition));
        }

        let hooks = self.hooks.to_owned();
        let synthesised = panic::catch_unwind(AssertUnwindSafe(move || {
            hooks.handle_unknown_mac(packet, meta)
        }));
        match synthesised {
            Ok(Some(definition)) => {
                if definition.is_well_formed() {
                    Ok(Resolution::Known(definition))
                } else {
                    error!(
                        "handle_unknown_mac produced a malformed definition for {}",
                        meta.mac
                    );
                    Ok(Resolution::Unknown)
                }
            }
            Ok(None) => Ok(Resolution::Unknown),
            Err(_) => {
                error!("handle_unknown_mac hook panicked; treating {} as unknown", meta.mac);
                Ok(Resolution::Unknown)
            }
        }
    }
}
