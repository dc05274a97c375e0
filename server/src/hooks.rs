//! Embedder extension points.
//!
//! Three filter points feed the engine, plus the disambiguator for
//! backends that return several records for one MAC. All have total
//! defaults, so `DefaultHooks` yields a server that answers exactly what
//! the backing store says. Hooks run synchronously on the engine's
//! request path and must not block indefinitely; a panic inside a hook is
//! caught by the engine and treated as a denial.

use std::net::SocketAddr;

use backend::Definition;
use engine::RequestMeta;
use protocol::Packet;

/// The outcome of the `filter` hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Process the request.
    Accept,
    /// Drop the request and penalise the source.
    Reject,
    /// Drop the request silently.
    Ignore,
}

pub trait Hooks: Send + Sync {
    /// Runs before resolution; the place for source policy beyond the
    /// built-in relay rules.
    fn filter(&self, _packet: &Packet, _meta: &RequestMeta) -> Verdict {
        Verdict::Accept
    }

    /// Reduces a multi-record lookup to at most one definition.
    ///
    /// The default keeps the first record the store returned and says so,
    /// since no precedence rule is universally right.
    fn filter_definitions(
        &self,
        mut definitions: Vec<Definition>,
        meta: &RequestMeta,
    ) -> Option<Definition> {
        if definitions.is_empty() {
            return None;
        }
        if definitions.len() > 1 {
            warn!(
                "{} records for {}; keeping the first ({}:{})",
                definitions.len(),
                meta.mac,
                definitions[0].subnet,
                definitions[0].serial
            );
        }
        Some(definitions.remove(0))
    }

    /// May synthesise a definition for a MAC the store does not know;
    /// this is where dynamic provisioning plugs in.
    fn handle_unknown_mac(&self, _packet: &Packet, _meta: &RequestMeta) -> Option<Definition> {
        None
    }

    /// Runs on the finished OFFER/ACK before transmission; may mutate the
    /// response (PXE options, overrides) or return `false` to suppress it.
    fn load(
        &self,
        _response: &mut Packet,
        _meta: &RequestMeta,
        _definition: &Definition,
        _source: SocketAddr,
    ) -> bool {
        true
    }
}

/// The total defaults: allow, first record, nobody, allow.
pub struct DefaultHooks;

impl Hooks for DefaultHooks {}
