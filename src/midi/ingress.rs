//! Packet ingress: the single entry point a MIDI transport feeds.
//!
//! The transport owns device enumeration and connection entirely; all this
//! core sees is raw byte packets (or, for programmatic control, ready-made
//! commands).

use std::sync::Arc;

use super::{decoder::MidiDecoder, router::CommandRouter, MidiCommand};

/// Decodes incoming packets and dispatches the resulting commands into the
/// shared router.
pub struct MidiIngress {
    decoder: MidiDecoder,
    router: Arc<CommandRouter>,
}

impl MidiIngress {
    pub fn new(router: Arc<CommandRouter>) -> Self {
        Self {
            decoder: MidiDecoder::new(),
            router,
        }
    }

    /// Decode one raw packet and route every command it contains.
    pub fn handle_packet(&mut self, bytes: &[u8]) {
        let router = &self.router;
        self.decoder.decode(bytes, |command| router.dispatch(command));
    }

    /// Route an already-structured command, bypassing the decoder. Used by
    /// virtual keyboards and tests.
    pub fn handle_command(&self, command: MidiCommand) {
        self.router.dispatch(command);
    }

    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }
}
