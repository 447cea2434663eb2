//! Memories for tests and the runner.

use lockstep_core::{BusResponse, BusSignals, Memory};
use log::trace;

/// Word-addressed RAM that acknowledges every request in the tick it becomes
/// visible.
///
/// Reads beyond the end return 0 and writes beyond the end are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleMemory {
    words: Vec<u32>,
}

impl SimpleMemory {
    /// Zero-filled memory of `words` 32-bit words.
    #[must_use]
    pub fn new(words: usize) -> Self {
        Self {
            words: vec![0; words],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Read a word without bus timing.
    #[must_use]
    pub fn peek(&self, address: u32) -> u32 {
        self.words.get(address as usize).copied().unwrap_or(0)
    }

    /// Write a word without bus timing.
    pub fn poke(&mut self, address: u32, value: u32) {
        if let Some(word) = self.words.get_mut(address as usize) {
            *word = value;
        }
    }

    /// Copy words starting at word address `address`.
    pub fn load(&mut self, address: u32, words: &[u32]) {
        for (offset, &value) in words.iter().enumerate() {
            self.poke(address + offset as u32, value);
        }
    }

    /// Copy 16-bit halves starting at halfword address `address`. The low
    /// half of each word comes first.
    pub fn load_halves(&mut self, address: u32, halves: &[u16]) {
        for (offset, &half) in halves.iter().enumerate() {
            let at = address + offset as u32;
            let shift = 16 * (at & 1);
            let word = self.peek(at >> 1);
            let word = (word & !(0xFFFF << shift)) | (u32::from(half) << shift);
            self.poke(at >> 1, word);
        }
    }
}

impl Memory for SimpleMemory {
    fn respond(&self, signals: &BusSignals) -> BusResponse {
        if signals.read_enable {
            BusResponse::ready(self.peek(signals.address))
        } else if signals.write_enable {
            BusResponse::written()
        } else {
            BusResponse::WAIT
        }
    }

    fn clock(&mut self, signals: &BusSignals, response: &BusResponse) {
        if signals.write_enable && response.ack {
            trace!("mem[{:#010X}] <- {:#010X}", signals.address, signals.data_out);
            self.poke(signals.address, signals.data_out);
        }
    }
}

/// Wraps another memory and holds off `ack` until a request has been stable
/// for `latency` ticks.
///
/// A request whose signals change, or that is withdrawn, starts counting
/// again from zero. With a latency of 0 it behaves like the inner memory.
#[derive(Debug, Clone)]
pub struct LatencyMemory<M> {
    inner: M,
    latency: u32,
    waited: u32,
    last: BusSignals,
}

impl<M: Memory> LatencyMemory<M> {
    #[must_use]
    pub const fn new(inner: M, latency: u32) -> Self {
        Self {
            inner,
            latency,
            waited: 0,
            last: BusSignals::IDLE,
        }
    }

    #[must_use]
    pub const fn inner(&self) -> &M {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut M {
        &mut self.inner
    }

    fn held(&self, signals: &BusSignals) -> u32 {
        if *signals == self.last { self.waited } else { 0 }
    }
}

impl<M: Memory> Memory for LatencyMemory<M> {
    fn respond(&self, signals: &BusSignals) -> BusResponse {
        if signals.is_active() && self.held(signals) >= self.latency {
            self.inner.respond(signals)
        } else {
            BusResponse::WAIT
        }
    }

    fn clock(&mut self, signals: &BusSignals, response: &BusResponse) {
        if !signals.is_active() || response.ack {
            self.waited = 0;
            self.last = BusSignals::IDLE;
        } else {
            self.waited = self.held(signals) + 1;
            self.last = *signals;
        }
        self.inner.clock(signals, response);
    }
}
