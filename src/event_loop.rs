//! calloop integration
//!
//! Platform events are pushed through a calloop channel into the
//! [`WindowRegistry`]; queued check-resize passes run as idle callbacks once
//! the events of a dispatch have been handled.

use anyhow::{anyhow, Context, Result};
use calloop::channel::{self, Channel, Sender};
use calloop::{EventLoop, LoopHandle};
use log::{debug, trace, warn};
use std::time::Duration;

use crate::platform::{PlatformEvent, PlatformEventSource};
use crate::registry::WindowRegistry;

/// Upper bound on dispatch rounds in [`EventPump::run_until_idle`]
pub const MAX_SETTLE_ROUNDS: usize = 256;

fn schedule_idle(handle: &LoopHandle<'static, WindowRegistry>) {
    handle.insert_idle(|registry| {
        let handled = registry.run_idle();
        trace!("Idle callback ran {} check-resize pass(es)", handled);
    });
}

/// Event loop driving one registry
pub struct EventPump {
    event_loop: EventLoop<'static, WindowRegistry>,
    sender: Sender<PlatformEvent>,
}

impl EventPump {
    pub fn new() -> Result<Self> {
        let event_loop: EventLoop<'static, WindowRegistry> =
            EventLoop::try_new().context("Failed to create event loop")?;
        let (sender, receiver): (Sender<PlatformEvent>, Channel<PlatformEvent>) = channel::channel();

        let handle = event_loop.handle();
        let idle_handle = handle.clone();
        handle
            .insert_source(receiver, move |event, _, registry: &mut WindowRegistry| {
                match event {
                    channel::Event::Msg(event) => {
                        registry.handle_event(event);
                        if registry.has_pending_resizes() {
                            schedule_idle(&idle_handle);
                        }
                    }
                    channel::Event::Closed => debug!("Platform event channel closed"),
                }
            })
            .map_err(|e| anyhow!("Failed to register platform event channel: {}", e.error))?;

        Ok(Self { event_loop, sender })
    }

    /// Sender for platform events; backends running elsewhere push through a clone of it
    pub fn sender(&self) -> Sender<PlatformEvent> {
        self.sender.clone()
    }

    pub fn handle(&self) -> LoopHandle<'static, WindowRegistry> {
        self.event_loop.handle()
    }

    /// Run one dispatch, waiting at most `timeout` for events
    pub fn dispatch(&mut self, registry: &mut WindowRegistry, timeout: Option<Duration>) -> Result<()> {
        if registry.has_pending_resizes() {
            schedule_idle(&self.event_loop.handle());
        }
        self.event_loop
            .dispatch(timeout, registry)
            .context("Event loop dispatch failed")
    }

    /// Forward everything `source` has queued and dispatch until neither events nor
    /// check-resize passes remain. Returns the number of rounds that did work.
    pub fn run_until_idle(
        &mut self,
        registry: &mut WindowRegistry,
        source: &mut dyn PlatformEventSource,
    ) -> Result<usize> {
        for round in 0..MAX_SETTLE_ROUNDS {
            let mut forwarded = 0;
            while let Some(event) = source.poll_event() {
                self.sender
                    .send(event)
                    .map_err(|_| anyhow!("Platform event channel closed"))?;
                forwarded += 1;
            }

            let pending = registry.has_pending_resizes();
            if forwarded == 0 && !pending {
                return Ok(round);
            }
            trace!("Round {}: {} event(s), resizes pending: {}", round, forwarded, pending);
            self.dispatch(registry, Some(Duration::ZERO))?;
        }

        warn!(
            "Windows still negotiating after {} rounds; giving up",
            MAX_SETTLE_ROUNDS
        );
        Ok(MAX_SETTLE_ROUNDS)
    }
}
