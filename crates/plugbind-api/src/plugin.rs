//! Plugin lifecycle.
//!
//! The host drives a plugin through start, enable, frame callbacks,
//! messages, disable and stop. [`Plugin`] is what a plugin implements;
//! [`PluginInstance`] holds a started plugin together with its context and
//! enforces the ordering between them.

use crate::context::PluginContext;
use crate::host::Host;
use plugbind_runtime::{BindingResult, PluginManifest};
use std::sync::Arc;
use tracing::{debug, info};

/// When the host should call `frame` next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NextCall {
    /// On the next frame.
    EveryFrame,
    /// After this many seconds.
    After(f32),
    /// After this many frames.
    Frames(u32),
    /// Not again until rescheduled.
    Stop,
}

impl NextCall {
    /// Encode as a host flight-loop interval: positive is seconds, negative
    /// is frames, zero stops the callback.
    pub fn as_interval(&self) -> f32 {
        match *self {
            NextCall::EveryFrame => -1.0,
            NextCall::After(seconds) => seconds.max(f32::MIN_POSITIVE),
            NextCall::Frames(frames) => -(frames.max(1) as f32),
            NextCall::Stop => 0.0,
        }
    }
}

/// Entry points a plugin implements.
///
/// Everything a plugin registers lives in its own fields, so dropping the
/// plugin unregisters all of it.
pub trait Plugin: Sized + Send {
    /// Build the plugin: create proxies, owned entries and commands.
    fn start(ctx: &PluginContext) -> BindingResult<Self>;

    /// The host enabled the plugin. Return `false` to refuse.
    fn enable(&mut self, _ctx: &PluginContext) -> bool {
        true
    }

    fn disable(&mut self, _ctx: &PluginContext) {}

    /// Message from another plugin or the host.
    fn receive_message(&mut self, _ctx: &PluginContext, _from: i32, _message: i32, _param: i64) {}

    /// Per-frame callback. `elapsed` is seconds since the previous call.
    fn frame(&mut self, _ctx: &PluginContext, _elapsed: f32, _counter: u64) -> NextCall {
        NextCall::Stop
    }

    /// Last call before the plugin is dropped.
    fn stop(self, _ctx: &PluginContext) {}
}

/// A started plugin and the context it runs in.
pub struct PluginInstance<P: Plugin> {
    // Declared before the context: the plugin's registrations go away
    // while the host and diagnostics are still alive.
    plugin: Option<P>,
    enabled: bool,
    ctx: PluginContext,
}

impl<P: Plugin> PluginInstance<P> {
    /// Create a context for `host` and start the plugin in it.
    pub fn start(host: Arc<dyn Host>, manifest: PluginManifest) -> BindingResult<Self> {
        Self::start_with(PluginContext::new(host, manifest))
    }

    /// Start the plugin in an existing context.
    pub fn start_with(ctx: PluginContext) -> BindingResult<Self> {
        Self::start_with_builder(ctx, P::start)
    }

    /// Start the plugin with a custom constructor, for plugins that need
    /// settings beyond the context.
    pub fn start_with_builder(
        ctx: PluginContext,
        build: impl FnOnce(&PluginContext) -> BindingResult<P>,
    ) -> BindingResult<Self> {
        info!(
            plugin = ctx.manifest().signature(),
            name = ctx.manifest().name(),
            "Starting plugin"
        );
        let plugin = build(&ctx)?;
        Ok(Self {
            plugin: Some(plugin),
            enabled: false,
            ctx,
        })
    }

    /// Enable frame delivery. Returns whether the plugin accepted.
    pub fn enable(&mut self) -> bool {
        if self.enabled {
            return true;
        }
        if let Some(plugin) = self.plugin.as_mut() {
            self.enabled = plugin.enable(&self.ctx);
        }
        info!(plugin = self.ctx.manifest().signature(), enabled = self.enabled, "Enable");
        self.enabled
    }

    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        if let Some(plugin) = self.plugin.as_mut() {
            plugin.disable(&self.ctx);
        }
        self.enabled = false;
        info!(plugin = self.ctx.manifest().signature(), "Disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Deliver a frame. Returns `None` while disabled.
    pub fn frame(&mut self, elapsed: f32, counter: u64) -> Option<NextCall> {
        if !self.enabled {
            return None;
        }
        let plugin = self.plugin.as_mut()?;
        Some(plugin.frame(&self.ctx, elapsed, counter))
    }

    /// Deliver an inter-plugin message.
    pub fn receive_message(&mut self, from: i32, message: i32, param: i64) {
        debug!(from, message, param, "Message received");
        if let Some(plugin) = self.plugin.as_mut() {
            plugin.receive_message(&self.ctx, from, message, param);
        }
    }

    /// Disable if needed, stop the plugin and drop it, then the context.
    pub fn stop(self) {
        drop(self);
    }

    pub fn plugin(&self) -> Option<&P> {
        self.plugin.as_ref()
    }

    pub fn plugin_mut(&mut self) -> Option<&mut P> {
        self.plugin.as_mut()
    }

    pub fn context(&self) -> &PluginContext {
        &self.ctx
    }
}

impl<P: Plugin> Drop for PluginInstance<P> {
    fn drop(&mut self) {
        self.disable();
        if let Some(plugin) = self.plugin.take() {
            plugin.stop(&self.ctx);
            info!(plugin = self.ctx.manifest().signature(), "Stopped plugin");
        }
    }
}
