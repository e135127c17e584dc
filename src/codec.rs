//! Speed and mode codec for a single device.
//!
//! The [`Codec`] sits between a controller speaking in rotation speed percentages
//! and a device speaking in speed steps `0..=7` plus a Turbo mode.
//! It tracks the last reported device mode and step, derives the reported
//! percentage and the operational state from them, and corrects the controller
//! when a Turbo request is not confirmed by the device in time.
//!
//! All methods take `&mut self`. The codec must be driven by a single owner,
//! e.g. the [`actor`](crate::actor) task.

use crate::{
    config::{Config, Topics},
    convert::{self, TURBO_STEP},
    property::{CurrentState, DeviceMode, Property, Value},
    reconcile::Reconciler,
};
use log::{debug, info, trace};
use tokio::time::Instant;

/// Outbound side of the codec.
///
/// Both methods are fire-and-forget.
pub trait Transport {
    /// Publishes a payload to a topic.
    fn publish(&mut self, topic: &str, payload: &str);

    /// Pushes a value for a controller-facing property.
    fn notify(&mut self, prop: Property, val: Value);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn publish(&mut self, topic: &str, payload: &str) {
        T::publish(self, topic, payload);
    }

    fn notify(&mut self, prop: Property, val: Value) {
        T::notify(self, prop, val);
    }
}

/// Properties decoded from messages on the mode state topic.
const MODE_PROPERTIES: &[Property] = &[Property::Active, Property::CurrentAirPurifierState];

/// Properties decoded from messages on the speed state topic.
const SPEED_PROPERTIES: &[Property] = &[Property::RotationSpeed];

/// Speed and mode codec for a single device.
#[derive(Debug)]
pub struct Codec<T> {
    transport: T,
    topics: Topics,
    mode: Option<DeviceMode>,
    step: Option<u8>,
    reconciler: Reconciler,
}

impl<T: Transport> Codec<T> {
    /// Creates a codec for one device.
    ///
    /// No device state is known until the first mode or speed report arrives.
    pub fn new(config: &Config, transport: T) -> Self {
        let codec = Self {
            transport,
            topics: config.topics.clone(),
            mode: None,
            step: None,
            reconciler: Reconciler::new(config.reconcile_delay()),
        };

        info!(
            "Codec initialized (Turbo reconciliation after {:?})",
            codec.reconciler.delay()
        );

        codec
    }

    /// Returns a reference to the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a mutable reference to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Returns the last reported device mode.
    #[must_use]
    pub fn mode(&self) -> Option<DeviceMode> {
        self.mode
    }

    /// Returns the last reported speed step.
    #[must_use]
    pub fn step(&self) -> Option<u8> {
        self.step
    }

    /// Returns the deadline of the pending Turbo reconciliation, if any.
    ///
    /// The owner has to call [`Codec::on_reconcile_timeout`] once it passes.
    #[must_use]
    pub fn reconcile_deadline(&self) -> Option<Instant> {
        self.reconciler.deadline()
    }

    /// Computes the operational state from the tracked mode and step.
    ///
    /// Modes `1` to `5` (including Turbo) need a known step: step 0 is idle,
    /// anything else purifies. Modes outside this range count as purifying.
    /// As a consequence, Turbo with a last known step of 0 reports
    /// [`CurrentState::Idle`] while the percentage reports 100 %.
    #[must_use]
    pub fn current_state(&self) -> Option<CurrentState> {
        let mode = self.mode?;

        if mode.is_off() {
            Some(CurrentState::Inactive)
        } else if mode.is_submode() {
            match self.step? {
                0 => Some(CurrentState::Idle),
                _ => Some(CurrentState::Purifying),
            }
        } else {
            Some(CurrentState::Purifying)
        }
    }

    /// Computes the rotation speed percentage to report to the controller.
    ///
    /// Turbo always reports 100 %, regardless of the last known step.
    #[must_use]
    pub fn reported_percent(&self) -> Option<u8> {
        if self.mode.is_some_and(DeviceMode::is_turbo) {
            return Some(100);
        }

        convert::step_to_percent(self.step?.into())
    }

    /// Handles a mode report from the device.
    ///
    /// Unparsable payloads leave the tracked mode unchanged. In any case, a pending
    /// reconciliation is cancelled if the device is in Turbo mode, and the
    /// derived values are pushed to the controller.
    pub fn on_mode_observed(&mut self, raw: &str) -> Option<DeviceMode> {
        let mode = DeviceMode::parse(raw);

        match mode {
            Some(mode) => self.mode = Some(mode),
            None => debug!("Ignoring invalid mode payload: {raw:?}"),
        }

        if self.mode.is_some_and(DeviceMode::is_turbo) && self.reconciler.cancel() {
            debug!("Turbo engaged, reconciliation cancelled");
        }

        self.emit_derived();

        mode
    }

    /// Handles a speed report from the device.
    ///
    /// The speed is clamped to `0..=7`. Unparsable payloads leave the tracked
    /// step unchanged. The derived values are pushed to the controller afterwards.
    pub fn on_speed_observed(&mut self, raw: &str) -> Option<u8> {
        let step = convert::parse_number(raw).and_then(convert::clamp_device_step);

        match step {
            Some(step) => self.step = Some(step),
            None => debug!("Ignoring invalid speed payload: {raw:?}"),
        }

        self.emit_derived();

        step
    }

    /// Pushes all derived values that are currently known to the controller.
    pub fn emit_derived(&mut self) {
        if let Some(state) = self.current_state() {
            self.transport
                .notify(Property::CurrentAirPurifierState, state.into());
        }

        if let Some(pct) = self.reported_percent() {
            self.transport.notify(Property::RotationSpeed, pct.into());
        }
    }

    /// Requests Turbo mode and arms the reconciliation deadline.
    ///
    /// Any pending deadline is replaced.
    pub fn request_turbo(&mut self) {
        publish_to(
            &mut self.transport,
            self.topics.set_active.as_deref(),
            &DeviceMode::TURBO.to_string(),
        );

        self.reconciler.arm();
    }

    /// Fires the pending reconciliation.
    ///
    /// If the device did not enter Turbo mode, the percentage derived from the
    /// actual device state is pushed to the controller. Does nothing if no
    /// reconciliation is pending.
    pub fn on_reconcile_timeout(&mut self) {
        if !self.reconciler.fire() || self.mode.is_some_and(DeviceMode::is_turbo) {
            return;
        }

        if let Some(pct) = self.reported_percent() {
            info!("Turbo not engaged, correcting rotation speed to {pct} %");
            self.transport.notify(Property::RotationSpeed, pct.into());
        } else {
            debug!("Turbo not engaged, but rotation speed is still unknown");
        }
    }

    /// Encodes a value set by the controller.
    ///
    /// Returns the payload the host should publish on the property's set topic,
    /// or [`None`] if publishing is suppressed. Rotation speeds are always
    /// suppressed, as the codec publishes mode and step itself.
    pub fn encode(&mut self, prop: Property, val: &Value) -> Option<Value> {
        match prop {
            Property::Active => Some(if val.is_truthy() { "1" } else { "0" }.into()),
            Property::RotationSpeed => {
                self.encode_rotation_speed(val, false);

                None
            }
            Property::CurrentAirPurifierState => Some(val.clone()),
        }
    }

    /// Encodes a value using the property name tag supplied by the host.
    ///
    /// This is the catch-all entry point for values not dispatched to
    /// [`Codec::encode`]. Rotation speeds take the same path as in
    /// [`Codec::encode`], all other values are passed through unchanged.
    pub fn encode_fallback(&mut self, tag: &str, val: Value) -> Option<Value> {
        if tag == <&str>::from(Property::RotationSpeed) {
            self.encode_rotation_speed(&val, true);

            return None;
        }

        Some(val)
    }

    fn encode_rotation_speed(&mut self, val: &Value, fallback: bool) {
        let Some(step) = val.as_number().and_then(convert::percent_to_step) else {
            debug!("Ignoring invalid rotation speed: {val}");
            return;
        };

        debug!(
            "{}Set rotation speed {val} % -> step {step}",
            if fallback { "(fallback) " } else { "" }
        );

        if step == TURBO_STEP {
            self.request_turbo();
        } else {
            publish_to(
                &mut self.transport,
                self.topics.set_active.as_deref(),
                &DeviceMode::NORMAL.to_string(),
            );
            publish_to(
                &mut self.transport,
                self.topics.set_rotation_speed.as_deref(),
                &step.to_string(),
            );
        }
    }

    /// Decodes a payload received for a property.
    ///
    /// Mode reports are decoded for [`Property::Active`] and
    /// [`Property::CurrentAirPurifierState`], speed reports for
    /// [`Property::RotationSpeed`]. Returns [`None`] if no value can be decoded.
    pub fn decode(&mut self, prop: Property, payload: &str) -> Option<Value> {
        match prop {
            Property::Active => self
                .on_mode_observed(payload)
                .map(|mode| (!mode.is_off()).into()),
            Property::RotationSpeed => {
                self.on_speed_observed(payload);
                self.reported_percent().map(Into::into)
            }
            Property::CurrentAirPurifierState => {
                self.on_mode_observed(payload);
                self.current_state().map(Into::into)
            }
        }
    }

    /// Encodes a controller value and publishes the result on the property's set topic.
    pub fn set(&mut self, prop: Property, val: &Value) {
        if let Some(encoded) = self.encode(prop, val) {
            self.publish_encoded(prop, &encoded);
        }
    }

    /// Like [`Codec::set`], but dispatches through [`Codec::encode_fallback`].
    ///
    /// Passed-through values are published on the set topic of the tagged
    /// property, if the tag names a known property.
    pub fn set_tagged(&mut self, tag: &str, val: Value) {
        if let Some(encoded) = self.encode_fallback(tag, val) {
            match tag.parse() {
                Ok(prop) => self.publish_encoded(prop, &encoded),
                Err(_) => trace!("No set topic for property {tag}"),
            }
        }
    }

    /// Handles a message received on a state topic.
    ///
    /// The payload is decoded for every property subscribed to the topic and
    /// each decoded value is pushed to the controller. Messages on other
    /// topics are ignored.
    pub fn receive(&mut self, topic: &str, payload: &str) {
        let props = self.subscriptions(topic);

        if props.is_empty() {
            trace!("Ignoring message on unknown topic {topic}");
        }

        for &prop in props {
            if let Some(val) = self.decode(prop, payload) {
                self.transport.notify(prop, val);
            }
        }
    }

    /// Returns the properties decoded from messages on a topic.
    #[must_use]
    pub fn subscriptions(&self, topic: &str) -> &'static [Property] {
        if self.topics.get_active.as_deref() == Some(topic) {
            MODE_PROPERTIES
        } else if self.topics.get_rotation_speed.as_deref() == Some(topic) {
            SPEED_PROPERTIES
        } else {
            &[]
        }
    }

    fn set_topic(&self, prop: Property) -> Option<&str> {
        match prop {
            Property::Active => self.topics.set_active.as_deref(),
            Property::RotationSpeed => self.topics.set_rotation_speed.as_deref(),
            Property::CurrentAirPurifierState => None,
        }
    }

    fn publish_encoded(&mut self, prop: Property, val: &Value) {
        let topic = self.set_topic(prop).map(str::to_string);

        publish_to(&mut self.transport, topic.as_deref(), &val.to_string());
    }
}

/// Publishes a payload if the topic is configured.
fn publish_to<T: Transport>(transport: &mut T, topic: Option<&str>, payload: &str) {
    match topic {
        Some(topic) => {
            trace!("Publishing {payload:?} to {topic}");
            transport.publish(topic, payload);
        }
        None => trace!("Skipping publish of {payload:?}, topic not configured"),
    }
}
