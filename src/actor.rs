//! Asynchronous owner task for a [`Codec`].
//!
//! The actor serializes all requests for one device and sleeps until the
//! codec's reconciliation deadline in between. Requests are submitted
//! through a cloneable [`Handle`]. The task ends once all handles are dropped.
//!
//! Each device gets its own actor. Actors do not share any state.

use crate::{Codec, Error, Property, Result, Transport, Value};
use log::{debug, trace};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
    time,
};

/// Request processed by the actor.
#[derive(Debug)]
pub enum Request {
    /// The controller set a property value.
    Set(Property, Value),
    /// The host dispatched a value through its catch-all encoder.
    SetTagged(String, Value),
    /// A message arrived on a subscribed topic.
    Receive {
        /// Topic the message arrived on.
        topic: String,
        /// Raw payload.
        payload: String,
    },
}

/// Message emitted by a [`Codec`] using the [`UnboundedSender<Output>`] transport.
#[derive(PartialEq, Clone, Debug)]
pub enum Output {
    /// Payload to publish to a topic.
    Publish {
        /// Destination topic.
        topic: String,
        /// Payload.
        payload: String,
    },
    /// Value pushed to the controller.
    Notify(Property, Value),
}

impl Transport for UnboundedSender<Output> {
    fn publish(&mut self, topic: &str, payload: &str) {
        let out = Output::Publish {
            topic: topic.into(),
            payload: payload.into(),
        };

        if self.send(out).is_err() {
            trace!("Output receiver dropped, discarding publish to {topic}");
        }
    }

    fn notify(&mut self, prop: Property, val: Value) {
        if self.send(Output::Notify(prop, val)).is_err() {
            trace!("Output receiver dropped, discarding {prop} notification");
        }
    }
}

/// Cloneable handle for submitting requests to an actor.
#[derive(Clone, Debug)]
pub struct Handle {
    tx: UnboundedSender<Request>,
}

impl Handle {
    /// Submits a request.
    ///
    /// # Errors
    ///
    /// - [`Error::ActorStopped`] if the actor task is no longer running.
    pub fn send(&self, req: Request) -> Result<()> {
        self.tx.send(req).map_err(|_| Error::ActorStopped)
    }

    /// Sets a property value, see [`Codec::set`].
    pub fn set(&self, prop: Property, val: impl Into<Value>) -> Result<()> {
        self.send(Request::Set(prop, val.into()))
    }

    /// Sets a value through the catch-all encoder, see [`Codec::set_tagged`].
    pub fn set_tagged(&self, tag: &str, val: impl Into<Value>) -> Result<()> {
        self.send(Request::SetTagged(tag.into(), val.into()))
    }

    /// Delivers a message received on a topic, see [`Codec::receive`].
    pub fn receive(&self, topic: &str, payload: &str) -> Result<()> {
        self.send(Request::Receive {
            topic: topic.into(),
            payload: payload.into(),
        })
    }
}

/// Task owning a [`Codec`].
pub struct Actor<T> {
    codec: Codec<T>,
}

impl<T: Transport + Send + 'static> Actor<T> {
    /// Spawns an actor task owning `codec` on the current tokio runtime.
    ///
    /// Returns a handle for submitting requests and the task's join handle,
    /// which resolves to the codec once all handles have been dropped.
    pub fn spawn(codec: Codec<T>) -> (Handle, JoinHandle<Codec<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Self { codec }.run(rx));

        (Handle { tx }, task)
    }

    async fn run(mut self, mut rx: UnboundedReceiver<Request>) -> Codec<T> {
        loop {
            let deadline = self.codec.reconcile_deadline();

            // Requests take priority, so a Turbo report arriving together with
            // the deadline still cancels the correction
            tokio::select! {
                biased;

                req = rx.recv() => match req {
                    Some(req) => self.handle(req),
                    None => break,
                },
                () = time::sleep_until(deadline.unwrap_or_else(time::Instant::now)),
                    if deadline.is_some() => self.codec.on_reconcile_timeout(),
            }
        }

        debug!("All handles dropped, stopping actor");

        self.codec
    }

    fn handle(&mut self, req: Request) {
        trace!("Handling request: {req:?}");

        match req {
            Request::Set(prop, val) => self.codec.set(prop, &val),
            Request::SetTagged(tag, val) => self.codec.set_tagged(&tag, val),
            Request::Receive { topic, payload } => self.codec.receive(&topic, &payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CurrentState, tests::init_logger, tests::test_config};
    use core::time::Duration;

    fn spawn() -> (Handle, JoinHandle<Codec<UnboundedSender<Output>>>, UnboundedReceiver<Output>) {
        init_logger();

        let (tx, rx) = mpsc::unbounded_channel();
        let (handle, task) = Actor::spawn(Codec::new(&test_config(), tx));

        (handle, task, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<Output>) -> Vec<Output> {
        let mut out = Vec::new();

        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }

        out
    }

    fn publish(topic: &str, payload: &str) -> Output {
        Output::Publish {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_turbo_is_corrected() -> Result<()> {
        let (handle, _task, mut rx) = spawn();

        handle.receive("state/mode", "1")?;
        handle.receive("state/speed", "2")?;
        handle.set(Property::RotationSpeed, 100u8)?;
        time::sleep(Duration::from_millis(10)).await;

        let out = drain(&mut rx);

        assert_eq!(
            out.last(),
            Some(&publish("control/mode", "4")),
            "Turbo mode should be requested"
        );

        time::sleep(Duration::from_millis(980)).await;

        assert!(drain(&mut rx).is_empty(), "correction should not fire early");

        time::sleep(Duration::from_millis(20)).await;

        assert_eq!(
            drain(&mut rx),
            [Output::Notify(Property::RotationSpeed, 25u8.into())],
            "actual speed should be pushed once"
        );

        time::sleep(Duration::from_secs(5)).await;

        assert!(drain(&mut rx).is_empty(), "correction should not repeat");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_turbo_cancels_correction() -> Result<()> {
        let (handle, _task, mut rx) = spawn();

        handle.set(Property::RotationSpeed, 100u8)?;
        time::sleep(Duration::from_millis(500)).await;
        handle.receive("state/mode", "4")?;
        time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            drain(&mut rx),
            [
                publish("control/mode", "4"),
                // Derived and decoded values for both mode properties
                Output::Notify(Property::RotationSpeed, 100u8.into()),
                Output::Notify(Property::Active, true.into()),
                Output::Notify(Property::RotationSpeed, 100u8.into()),
            ],
            "Turbo should be reported"
        );

        time::sleep(Duration::from_secs(2)).await;

        assert!(drain(&mut rx).is_empty(), "no correction should fire");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_extends_deadline() -> Result<()> {
        let (handle, _task, mut rx) = spawn();

        handle.receive("state/mode", "0")?;
        handle.receive("state/speed", "7")?;
        handle.set(Property::RotationSpeed, 100u8)?;
        time::sleep(Duration::from_millis(600)).await;
        handle.set_tagged("rotationSpeed", 100u8)?;
        time::sleep(Duration::from_millis(600)).await;
        drain(&mut rx);

        // First deadline would have fired by now
        time::sleep(Duration::from_millis(300)).await;

        assert!(drain(&mut rx).is_empty(), "first deadline should be replaced");

        time::sleep(Duration::from_millis(200)).await;

        assert_eq!(
            drain(&mut rx),
            [Output::Notify(Property::RotationSpeed, 88u8.into())],
            "correction should fire once after the second request"
        );

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_handles_dropped() -> Result<()> {
        let (handle, task, _rx) = spawn();

        handle.receive("state/mode", "1")?;
        handle.receive("state/speed", "0")?;
        drop(handle);

        let codec = task.await.unwrap();

        assert_eq!(
            codec.current_state(),
            Some(CurrentState::Idle),
            "state should be kept until the end"
        );

        Ok(())
    }

    #[tokio::test]
    async fn send_to_stopped_actor_fails() {
        let (handle, task, _rx) = spawn();

        task.abort();
        let _ = task.await;

        assert!(
            matches!(handle.receive("state/mode", "1"), Err(Error::ActorStopped)),
            "result should be actor stopped error"
        );
    }
}
