use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::errors::SessionError;
use super::shared::SessionShared;
use super::types::SessionState;
use crate::env::Env;
use crate::runtime::CancelSignal;
use crate::solver::{AnySolver, Solver, SolverError};
use crate::transport::{StreamMessage, TransportError};

/// The environment and solver a session trains. Moves into the loop task
/// while running and back into the session when the loop returns.
pub(crate) struct Trainer {
    pub(crate) env: Box<dyn Env>,
    pub(crate) solver: AnySolver,
}

#[derive(Debug)]
enum LoopExit {
    Cancelled,
    Exhausted,
    Delivery(TransportError),
    Fault(SolverError),
}

/// Drives the solver until it is exhausted, fails, or is cancelled, then
/// records the resulting state and hands the trainer back.
pub(crate) async fn run(
    session_id: Uuid,
    mut trainer: Trainer,
    shared: Arc<SessionShared>,
    delay: Duration,
    mut cancel: CancelSignal,
) -> Trainer {
    let exit = drive(&mut trainer, &shared, delay, &mut cancel).await;
    let episode = shared.current_episode();

    match exit {
        LoopExit::Cancelled => {
            shared.finish(SessionState::Stopped);
            info!(session_id = %session_id, episode, "training stopped");
        }
        LoopExit::Exhausted => {
            // state first, so a subscriber seeing the completion reads it back
            shared.finish(SessionState::Completed);
            if let Err(err) = shared.deliver(StreamMessage::Completed).await {
                warn!(session_id = %session_id, error = %err, "failed to deliver completion");
            }
            info!(session_id = %session_id, episode, "training completed");
        }
        LoopExit::Delivery(err) => {
            let err = SessionError::from(err);
            warn!(session_id = %session_id, error = %err, "halting");
            shared.record_fault(&err);
            shared.detach_any();
            shared.finish(SessionState::Errored);
        }
        LoopExit::Fault(err) => {
            let reason = err.to_string();
            let err = SessionError::from(err);
            error!(session_id = %session_id, episode, error = %err, "training aborted");
            shared.record_fault(&err);
            shared.finish(SessionState::Errored);
            if let Err(delivery) = shared.deliver(StreamMessage::abort(reason)).await {
                warn!(session_id = %session_id, error = %delivery, "failed to deliver abort");
            }
            shared.detach_any();
        }
    }
    trainer
}

async fn drive(
    trainer: &mut Trainer,
    shared: &SessionShared,
    delay: Duration,
    cancel: &mut CancelSignal,
) -> LoopExit {
    loop {
        if cancel.is_cancelled() {
            return LoopExit::Cancelled;
        }

        let record = match trainer.solver.next_update(trainer.env.as_mut()) {
            Ok(Some(record)) => record,
            Ok(None) => return LoopExit::Exhausted,
            Err(err) => return LoopExit::Fault(err),
        };
        shared.observe_episode(record.episode);
        if record.has_snapshot() {
            debug!(episode = record.episode, "checkpoint");
        }
        trace!(episode = record.episode, step = record.step, "delivering update");

        // a full subscriber must not keep a stop request waiting
        let delivered = tokio::select! {
            result = shared.deliver(StreamMessage::Update(record)) => result,
            _ = cancel.cancelled() => return LoopExit::Cancelled,
        };
        if let Err(err) = delivered {
            return LoopExit::Delivery(err);
        }
        if !cancel.sleep(delay).await {
            return LoopExit::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::env::{EnvError, EnvState, EnvironmentKind, GridWorld};
    use crate::solver::{AlgorithmKind, create_solver};
    use crate::transport::{ChannelSubscriber, Subscriber};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::watch;

    /// Fails on the third step.
    struct Brittle {
        steps: usize,
    }

    impl Env for Brittle {
        fn reset(&mut self) -> Result<EnvState, EnvError> {
            Ok(EnvState::initial(0, serde_json::Value::Null))
        }

        fn step(&mut self, _action: usize) -> Result<EnvState, EnvError> {
            self.steps += 1;
            if self.steps == 3 {
                return Err(EnvError::Other("sensor offline".into()));
            }
            Ok(EnvState::initial(1, serde_json::Value::Null))
        }

        fn state_space_size(&self) -> usize {
            2
        }

        fn action_space_size(&self) -> usize {
            2
        }

        fn render(&self) -> serde_json::Value {
            serde_json::Value::Null
        }

        fn visual_state(&self) -> serde_json::Value {
            serde_json::json!(self.steps)
        }
    }

    /// Accepts updates but refuses the abort.
    #[derive(Default)]
    struct RefusesAbort {
        updates: AtomicUsize,
    }

    #[async_trait]
    impl Subscriber for RefusesAbort {
        async fn deliver(&self, message: StreamMessage) -> Result<(), TransportError> {
            match message {
                StreamMessage::Update(_) => {
                    self.updates.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
                _ => Err(TransportError::Closed),
            }
        }
    }

    fn trainer(env: Box<dyn Env>, algorithm: AlgorithmKind, n_episodes: usize) -> Trainer {
        let mut config = TrainingConfig::new(EnvironmentKind::GridWorld, algorithm);
        config.n_episodes = n_episodes;
        let solver = create_solver(&config, env.as_ref(), 3).unwrap();
        Trainer { env, solver }
    }

    #[test_log::test(tokio::test)]
    async fn solver_fault_aborts_the_stream() {
        let shared = Arc::new(SessionShared::new());
        let (subscriber, mut messages) = ChannelSubscriber::channel(16);
        shared.attach(Arc::new(subscriber));
        shared.mark_running();

        let (_cancel, receiver) = watch::channel(false);
        let trainer = trainer(Box::new(Brittle { steps: 0 }), AlgorithmKind::QLearning, 10);
        run(
            Uuid::new_v4(),
            trainer,
            Arc::clone(&shared),
            Duration::from_millis(1),
            CancelSignal::new(receiver),
        )
        .await;

        assert_eq!(shared.state(), SessionState::Errored);
        assert!(!shared.has_subscriber());
        assert!(matches!(messages.recv().await, Some(StreamMessage::Update(_))));
        assert!(matches!(messages.recv().await, Some(StreamMessage::Update(_))));
        match messages.recv().await {
            Some(StreamMessage::Abort { code, reason }) => {
                assert_eq!(code, 1011);
                assert!(reason.contains("sensor offline"));
            }
            other => panic!("expected an abort, got {other:?}"),
        }
        let fault = shared.fault().unwrap();
        assert!(fault.starts_with("solver fault"), "{fault}");
        assert!(fault.contains("sensor offline"));
    }

    #[test_log::test(tokio::test)]
    async fn refused_abort_still_errors_the_session() {
        let shared = Arc::new(SessionShared::new());
        let subscriber = Arc::new(RefusesAbort::default());
        shared.attach(subscriber.clone());
        shared.mark_running();

        let (_cancel, receiver) = watch::channel(false);
        let trainer = trainer(Box::new(Brittle { steps: 0 }), AlgorithmKind::QLearning, 10);
        run(
            Uuid::new_v4(),
            trainer,
            Arc::clone(&shared),
            Duration::from_millis(1),
            CancelSignal::new(receiver),
        )
        .await;

        assert_eq!(subscriber.updates.load(Ordering::Relaxed), 2);
        assert_eq!(shared.state(), SessionState::Errored);
        assert!(!shared.has_subscriber());
        assert!(shared.fault().is_some_and(|fault| fault.contains("sensor offline")));
    }

    #[tokio::test]
    async fn exhausted_solver_completes_the_stream() {
        let shared = Arc::new(SessionShared::new());
        let (subscriber, mut messages) = ChannelSubscriber::channel(256);
        shared.attach(Arc::new(subscriber));
        shared.mark_running();

        let (_cancel, receiver) = watch::channel(false);
        let trainer = trainer(Box::new(GridWorld::new(3)), AlgorithmKind::PolicyIteration, 50);
        run(
            Uuid::new_v4(),
            trainer,
            Arc::clone(&shared),
            Duration::from_millis(1),
            CancelSignal::new(receiver),
        )
        .await;

        assert_eq!(shared.state(), SessionState::Completed);
        let mut last = None;
        while let Ok(message) = messages.try_recv() {
            last = Some(message);
        }
        assert_eq!(last, Some(StreamMessage::Completed));
        assert!(shared.current_episode() >= 1);
        assert_eq!(shared.fault(), None);
    }

    #[tokio::test]
    async fn closed_subscriber_halts_training() {
        let shared = Arc::new(SessionShared::new());
        let (subscriber, messages) = ChannelSubscriber::channel(1);
        drop(messages);
        shared.attach(Arc::new(subscriber));
        shared.mark_running();

        let (_cancel, receiver) = watch::channel(false);
        let trainer = trainer(Box::new(GridWorld::new(3)), AlgorithmKind::Sarsa, 10);
        run(
            Uuid::new_v4(),
            trainer,
            Arc::clone(&shared),
            Duration::from_millis(1),
            CancelSignal::new(receiver),
        )
        .await;

        assert_eq!(shared.state(), SessionState::Errored);
        assert_eq!(shared.current_episode(), 1);
        let fault = shared.fault().unwrap();
        assert!(fault.starts_with("stream delivery failed"), "{fault}");
    }
}
