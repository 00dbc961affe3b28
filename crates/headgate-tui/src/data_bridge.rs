//! Data bridge -- connects [`Controller`] streams to TUI actions.
//!
//! Runs as a background task after sign-in: subscribes to session
//! snapshots, phase transitions, and the notice side channel, and
//! forwards every change as an [`Action`] through the TUI's action
//! queue. Shuts down cleanly on cancellation.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use headgate_core::Controller;

use crate::action::{Action, Notification};

/// Forward controller state into the action queue until cancelled.
///
/// Sends the current session snapshot and phase immediately so screens
/// have data before the first change arrives.
pub async fn spawn_data_bridge(
    controller: Controller,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut session = controller.session();
    let mut phase = controller.phase();
    let mut notices = controller.notices();

    // Initial snapshots so screens render real data on the next frame
    let _ = action_tx.send(Action::SessionUpdated(session.borrow_and_update().clone()));
    let _ = action_tx.send(Action::PhaseChanged(*phase.borrow_and_update()));

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Ok(()) = session.changed() => {
                let snapshot = session.borrow_and_update().clone();
                let _ = action_tx.send(Action::SessionUpdated(snapshot));
            }

            Ok(()) = phase.changed() => {
                let current = *phase.borrow_and_update();
                let _ = action_tx.send(Action::PhaseChanged(current));
            }

            notice = notices.recv() => {
                match notice {
                    Ok(notice) => {
                        let _ = action_tx.send(Action::Notify(Notification::from(&notice)));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "notice channel lagged, dropping backlog");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    debug!("data bridge shut down");
}
