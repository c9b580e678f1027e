//! The dev event loop: newline-delimited JSON events in, replies logged.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use warden_events::InboundEvent;
use warden_infra::{InMemoryPlatform, UserProfile};

use crate::router::TenantRouter;

/// Read events from `input` until EOF or a shutdown request.
///
/// Each event is dispatched on its own task, so a slow tenant does not hold
/// up the others. Commands still in flight when the loop stops are awaited
/// before returning.
///
/// The in-memory platform learns users and workspaces from the events it
/// sees; the first author seen in a workspace becomes its owner.
pub async fn serve<R>(
    router: Arc<TenantRouter>,
    platform: Arc<InMemoryPlatform>,
    input: R,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let services = router.services().clone();
    let mut lines = input.lines();
    let mut tasks = JoinSet::new();

    let result = loop {
        tokio::select! {
            _ = services.shutdown.notified() => break Ok(()),
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => log_outcome(joined),
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e),
                };
                let Some(event) = parse(&line) else {
                    continue;
                };
                register(&platform, &event);

                let router = router.clone();
                tasks.spawn(async move { router.handle(&event).await });
            }
        }
    };

    while let Some(joined) = tasks.join_next().await {
        log_outcome(joined);
    }
    result
}

fn parse(line: &str) -> Option<InboundEvent> {
    if line.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "skipping malformed event");
            None
        }
    }
}

fn register(platform: &InMemoryPlatform, event: &InboundEvent) {
    let author = event.author();
    platform.add_user(UserProfile {
        id: author.id,
        name: author.name.clone(),
        is_bot: author.is_bot,
    });
    if let Some(tenant_id) = event.workspace_id() {
        if platform.ensure_workspace(tenant_id, author.id) {
            info!(%tenant_id, owner = %author.id, "workspace registered");
        }
    }
}

type Outcome = Result<Option<String>, crate::error::DispatchError>;

fn log_outcome(joined: Result<Outcome, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(Some(reply))) => info!(reply, "replied"),
        Ok(Ok(None)) => {}
        Ok(Err(e)) => error!(error = %e, "dispatch failed"),
        Err(e) => error!(error = %e, "dispatch task panicked"),
    }
}
