//! Content components mounted inside dialog frames.
//!
//! Each content owns its draft state. Loads and submissions run as tokio
//! tasks and report back through oneshot channels that the content polls
//! while rendering, so nothing ever blocks the event loop.

pub mod email;
pub mod form;
pub mod meeting;
pub mod note;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

use super::managers::DialogCallbacks;
use super::types::MountGuard;
use crate::crm::{DirectoryError, DomainEvent};
use crate::tui::{styles::Theme, Frame};
use form::SubmitState;
use ratatui::{layout::Rect, widgets::Paragraph};
use std::future::Future;
use tokio::sync::oneshot;
use tracing::warn;

/// Something fetched from the lead directory after mount
#[derive(Debug)]
pub enum Loadable<T> {
    Loading(oneshot::Receiver<Result<T, String>>),
    Ready(T),
    Failed(String),
}

impl<T: Send + 'static> Loadable<T> {
    /// Start loading in the background. The result is dropped if the
    /// dialog was unmounted in the meantime.
    pub fn spawn<F>(guard: &MountGuard, load: F) -> Self
    where
        F: Future<Output = Result<T, DirectoryError>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let guard = guard.clone();
        tokio::spawn(async move {
            let result = load.await.map_err(|error| error.to_string());
            if guard.is_mounted() {
                let _ = sender.send(result);
            }
        });
        Self::Loading(receiver)
    }

    /// Check for a finished load. Returns the value the first time it
    /// becomes available so callers can seed their forms from it.
    pub fn poll(&mut self) -> Option<&T> {
        let Self::Loading(receiver) = self else {
            return None;
        };
        match receiver.try_recv() {
            Ok(Ok(value)) => *self = Self::Ready(value),
            Ok(Err(message)) => *self = Self::Failed(message),
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => {
                *self = Self::Failed("Load was interrupted".to_string());
                return None;
            }
        }
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    /// Placeholder text while loading or after a failure
    pub fn render_pending(&self, frame: &mut Frame, area: Rect, theme: &Theme) -> bool {
        let paragraph = match self {
            Self::Loading(_) => Paragraph::new("Loading…").style(theme.placeholder_style()),
            Self::Failed(message) => Paragraph::new(format!("Could not load: {}", message))
                .style(theme.error_style()),
            Self::Ready(_) => return false,
        };
        frame.render_widget(paragraph, area);
        true
    }
}

/// Run a directory write in the background. On success the domain event is
/// announced and the dialog closes; on failure the error comes back to
/// `state` for display.
pub fn submit<F>(state: &mut SubmitState, callbacks: DialogCallbacks, work: F)
where
    F: Future<Output = Result<DomainEvent, DirectoryError>> + Send + 'static,
{
    let reply = state.begin();
    tokio::spawn(async move {
        match work.await {
            Ok(event) => {
                callbacks.succeed(event);
                let _ = reply.send(Ok(()));
            }
            Err(error) => {
                warn!("Dialog submission failed: {}", error);
                let _ = reply.send(Err(error.to_string()));
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::LeadId;

    #[tokio::test]
    async fn test_loadable_becomes_ready_once() {
        let guard = MountGuard::new();
        let mut loadable = Loadable::spawn(&guard, async { Ok::<_, DirectoryError>(7u32) });

        let mut seen = None;
        for _ in 0..50 {
            if let Some(value) = loadable.poll() {
                seen = Some(*value);
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(seen, Some(7));
        assert_eq!(loadable.poll(), None);
        assert_eq!(loadable.ready(), Some(&7));
    }

    #[tokio::test]
    async fn test_loadable_reports_directory_errors() {
        let guard = MountGuard::new();
        let mut loadable = Loadable::<u32>::spawn(&guard, async {
            Err(DirectoryError::LeadNotFound(LeadId(3)))
        });
        for _ in 0..50 {
            loadable.poll();
            if !loadable.is_loading() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(matches!(loadable, Loadable::Failed(ref message) if message.contains("#3")));
    }
}
