use std::collections::VecDeque;

use super::{CallbackId, HostValue, InstanceId};

/// Work postponed until the current script turn has finished.
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredAction {
    DispatchEvent {
        target: InstanceId,
        event: InstanceId,
    },
    InvokeCallback {
        callback: CallbackId,
        this: Option<InstanceId>,
        args: Vec<HostValue>,
    },
}

/// Per-window FIFO of deferred actions.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    actions: VecDeque<DeferredAction>,
    cancelled: bool,
}

impl DeferredQueue {
    pub fn push(&mut self, action: DeferredAction) {
        if self.cancelled {
            tracing::debug!(target: "hostbridge::host", ?action, "dropping action for discarded window");
            return;
        }
        self.actions.push_back(action);
    }

    pub fn pop(&mut self) -> Option<DeferredAction> {
        self.actions.pop_front()
    }

    /// Whether a pending action still names `id`.
    pub fn references(&self, id: InstanceId) -> bool {
        self.actions.iter().any(|action| match action {
            DeferredAction::DispatchEvent { target, event } => *target == id || *event == id,
            DeferredAction::InvokeCallback { this, args, .. } => {
                *this == Some(id) || args.iter().any(|arg| arg.mentions(id))
            }
        })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Drop everything pending and refuse new work. Returns the number dropped.
    pub fn cancel_all(&mut self) -> usize {
        self.cancelled = true;
        let dropped = self.actions.len();
        self.actions.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_in_fifo_order_until_cancelled() {
        let mut queue = DeferredQueue::default();
        for raw in 0..3 {
            queue.push(DeferredAction::InvokeCallback {
                callback: CallbackId(raw),
                this: None,
                args: Vec::new(),
            });
        }
        assert!(matches!(
            queue.pop(),
            Some(DeferredAction::InvokeCallback { callback: CallbackId(0), .. })
        ));
        assert_eq!(queue.cancel_all(), 2);
        queue.push(DeferredAction::DispatchEvent {
            target: InstanceId(0),
            event: InstanceId(1),
        });
        assert!(queue.is_empty());
    }

    #[test]
    fn references_cover_targets_events_and_arguments() {
        let mut queue = DeferredQueue::default();
        queue.push(DeferredAction::DispatchEvent {
            target: InstanceId(0),
            event: InstanceId(4),
        });
        queue.push(DeferredAction::InvokeCallback {
            callback: CallbackId(0),
            this: None,
            args: vec![HostValue::List(vec![HostValue::Object(InstanceId(7))])],
        });
        assert!(queue.references(InstanceId(4)));
        assert!(queue.references(InstanceId(7)));
        assert!(!queue.references(InstanceId(5)));
    }
}
