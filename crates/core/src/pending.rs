//! Per-target buffer of commands waiting for an asset to finish loading.

use crate::command::AnimationCommand;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: HashMap<String, Vec<AnimationCommand>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a deferred command. Returns `true` when this created the
    /// entry for the command's target.
    pub fn push(&mut self, cmd: AnimationCommand) -> bool {
        let mut created = false;
        self.entries
            .entry(cmd.target.clone())
            .or_insert_with(|| {
                created = true;
                Vec::new()
            })
            .push(cmd);
        created
    }

    /// Drains and discards the entry for `target`, in arrival order.
    pub fn take(&mut self, target: &str) -> Vec<AnimationCommand> {
        self.entries.remove(target).unwrap_or_default()
    }

    pub fn len(&self, target: &str) -> usize {
        self.entries.get(target).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_per_target() {
        let mut queue = PendingQueue::new();
        assert!(queue.push(AnimationCommand::gesture("a", "wave")));
        assert!(!queue.push(AnimationCommand::emotion("a", "joyful", 0.5)));
        assert!(queue.push(AnimationCommand::idle("b")));
        assert_eq!(queue.len("a"), 2);

        let drained = queue.take("a");
        assert_eq!(
            drained,
            vec![
                AnimationCommand::gesture("a", "wave"),
                AnimationCommand::emotion("a", "joyful", 0.5),
            ]
        );
        assert_eq!(queue.len("a"), 0);
        assert_eq!(queue.len("b"), 1);
    }

    #[test]
    fn test_take_is_idempotent() {
        let mut queue = PendingQueue::new();
        queue.push(AnimationCommand::idle("a"));
        assert_eq!(queue.take("a").len(), 1);
        assert!(queue.take("a").is_empty());
        assert!(queue.is_empty());
    }
}
