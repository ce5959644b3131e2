use crate::types::GraphSnapshot;

/// Source of graph snapshots. Called once per simulation operation; the
/// returned snapshot is never cached across calls.
pub trait GraphAccessor {
    fn snapshot(&self) -> GraphSnapshot;
}

impl GraphAccessor for GraphSnapshot {
    fn snapshot(&self) -> GraphSnapshot {
        self.clone()
    }
}

impl<F> GraphAccessor for F
where
    F: Fn() -> GraphSnapshot,
{
    fn snapshot(&self) -> GraphSnapshot {
        self()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::types::Node;

    #[test]
    fn test_closure_accessor_is_pulled_every_call() {
        let calls = Cell::new(0);
        let accessor = || {
            calls.set(calls.get() + 1);
            GraphSnapshot::new(vec![Node::architecture("a")], Vec::new())
        };

        assert_eq!(accessor.snapshot().nodes.len(), 1);
        assert_eq!(accessor.snapshot().nodes.len(), 1);
        assert_eq!(calls.get(), 2);
    }
}
