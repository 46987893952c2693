//! Caller-owned holder for the current graph view.
//!
//! Fetches can complete out of order. Each fetch takes a [`RequestToken`]
//! before it starts; a result is only accepted if its token is newer than
//! the last one committed.

use crate::core::network::builder::{BuildReport, Graph};

/// Monotonic sequence number of a graph fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn sequence(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct GraphStore {
    graph: Graph,
    report: BuildReport,
    next_sequence: u64,
    /// Sequence of the graph currently held, 0 before the first commit.
    committed: u64,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the token for a fetch that is about to start.
    pub fn begin_request(&mut self) -> RequestToken {
        self.next_sequence += 1;
        RequestToken(self.next_sequence)
    }

    /// Whether no newer fetch has been issued since `token`.
    pub fn is_latest(&self, token: RequestToken) -> bool {
        token.0 == self.next_sequence
    }

    /// Install `graph` if `token` is newer than what is held. Returns whether
    /// it was accepted.
    pub fn commit(&mut self, token: RequestToken, graph: Graph, report: BuildReport) -> bool {
        if token.0 <= self.committed {
            log::debug!(
                "Discarding stale graph from request {} (holding {})",
                token.0,
                self.committed
            );
            return false;
        }
        self.committed = token.0;
        self.graph = graph;
        self.report = report;
        true
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn committed_sequence(&self) -> u64 {
        self.committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::network::builder::build_graph;
    use crate::core::network::entity::{Entity, Person};

    fn graph_of(n: u64) -> Graph {
        let entities: Vec<Entity> = (1..=n)
            .map(|id| Entity::Person(Person { id, ..Default::default() }))
            .collect();
        build_graph(&entities, &[])
    }

    #[test]
    fn test_tokens_are_monotonic() {
        let mut store = GraphStore::new();
        let a = store.begin_request();
        let b = store.begin_request();
        assert!(b > a);
        assert!(!store.is_latest(a));
        assert!(store.is_latest(b));
    }

    #[test]
    fn test_out_of_order_completion_keeps_newest() {
        let mut store = GraphStore::new();
        let older = store.begin_request();
        let newer = store.begin_request();

        assert!(store.commit(newer, graph_of(2), BuildReport::default()));
        assert!(!store.commit(older, graph_of(5), BuildReport::default()));
        assert_eq!(store.graph().nodes.len(), 2);
        assert_eq!(store.committed_sequence(), newer.sequence());
    }

    #[test]
    fn test_in_order_completion_replaces() {
        let mut store = GraphStore::new();
        let first = store.begin_request();
        assert!(store.commit(first, graph_of(1), BuildReport::default()));
        let second = store.begin_request();
        assert!(store.commit(second, graph_of(3), BuildReport::default()));
        assert_eq!(store.graph().nodes.len(), 3);
    }

    #[test]
    fn test_same_token_cannot_commit_twice() {
        let mut store = GraphStore::new();
        let token = store.begin_request();
        assert!(store.commit(token, graph_of(1), BuildReport::default()));
        assert!(!store.commit(token, graph_of(4), BuildReport::default()));
        assert_eq!(store.graph().nodes.len(), 1);
    }
}
