use crate::areas::database::Database;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WalkOrder {
    /// Children before parents; ties by committer time, newest first
    #[default]
    Topological,
    /// Committer time only, newest first
    Date,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOptions {
    pub order: WalkOrder,
    /// Stop after this many commits
    pub max_count: Option<usize>,
}

/// Commit as held by the walk queue.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueuedCommit {
    timestamp: i64,
    oid: ObjectId,
    parents: Vec<ObjectId>,
}

impl QueuedCommit {
    fn new(oid: ObjectId, commit: &Commit) -> Self {
        QueuedCommit {
            timestamp: commit.timestamp().timestamp(),
            oid,
            parents: commit.parents().to_vec(),
        }
    }
}

impl PartialOrd for QueuedCommit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedCommit {
    // max-heap: newest first, then the smaller id
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| other.oid.cmp(&self.oid))
    }
}

/// Lazy walk over the commits reachable from a set of starting points.
///
/// Each call to `next` reads at most the parents of the previously returned
/// commit, except in topological order once several lines of history are
/// pending: the remaining ancestry is then loaded once and ordered with
/// Kahn's algorithm. A read error is returned once and ends the walk.
#[derive(Debug)]
pub struct RevWalk {
    database: Database,
    order: WalkOrder,
    remaining: Option<usize>,
    starts: Option<Vec<ObjectId>>,
    seen: HashSet<ObjectId>,
    queue: BinaryHeap<QueuedCommit>,
    /// Parents of the last returned commit, enqueued on the next call
    expand: Option<Vec<ObjectId>>,
    sorted: Option<VecDeque<ObjectId>>,
    done: bool,
}

impl RevWalk {
    pub fn new(database: Database, starts: Vec<ObjectId>, options: WalkOptions) -> Self {
        RevWalk {
            database,
            order: options.order,
            remaining: options.max_count,
            starts: Some(starts),
            seen: HashSet::new(),
            queue: BinaryHeap::new(),
            expand: None,
            sorted: None,
            done: false,
        }
    }

    fn enqueue(&mut self, oid: ObjectId) -> anyhow::Result<()> {
        if !self.seen.insert(oid.clone()) {
            return Ok(());
        }

        let commit = self.database.load_commit(&oid)?;
        self.queue.push(QueuedCommit::new(oid, &commit));

        Ok(())
    }

    fn advance(&mut self) -> anyhow::Result<Option<ObjectId>> {
        if let Some(sorted) = self.sorted.as_mut() {
            return Ok(sorted.pop_front());
        }

        if let Some(starts) = self.starts.take() {
            for oid in starts {
                self.enqueue(oid)?;
            }
        }

        if let Some(parents) = self.expand.take() {
            for parent in parents {
                self.enqueue(parent)?;
            }
        }

        if self.order == WalkOrder::Topological && self.queue.len() > 1 {
            let mut sorted = self.sort_remaining()?;
            let next = sorted.pop_front();
            self.sorted = Some(sorted);
            return Ok(next);
        }

        Ok(self.queue.pop().map(|commit| {
            self.expand = Some(commit.parents);
            commit.oid
        }))
    }

    /// Load everything still reachable from the queue and order it so that
    /// no commit comes before one of its children.
    fn sort_remaining(&mut self) -> anyhow::Result<VecDeque<ObjectId>> {
        let mut nodes: HashMap<ObjectId, QueuedCommit> = HashMap::new();
        let mut stack = self.queue.drain().collect::<Vec<_>>();

        while let Some(node) = stack.pop() {
            for parent in &node.parents {
                if self.seen.insert(parent.clone()) {
                    let commit = self.database.load_commit(parent)?;
                    stack.push(QueuedCommit::new(parent.clone(), &commit));
                }
            }
            nodes.insert(node.oid.clone(), node);
        }

        let mut children_count: HashMap<&ObjectId, usize> = HashMap::new();
        for node in nodes.values() {
            for parent in node.parents.iter().filter(|parent| nodes.contains_key(*parent)) {
                *children_count.entry(parent).or_default() += 1;
            }
        }

        let mut ready = nodes
            .values()
            .filter(|node| !children_count.contains_key(&node.oid))
            .cloned()
            .collect::<BinaryHeap<_>>();
        let mut sorted = VecDeque::with_capacity(nodes.len());

        while let Some(node) = ready.pop() {
            for parent in &node.parents {
                if let Some(count) = children_count.get_mut(parent) {
                    *count -= 1;
                    if *count == 0
                        && let Some(parent_node) = nodes.get(parent)
                    {
                        ready.push(parent_node.clone());
                    }
                }
            }
            sorted.push_back(node.oid);
        }

        tracing::trace!(commits = sorted.len(), "sorted remaining history");
        Ok(sorted)
    }
}

impl Iterator for RevWalk {
    type Item = anyhow::Result<ObjectId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == Some(0) {
            return None;
        }

        match self.advance() {
            Ok(Some(oid)) => {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                Some(Ok(oid))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}
