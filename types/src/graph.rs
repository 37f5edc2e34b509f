//! The unified causal graph.
//!
//! Articles carry a single `causal_parent_id` on the wire; other screens
//! need full cause/effect adjacency. Both views are served by one model:
//! a [`CausalEvent`] node per article, edges referencing other nodes by id
//! (never by pointer, so cycles of ownership are impossible), held in a
//! [`CausalGraph`] that preserves feed order for display.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::{FeedEntry, TruthScore};

/// A node in the directed causal graph of news events.
#[derive(Debug, Clone, PartialEq)]
pub struct CausalEvent {
    pub id: String,
    /// Parsed instant when the display timestamp is RFC 3339; free-text
    /// timestamps ("2 hrs ago") leave this empty.
    pub timestamp: Option<DateTime<Utc>>,
    /// Neutralized one-paragraph summary of the event.
    pub summary: String,
    pub trust_score: TruthScore,
    /// Ids of events presented as causes of this one.
    pub causes: Vec<String>,
    /// Ids of events presented as consequences of this one.
    pub effects: Vec<String>,
    /// Visual column for timeline layout.
    pub lane: u8,
}

/// Directed causal graph keyed by event id, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct CausalGraph {
    nodes: HashMap<String, CausalEvent>,
    order: Vec<String>,
}

impl CausalGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from a feed sequence. Ads are skipped; each article
    /// becomes one node.
    ///
    /// A `causal_parent_id` must name an article seen earlier in the same
    /// sequence. A dangling reference (unknown id, or the entry's own id)
    /// cannot be rendered as a link, so the entry degrades to an unlinked
    /// lane-0 root and the dropped edge is logged.
    #[must_use]
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a FeedEntry>,
    {
        let mut graph = Self::new();

        for entry in entries {
            let Some(article) = entry.as_article() else {
                continue;
            };

            let mut causes = Vec::new();
            let mut lane = article.lane;
            if let Some(parent) = &article.causal_parent_id {
                if graph.nodes.contains_key(parent) {
                    causes.push(parent.clone());
                } else {
                    tracing::warn!(
                        id = %article.id,
                        parent = %parent,
                        "causal parent not seen earlier in feed; rendering entry as root"
                    );
                    lane = 0;
                }
            }

            graph.insert(CausalEvent {
                id: article.id.clone(),
                timestamp: parse_instant(&article.timestamp),
                summary: article.summary.clone(),
                trust_score: article.truth_score,
                causes,
                effects: Vec::new(),
                lane,
            });
        }

        graph
    }

    /// Inserts a node and wires its cause edges into the existing graph.
    ///
    /// Cause ids that do not resolve to a present node are dropped. A node
    /// with an already-known id is ignored; the first occurrence wins.
    pub fn insert(&mut self, mut event: CausalEvent) {
        if self.nodes.contains_key(&event.id) {
            tracing::warn!(id = %event.id, "duplicate event id; keeping earlier node");
            return;
        }

        event.causes.retain(|cause| {
            if cause == &event.id {
                return false;
            }
            self.nodes.contains_key(cause)
        });

        for cause in &event.causes {
            if let Some(parent) = self.nodes.get_mut(cause) {
                parent.effects.push(event.id.clone());
            }
        }

        self.order.push(event.id.clone());
        self.nodes.insert(event.id.clone(), event);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CausalEvent> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Nodes in feed order.
    pub fn iter(&self) -> impl Iterator<Item = &CausalEvent> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Nodes with no incoming cause edges, in feed order.
    pub fn roots(&self) -> impl Iterator<Item = &CausalEvent> {
        self.iter().filter(|event| event.causes.is_empty())
    }

    /// Direct consequences of `id`, in the order the edges were added.
    #[must_use]
    pub fn effects_of(&self, id: &str) -> &[String] {
        self.nodes.get(id).map_or(&[], |event| event.effects.as_slice())
    }

    /// Direct causes of `id`.
    #[must_use]
    pub fn causes_of(&self, id: &str) -> &[String] {
        self.nodes.get(id).map_or(&[], |event| event.causes.as_slice())
    }

    /// All transitive consequences of `id`, breadth-first.
    ///
    /// The start node itself is not included. Edge insertion forbids cycles
    /// (an edge always points at an earlier node), but traversal still
    /// tracks visited ids so shared descendants appear once.
    #[must_use]
    pub fn descendants(&self, id: &str) -> Vec<&CausalEvent> {
        let mut queue: VecDeque<&str> = self.effects_of(id).iter().map(String::as_str).collect();
        let mut seen: Vec<&str> = Vec::new();
        let mut result = Vec::new();

        while let Some(next) = queue.pop_front() {
            if seen.contains(&next) {
                continue;
            }
            seen.push(next);
            if let Some(event) = self.nodes.get(next) {
                result.push(event);
                queue.extend(event.effects.iter().map(String::as_str));
            }
        }

        result
    }
}

fn parse_instant(timestamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}
