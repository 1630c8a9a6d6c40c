//! In-process graph backend.
//!
//! Interprets each [`Statement`] by its [`QueryKind`] and bound parameters
//! against a shared property graph, with the same observable semantics as the
//! Cypher it stands in for: merge on key, `+=` property updates (null removes),
//! detach delete, weighted shortest paths, Brandes betweenness and point
//! distance. Used by the test-suite and for running the server without a
//! database.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDateTime};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::value::{PropertyMap, Row, Value};
use super::{AccessMode, Connector, EndpointConfig, GraphDriver};
use crate::errors::{Result, RoadGraphError};
use crate::mapper::DEFAULT_STREET_WEIGHT;
use crate::nodes::coordinate::Coordinate;
use crate::query::{QueryKind, Statement};
use crate::utils::datetime::format_local_datetime;
use crate::utils::geo::point_distance;

/// Hands out drivers that all share one [`MemoryGraph`].
#[derive(Clone)]
pub struct MemoryConnector {
    graph: Arc<RwLock<MemoryGraph>>,
    unreachable: Arc<AtomicBool>,
}

impl MemoryConnector {
    /// Empty graph; random sampling seeded from the OS.
    pub fn new() -> Self {
        Self::with_graph(MemoryGraph::new(StdRng::from_os_rng()))
    }

    /// Empty graph with reproducible random sampling.
    pub fn seeded(seed: u64) -> Self {
        Self::with_graph(MemoryGraph::new(StdRng::seed_from_u64(seed)))
    }

    fn with_graph(graph: MemoryGraph) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
            unreachable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make subsequent `connect` calls fail, as an unreachable endpoint would.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, AtomicOrdering::SeqCst);
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for MemoryConnector {
    type Driver = MemoryDriver;

    async fn connect(&self, endpoint: &EndpointConfig) -> Result<MemoryDriver> {
        if self.unreachable.load(AtomicOrdering::SeqCst) {
            return Err(RoadGraphError::Connection(format!(
                "{}: endpoint unreachable",
                endpoint.uri
            )));
        }
        Ok(MemoryDriver {
            graph: Arc::clone(&self.graph),
            mode: endpoint.access_mode,
        })
    }
}

/// One endpoint onto the shared graph.
#[derive(Clone)]
pub struct MemoryDriver {
    graph: Arc<RwLock<MemoryGraph>>,
    mode: AccessMode,
}

impl MemoryDriver {
    fn execute(&self, statement: &Statement) -> Result<Vec<Row>> {
        debug!(kind = ?statement.kind, mode = %self.mode, "memory");
        if statement.is_write() {
            if self.mode == AccessMode::Read {
                return Err(RoadGraphError::Driver(format!(
                    "{:?} is a write statement but the endpoint is read-only",
                    statement.kind
                )));
            }
            self.graph.write().apply(statement)
        } else {
            self.graph.read().query(statement)
        }
    }
}

impl GraphDriver for MemoryDriver {
    async fn run(&self, statement: &Statement) -> Result<Vec<Row>> {
        self.execute(statement)
    }

    /// The write lock is held for the whole statement, which makes it atomic.
    async fn run_in_transaction(&self, statement: &Statement) -> Result<Vec<Row>> {
        self.execute(statement)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// ── Graph ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Edge {
    start: i64,
    dest: i64,
    props: PropertyMap,
}

impl Edge {
    fn id(&self) -> Option<i64> {
        self.props.get("id").and_then(Value::as_i64)
    }

    fn weight(&self) -> f64 {
        self.props
            .get("weight")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_STREET_WEIGHT)
    }

    fn interrupted(&self) -> bool {
        self.props
            .get("interrupted")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Property graph of `Intersection` nodes (keyed by osmid) and `STREET` edges.
pub struct MemoryGraph {
    nodes: BTreeMap<i64, PropertyMap>,
    edges: BTreeMap<u64, Edge>,
    next_edge: u64,
    control: Option<NaiveDateTime>,
    rng: StdRng,
}

impl MemoryGraph {
    fn new(rng: StdRng) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            next_edge: 0,
            control: None,
            rng,
        }
    }

    #[cfg(test)]
    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[cfg(test)]
    fn node(&self, osmid: i64) -> Option<&PropertyMap> {
        self.nodes.get(&osmid)
    }

    fn edges_with_id(&self, id: i64) -> impl Iterator<Item = (&u64, &Edge)> {
        self.edges.iter().filter(move |(_, e)| e.id() == Some(id))
    }

    fn edges_between(&self, start: i64, dest: i64) -> Vec<&Edge> {
        let mut found: Vec<&Edge> = self
            .edges
            .values()
            .filter(|e| e.start == start && e.dest == dest)
            .collect();
        found.sort_by_key(|e| e.id());
        found
    }

    // ── reads ─────────────────────────────────────────────────────────────────

    fn query(&self, st: &Statement) -> Result<Vec<Row>> {
        Ok(match st.kind {
            QueryKind::Ping => vec![Row::new().with("ok", 1_i64)],
            QueryKind::IntersectionById => {
                let osmid = int_param(st, "osmid")?;
                self.nodes.get(&osmid).map(props_row).into_iter().collect()
            }
            QueryKind::OutgoingStreetIds => {
                let osmid = int_param(st, "osmid")?;
                let mut ids: Vec<i64> = self
                    .edges
                    .values()
                    .filter(|e| e.start == osmid)
                    .filter_map(Edge::id)
                    .collect();
                ids.sort_unstable();
                ids.into_iter().map(|id| Row::new().with("id", id)).collect()
            }
            QueryKind::StreetById => {
                let id = int_param(st, "id")?;
                self.edges_with_id(id)
                    .take(1)
                    .map(|(_, e)| props_row(&e.props))
                    .collect()
            }
            QueryKind::StreetsBetween => {
                let start = int_param(st, "osmidStart")?;
                let dest = int_param(st, "osmidDest")?;
                self.edges_between(start, dest)
                    .into_iter()
                    .map(|e| props_row(&e.props))
                    .collect()
            }
            QueryKind::StreetGeometry => {
                let start = int_param(st, "osmidStart")?;
                let dest = int_param(st, "osmidDest")?;
                let ignore = bool_param(st, "ignoreInterrupted")?;
                self.edges_between(start, dest)
                    .into_iter()
                    .filter(|e| ignore || !e.interrupted())
                    .min_by(|a, b| a.weight().total_cmp(&b.weight()))
                    .map(|e| {
                        let geometry = e.props.get("coordinates").cloned().unwrap_or(Value::Null);
                        let mut row = Row::new();
                        row.insert("coordinates", geometry);
                        row
                    })
                    .into_iter()
                    .collect()
            }
            QueryKind::IntersectionOsmids => self
                .nodes
                .keys()
                .map(|osmid| Row::new().with("osmid", *osmid))
                .collect(),
            QueryKind::StreetIds => {
                let mut ids: Vec<i64> = self.edges.values().filter_map(Edge::id).collect();
                ids.sort_unstable();
                ids.into_iter().map(|id| Row::new().with("id", id)).collect()
            }
            QueryKind::Tagged(category) => self
                .nodes
                .values()
                .filter(|p| p.get(category.property()).and_then(Value::as_bool) == Some(true))
                .map(props_row)
                .collect(),
            QueryKind::CountIntersections => {
                vec![Row::new().with("count", self.nodes.len() as i64)]
            }
            QueryKind::ReadControl => self
                .control
                .map(|ts| Row::new().with("timestamp", format_local_datetime(&ts)))
                .into_iter()
                .collect(),
            QueryKind::ShortestPath => self.path_rows(st, true)?,
            QueryKind::ShortestPathIgnoringInterruptions => self.path_rows(st, false)?,
            QueryKind::CriticalTop => {
                let limit = usize::try_from(int_param(st, "limit")?).unwrap_or(0);
                let mut ranked: Vec<&PropertyMap> = self.nodes.values().collect();
                ranked.sort_by(|a, b| betweenness(b).total_cmp(&betweenness(a)));
                ranked.into_iter().take(limit).map(props_row).collect()
            }
            QueryKind::CriticalThreshold => {
                let threshold = float_param(st, "threshold")?;
                let mut ranked: Vec<&PropertyMap> = self
                    .nodes
                    .values()
                    .filter(|p| betweenness(p) > threshold)
                    .collect();
                ranked.sort_by(|a, b| betweenness(b).total_cmp(&betweenness(a)));
                ranked.into_iter().map(props_row).collect()
            }
            QueryKind::Nearest(category) => {
                let origin = Coordinate::new(
                    float_param(st, "longitude")?,
                    float_param(st, "latitude")?,
                );
                let max_distance = float_param(st, "maxDistance")?;
                self.nodes
                    .values()
                    .filter(|p| match category {
                        Some(c) => p.get(c.property()).and_then(Value::as_bool) == Some(true),
                        None => true,
                    })
                    .filter_map(|p| position(p).map(|pos| (p, point_distance(pos, origin))))
                    .filter(|(_, dist)| *dist <= max_distance)
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(p, dist)| props_row(p).with("dist", dist))
                    .into_iter()
                    .collect()
            }
            kind => {
                return Err(RoadGraphError::Driver(format!(
                    "{kind:?} cannot run as a read"
                )))
            }
        })
    }

    fn path_rows(&self, st: &Statement, passable_only: bool) -> Result<Vec<Row>> {
        let start = int_param(st, "osmidStart")?;
        let dest = int_param(st, "osmidDest")?;
        let topology = Topology::build(self, passable_only);
        let (Some(&from), Some(&to)) = (topology.index.get(&start), topology.index.get(&dest))
        else {
            return Ok(Vec::new());
        };

        Ok(topology
            .shortest_path(from, to)
            .into_iter()
            .flatten()
            .filter_map(|(node, cost)| {
                self.nodes
                    .get(&topology.osmids[node])
                    .map(|p| props_row(p).with("cost", cost))
            })
            .collect())
    }

    // ── writes ────────────────────────────────────────────────────────────────

    fn apply(&mut self, st: &Statement) -> Result<Vec<Row>> {
        Ok(match st.kind {
            QueryKind::MergeIntersection => {
                let osmid = int_param(st, "osmid")?;
                let props = map_param(st, "props")?;
                let node = self.nodes.entry(osmid).or_insert_with(|| {
                    PropertyMap::from([("betweenness".to_owned(), Value::Float(0.0))])
                });
                merge_props(node, props);
                node.insert("osmid".to_owned(), Value::Integer(osmid));
                vec![props_row(node)]
            }
            QueryKind::MergeStreet => {
                let start = int_param(st, "osmidStart")?;
                let dest = int_param(st, "osmidDest")?;
                let id = int_param(st, "id")?;
                let props = map_param(st, "props")?;
                if !self.nodes.contains_key(&start) || !self.nodes.contains_key(&dest) {
                    return Ok(Vec::new());
                }
                let taken = self
                    .edges_with_id(id)
                    .find(|(_, e)| e.start != start || e.dest != dest)
                    .map(|(_, e)| (e.start, e.dest));
                if let Some((taken_start, taken_dest)) = taken {
                    let props = self
                        .edges_between(start, dest)
                        .into_iter()
                        .find(|e| e.id() == Some(id))
                        .map(|e| Value::Map(e.props.clone()))
                        .unwrap_or(Value::Null);
                    let mut row = Row::new();
                    row.insert("props", props);
                    return Ok(vec![row
                        .with("takenStart", taken_start)
                        .with("takenDest", taken_dest)]);
                }
                let existing = self
                    .edges
                    .iter()
                    .find(|(_, e)| e.start == start && e.dest == dest && e.id() == Some(id))
                    .map(|(h, _)| *h);
                let handle = match existing {
                    Some(h) => h,
                    None => {
                        let h = self.next_edge;
                        self.next_edge += 1;
                        self.edges.insert(
                            h,
                            Edge {
                                start,
                                dest,
                                props: PropertyMap::from([("id".to_owned(), Value::Integer(id))]),
                            },
                        );
                        h
                    }
                };
                let edge = self
                    .edges
                    .get_mut(&handle)
                    .ok_or_else(|| RoadGraphError::Driver("edge vanished during merge".into()))?;
                merge_props(&mut edge.props, props);
                edge.props.insert("id".to_owned(), Value::Integer(id));
                let mut row = props_row(&edge.props);
                row.insert("takenStart", Value::Null);
                row.insert("takenDest", Value::Null);
                vec![row]
            }
            QueryKind::SetStreetWeight => {
                let id = int_param(st, "id")?;
                let weight = float_param(st, "weight")?;
                self.update_edges(|e| e.id() == Some(id), "weight", Value::Float(weight))
                    .into_iter()
                    .map(|e| props_row(&e))
                    .collect()
            }
            QueryKind::SetStreetInterrupted => {
                let id = int_param(st, "id")?;
                let flag = bool_param(st, "interrupted")?;
                self.update_edges(|e| e.id() == Some(id), "interrupted", Value::Boolean(flag))
                    .into_iter()
                    .map(|e| id_row(&e))
                    .collect()
            }
            QueryKind::SetStreetInterruptedBetween => {
                let start = int_param(st, "osmidStart")?;
                let dest = int_param(st, "osmidDest")?;
                let flag = bool_param(st, "interrupted")?;
                self.update_edges(
                    |e| e.start == start && e.dest == dest,
                    "interrupted",
                    Value::Boolean(flag),
                )
                .into_iter()
                .map(|e| id_row(&e))
                .collect()
            }
            QueryKind::SetBetweenness => {
                let osmid = int_param(st, "osmid")?;
                let value = float_param(st, "betweenness")?;
                match self.nodes.get_mut(&osmid) {
                    Some(node) => {
                        node.insert("betweenness".to_owned(), Value::Float(value));
                        vec![props_row(node)]
                    }
                    None => Vec::new(),
                }
            }
            QueryKind::DeleteIntersection => {
                let osmid = int_param(st, "osmid")?;
                if self.nodes.remove(&osmid).is_some() {
                    self.edges.retain(|_, e| e.start != osmid && e.dest != osmid);
                }
                Vec::new()
            }
            QueryKind::DeleteStreet => {
                let id = int_param(st, "id")?;
                self.edges.retain(|_, e| e.id() != Some(id));
                Vec::new()
            }
            QueryKind::BetweennessExact => {
                let topology = Topology::build(self, false);
                let sources: Vec<usize> = (0..topology.len()).collect();
                self.write_betweenness(&topology, &sources)
            }
            QueryKind::BetweennessSampled => {
                let topology = Topology::build(self, false);
                let sources = match str_param(st, "strategy")? {
                    "random" => {
                        let p = float_param(st, "probability")?.clamp(0.0, 1.0);
                        (0..topology.len())
                            .filter(|_| self.rng.random_bool(p))
                            .collect()
                    }
                    "degree" => topology.above_mean_degree(),
                    other => {
                        return Err(RoadGraphError::Driver(format!(
                            "unknown sampling strategy `{other}`"
                        )))
                    }
                };
                self.write_betweenness(&topology, &sources)
            }
            QueryKind::TouchControl => {
                let mut now = Local::now().naive_local();
                if let Some(previous) = self.control {
                    if now <= previous {
                        now = previous + Duration::microseconds(1);
                    }
                }
                self.control = Some(now);
                vec![Row::new().with("timestamp", format_local_datetime(&now))]
            }
            kind => {
                return Err(RoadGraphError::Driver(format!(
                    "{kind:?} is not a write statement"
                )))
            }
        })
    }

    /// Set one property on every matching edge; returns the updated maps.
    fn update_edges(
        &mut self,
        pred: impl Fn(&Edge) -> bool,
        key: &str,
        value: Value,
    ) -> Vec<PropertyMap> {
        self.edges
            .values_mut()
            .filter(|e| pred(e))
            .map(|e| {
                e.props.insert(key.to_owned(), value.clone());
                e.props.clone()
            })
            .collect()
    }

    fn write_betweenness(&mut self, topology: &Topology, sources: &[usize]) -> Vec<Row> {
        let scores = topology.betweenness(sources);
        for (node, score) in scores.into_iter().enumerate() {
            if let Some(props) = self.nodes.get_mut(&topology.osmids[node]) {
                props.insert("betweenness".to_owned(), Value::Float(score));
            }
        }
        debug!(nodes = topology.len(), sources = sources.len(), "betweenness written");
        vec![Row::new().with("nodes", topology.len() as i64)]
    }
}

// ── Algorithms ────────────────────────────────────────────────────────────────

/// Dense adjacency snapshot of the graph.
struct Topology {
    osmids: Vec<i64>,
    index: HashMap<i64, usize>,
    out: Vec<Vec<(usize, f64)>>,
    degree: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Frontier {
    cost: f64,
    node: usize,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-source Dijkstra state shared by path search and Brandes.
struct Search {
    dist: Vec<f64>,
    sigma: Vec<f64>,
    preds: Vec<Vec<usize>>,
    /// Nodes in non-decreasing distance order.
    settled: Vec<usize>,
}

impl Topology {
    fn build(graph: &MemoryGraph, passable_only: bool) -> Self {
        let osmids: Vec<i64> = graph.nodes.keys().copied().collect();
        let index: HashMap<i64, usize> = osmids.iter().enumerate().map(|(i, o)| (*o, i)).collect();
        let mut out = vec![Vec::new(); osmids.len()];
        let mut degree = vec![0; osmids.len()];

        for edge in graph.edges.values() {
            let (Some(&a), Some(&b)) = (index.get(&edge.start), index.get(&edge.dest)) else {
                continue;
            };
            degree[a] += 1;
            degree[b] += 1;
            if passable_only && edge.interrupted() {
                continue;
            }
            out[a].push((b, edge.weight()));
        }

        Self {
            osmids,
            index,
            out,
            degree,
        }
    }

    fn len(&self) -> usize {
        self.osmids.len()
    }

    fn above_mean_degree(&self) -> Vec<usize> {
        if self.degree.is_empty() {
            return Vec::new();
        }
        let mean = self.degree.iter().sum::<usize>() as f64 / self.degree.len() as f64;
        (0..self.len())
            .filter(|&n| self.degree[n] as f64 > mean)
            .collect()
    }

    fn search(&self, source: usize) -> Search {
        let n = self.len();
        let mut s = Search {
            dist: vec![f64::INFINITY; n],
            sigma: vec![0.0; n],
            preds: vec![Vec::new(); n],
            settled: Vec::with_capacity(n),
        };
        let mut done = vec![false; n];
        let mut heap = BinaryHeap::new();
        s.dist[source] = 0.0;
        s.sigma[source] = 1.0;
        heap.push(Reverse(Frontier {
            cost: 0.0,
            node: source,
        }));

        while let Some(Reverse(Frontier { cost, node: v })) = heap.pop() {
            if done[v] {
                continue;
            }
            done[v] = true;
            s.settled.push(v);
            for &(w, weight) in &self.out[v] {
                let alt = cost + weight;
                if alt < s.dist[w] {
                    s.dist[w] = alt;
                    s.sigma[w] = s.sigma[v];
                    s.preds[w].clear();
                    s.preds[w].push(v);
                    heap.push(Reverse(Frontier { cost: alt, node: w }));
                } else if alt == s.dist[w] && !done[w] {
                    s.sigma[w] += s.sigma[v];
                    s.preds[w].push(v);
                }
            }
        }
        s
    }

    /// Nodes on a cheapest path with their cumulative cost, `None` when
    /// `to` is unreachable. Ties resolve to the first predecessor found.
    /// A predecessor chain longer than the node count has a cycle in it and
    /// is treated as no path.
    fn shortest_path(&self, from: usize, to: usize) -> Option<Vec<(usize, f64)>> {
        let search = self.search(from);
        if search.dist[to].is_infinite() {
            return None;
        }
        let mut path = vec![(to, search.dist[to])];
        let mut current = to;
        while current != from {
            if path.len() > self.len() {
                return None;
            }
            current = *search.preds[current].first()?;
            path.push((current, search.dist[current]));
        }
        path.reverse();
        Some(path)
    }

    /// Brandes dependency accumulation over the given sources.
    fn betweenness(&self, sources: &[usize]) -> Vec<f64> {
        let mut scores = vec![0.0; self.len()];
        for &source in sources {
            let mut search = self.search(source);
            let mut delta = vec![0.0; self.len()];
            while let Some(w) = search.settled.pop() {
                for &v in &search.preds[w] {
                    delta[v] += search.sigma[v] / search.sigma[w] * (1.0 + delta[w]);
                }
                if w != source {
                    scores[w] += delta[w];
                }
            }
        }
        scores
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn props_row(props: &PropertyMap) -> Row {
    Row::new().with("props", props.clone())
}

fn id_row(props: &PropertyMap) -> Row {
    let mut row = Row::new();
    row.insert("id", props.get("id").cloned().unwrap_or(Value::Null));
    row
}

/// Cypher `SET n += $map`: null values remove the property.
fn merge_props(target: &mut PropertyMap, update: &PropertyMap) {
    for (key, value) in update {
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn betweenness(props: &PropertyMap) -> f64 {
    props
        .get("betweenness")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

fn position(props: &PropertyMap) -> Option<Coordinate> {
    Some(Coordinate::new(
        props.get("longitude")?.as_f64()?,
        props.get("latitude")?.as_f64()?,
    ))
}

fn param<'a>(st: &'a Statement, key: &str) -> Result<&'a Value> {
    st.param_value(key)
        .ok_or_else(|| RoadGraphError::Driver(format!("missing parameter ${key}")))
}

fn bad_param(st: &Statement, key: &str, expected: &str) -> RoadGraphError {
    RoadGraphError::Driver(format!(
        "parameter ${key} of {:?} is not a {expected}",
        st.kind
    ))
}

fn int_param(st: &Statement, key: &str) -> Result<i64> {
    param(st, key)?
        .as_i64()
        .ok_or_else(|| bad_param(st, key, "integer"))
}

fn float_param(st: &Statement, key: &str) -> Result<f64> {
    param(st, key)?
        .as_f64()
        .ok_or_else(|| bad_param(st, key, "float"))
}

fn bool_param(st: &Statement, key: &str) -> Result<bool> {
    param(st, key)?
        .as_bool()
        .ok_or_else(|| bad_param(st, key, "boolean"))
}

fn str_param<'a>(st: &'a Statement, key: &str) -> Result<&'a str> {
    param(st, key)?
        .as_str()
        .ok_or_else(|| bad_param(st, key, "string"))
}

fn map_param<'a>(st: &'a Statement, key: &str) -> Result<&'a PropertyMap> {
    param(st, key)?
        .as_map()
        .ok_or_else(|| bad_param(st, key, "map"))
}
