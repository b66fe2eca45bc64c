//! Quadtree spatial index for viewport culling and region queries
//!
//! Entries are keyed by the projected centroid of each feature and carry the projected
//! bounding box as payload. The tree is an arena: entries live in one owning `Vec`, nodes in
//! another, and leaves hold entry indices. It is built once per (data, projection) pair and never
//! mutated afterwards, so it can be shared behind an `Arc`.
//!
//! Every node also records the union of the bounds of all entries below it. Queries prune on that
//! extent rather than on the quadrant, so long roads whose centroid sits far from the window are
//! still found.

use crate::feature::FeatureCollection;
use crate::projector::{GeometryProjector, ProjectedPath};
use crate::utils;
use geo::{Coord, Rect};
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum depth of the quadtree to prevent infinite recursion
const MAX_DEPTH: u32 = 20;

/// Default number of entries a leaf holds before it splits
pub const DEFAULT_LEAF_CAPACITY: usize = 16;

/// One indexed feature, computed at `k = 1`
#[derive(Clone, Debug)]
pub struct SpatialIndexEntry {
    /// Index of the feature in its collection
    pub feature: usize,
    /// Stable key (code or synthesized `road-{index}`)
    pub key: String,
    pub class: Option<String>,
    /// Name reported by region queries
    pub label: Option<String>,
    pub centroid: Coord<f64>,
    pub bounds: Rect<f64>,
    pub path: ProjectedPath,
}

#[derive(Clone, Debug)]
struct QuadNode {
    /// Quadrant covered by this node (centroid space)
    quad: Rect<f64>,
    /// Union of the bounds of every entry in the subtree
    extent: Option<Rect<f64>>,
    /// Depth level in the tree (0 = root)
    level: u32,
    /// Child node indices (NW, NE, SW, SE) if subdivided
    children: Option<[u32; 4]>,
    entries: SmallVec<[u32; 8]>,
}

impl QuadNode {
    fn new(quad: Rect<f64>, level: u32) -> Self {
        Self {
            quad,
            extent: None,
            level,
            children: None,
            entries: SmallVec::new(),
        }
    }

    /// Quadrant index of a centroid: NW, NE, SW, SE with y growing downwards
    fn quadrant_of(&self, c: Coord<f64>) -> usize {
        let mid = self.quad.center();
        let east = c.x >= mid.x;
        let south = c.y >= mid.y;
        (south as usize) * 2 + east as usize
    }
}

/// Counters from one window query
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub nodes_visited: usize,
    pub nodes_pruned: usize,
    pub entries_tested: usize,
    pub entries_hit: usize,
}

/// Immutable quadtree over projected feature centroids
#[derive(Debug)]
pub struct SpatialIndex {
    features: Arc<FeatureCollection>,
    projector: Arc<GeometryProjector>,
    entries: Vec<SpatialIndexEntry>,
    nodes: Vec<QuadNode>,
    leaf_capacity: usize,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SpatialIndex {
    /// Build the index for `features` under `projector`
    ///
    /// Features whose projected path is empty are skipped.
    pub fn build(
        features: Arc<FeatureCollection>,
        projector: Arc<GeometryProjector>,
        leaf_capacity: usize,
    ) -> Self {
        profiling::scope!("SpatialIndex::build");
        let leaf_capacity = leaf_capacity.max(1);

        let mut skipped = 0usize;
        let entries: Vec<SpatialIndexEntry> = features
            .features()
            .iter()
            .enumerate()
            .filter_map(|(index, feature)| {
                let Some(path) = projector.project(&feature.geometry) else {
                    skipped += 1;
                    return None;
                };
                Some(SpatialIndexEntry {
                    feature: index,
                    key: features.key(index).unwrap_or_default().to_string(),
                    class: feature.properties.road_class.clone(),
                    label: feature.road_label(),
                    centroid: path.centroid(),
                    bounds: path.bounds(),
                    path,
                })
            })
            .collect();

        let mut index = Self {
            features,
            projector,
            entries,
            nodes: Vec::new(),
            leaf_capacity,
        };
        index.build_tree();

        tracing::debug!(
            "Built spatial index: {} entries ({} skipped), {} nodes, depth {}",
            index.entries.len(),
            skipped,
            index.nodes.len(),
            index.depth()
        );
        index
    }

    fn build_tree(&mut self) {
        let Some(root_quad) = self
            .entries
            .iter()
            .map(|e| Rect::new(e.centroid, e.centroid))
            .reduce(utils::union_rect)
        else {
            return;
        };

        // Square root quadrant so children stay square
        let center = root_quad.center();
        let half = (root_quad.width().max(root_quad.height()) / 2.0).max(0.5) * 1.001;
        let root_quad = Rect::new(
            Coord {
                x: center.x - half,
                y: center.y - half,
            },
            Coord {
                x: center.x + half,
                y: center.y + half,
            },
        );
        self.nodes.push(QuadNode::new(root_quad, 0));

        for id in 0..self.entries.len() as u32 {
            self.insert(id);
        }

        // Children are always pushed after their parent
        for node_id in (0..self.nodes.len()).rev() {
            let node = &self.nodes[node_id];
            let mut extent = node
                .entries
                .iter()
                .map(|&id| self.entries[id as usize].bounds)
                .reduce(utils::union_rect);
            if let Some(children) = node.children {
                for child in children {
                    if let Some(child_extent) = self.nodes[child as usize].extent {
                        extent = Some(match extent {
                            Some(e) => utils::union_rect(e, child_extent),
                            None => child_extent,
                        });
                    }
                }
            }
            self.nodes[node_id].extent = extent;
        }
    }

    fn insert(&mut self, id: u32) {
        let centroid = self.entries[id as usize].centroid;
        let mut node_id = 0usize;
        while let Some(children) = self.nodes[node_id].children {
            node_id = children[self.nodes[node_id].quadrant_of(centroid)] as usize;
        }

        self.nodes[node_id].entries.push(id);
        if self.nodes[node_id].entries.len() > self.leaf_capacity
            && self.nodes[node_id].level < MAX_DEPTH
        {
            self.subdivide(node_id);
        }
    }

    /// Split a leaf into 4 children and push its entries down
    fn subdivide(&mut self, node_id: usize) {
        let quad = self.nodes[node_id].quad;
        let level = self.nodes[node_id].level + 1;
        let min = quad.min();
        let max = quad.max();
        let mid = quad.center();

        let first = self.nodes.len() as u32;
        // NW, NE, SW, SE (screen space, y down)
        self.nodes.push(QuadNode::new(
            Rect::new(Coord { x: min.x, y: min.y }, Coord { x: mid.x, y: mid.y }),
            level,
        ));
        self.nodes.push(QuadNode::new(
            Rect::new(Coord { x: mid.x, y: min.y }, Coord { x: max.x, y: mid.y }),
            level,
        ));
        self.nodes.push(QuadNode::new(
            Rect::new(Coord { x: min.x, y: mid.y }, Coord { x: mid.x, y: max.y }),
            level,
        ));
        self.nodes.push(QuadNode::new(
            Rect::new(Coord { x: mid.x, y: mid.y }, Coord { x: max.x, y: max.y }),
            level,
        ));
        let children = [first, first + 1, first + 2, first + 3];

        let entries = std::mem::take(&mut self.nodes[node_id].entries);
        self.nodes[node_id].children = Some(children);
        for id in entries {
            let q = self.nodes[node_id].quadrant_of(self.entries[id as usize].centroid);
            self.nodes[children[q] as usize].entries.push(id);
        }
        // A child can overflow again when every centroid fell in one quadrant
        for child in children {
            let child = child as usize;
            if self.nodes[child].entries.len() > self.leaf_capacity && level < MAX_DEPTH {
                self.subdivide(child);
            }
        }
    }

    /// Visit every entry whose bounds intersect `window`, in tree order
    pub fn visit_window(
        &self,
        window: &Rect<f64>,
        mut visit: impl FnMut(u32, &SpatialIndexEntry),
    ) -> QueryStats {
        let mut stats = QueryStats::default();
        if self.nodes.is_empty() {
            return stats;
        }

        let mut stack: Vec<u32> = vec![0];
        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id as usize];
            stats.nodes_visited += 1;
            match node.extent {
                Some(extent) if utils::rects_intersect(&extent, window) => {}
                _ => {
                    stats.nodes_pruned += 1;
                    continue;
                }
            }

            for &id in &node.entries {
                stats.entries_tested += 1;
                let entry = &self.entries[id as usize];
                if utils::rects_intersect(&entry.bounds, window) {
                    stats.entries_hit += 1;
                    visit(id, entry);
                }
            }
            if let Some(children) = node.children {
                stack.extend(children.iter().rev());
            }
        }
        stats
    }

    /// Ids of entries intersecting `window`, ascending (feature order)
    pub fn query_ids(&self, window: &Rect<f64>) -> (Vec<u32>, QueryStats) {
        let mut ids = Vec::new();
        let stats = self.visit_window(window, |id, _| ids.push(id));
        ids.sort_unstable();
        (ids, stats)
    }

    /// Entries intersecting `window`, in feature order
    pub fn query_window(&self, window: &Rect<f64>) -> Vec<&SpatialIndexEntry> {
        let (ids, _) = self.query_ids(window);
        ids.into_iter().map(|id| &self.entries[id as usize]).collect()
    }

    pub fn entry(&self, id: u32) -> Option<&SpatialIndexEntry> {
        self.entries.get(id as usize)
    }

    pub fn entries(&self) -> &[SpatialIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.level).max().unwrap_or(0)
    }

    /// Union of all entry bounds
    pub fn extent(&self) -> Option<Rect<f64>> {
        self.nodes.first().and_then(|root| root.extent)
    }

    pub fn features(&self) -> &Arc<FeatureCollection> {
        &self.features
    }

    pub fn projector(&self) -> &Arc<GeometryProjector> {
        &self.projector
    }
}
