//! Region layers: Base, Highlight and Interaction
//!
//! The three layers share one region set and one projector but are memoized independently. Each
//! layer owns the key it was last rendered with and re-renders only when its comparator reports
//! a dirty field. Keys hold owned values (generation stamps, set contents, enum values), never
//! references.
//!
//! Strokes are given in screen pixels and never scale with the transform, so the transform is
//! not part of any key: zooming and panning never re-render a layer.

use crate::feature::FeatureCollection;
use crate::projector::{FillMesh, GeometryProjector, ProjectedPath};
use crate::theme::{Color, Theme};
use crate::transform::Transform;
use geo::Coord;
use std::collections::BTreeSet;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Game screen the map is shown under
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GameState {
    #[default]
    Initial,
    GameModeSelect,
    LevelSelect,
    Playing,
    Paused,
    Result,
}

impl GameState {
    /// Regions are clickable targets in this state
    pub fn accepts_picks(self) -> bool {
        matches!(self, GameState::Playing | GameState::LevelSelect)
    }
}

/// Outcome of the latest answer
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnswerFeedback {
    /// Region the player clicked
    pub region_code: String,
    /// Region that was asked for
    pub correct_code: String,
    pub is_correct: bool,
}

impl AnswerFeedback {
    pub fn correct(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            correct_code: code.clone(),
            region_code: code,
            is_correct: true,
        }
    }

    pub fn wrong(clicked: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            region_code: clicked.into(),
            correct_code: expected.into(),
            is_correct: false,
        }
    }
}

/// Visual status of a region, ordered by draw rank
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegionStatus {
    Default,
    Answered,
    CorrectFeedback,
    WrongFeedback,
}

impl RegionStatus {
    pub fn of(code: &str, answered: &BTreeSet<String>, feedback: Option<&AnswerFeedback>) -> Self {
        match feedback {
            Some(f) if f.region_code == code && f.is_correct => RegionStatus::CorrectFeedback,
            Some(f) if f.region_code == code => RegionStatus::WrongFeedback,
            _ if answered.contains(code) => RegionStatus::Answered,
            _ => RegionStatus::Default,
        }
    }
}

/// Everything the layers are rendered from
#[derive(Clone, Copy, Debug)]
pub struct LayerInputs<'a> {
    pub regions: &'a Arc<FeatureCollection>,
    pub projector: &'a Arc<GeometryProjector>,
    pub theme: Theme,
    pub game_state: GameState,
    pub answered: &'a BTreeSet<String>,
    pub feedback: Option<&'a AnswerFeedback>,
    pub hovered: Option<&'a str>,
}

/// Dirty-field comparator of a layer key
pub trait LayerDiff {
    /// `true` when going from `prev` to `next` requires a re-render
    fn is_dirty(prev: &Self, next: &Self) -> bool;
}

#[derive(Clone, Debug, PartialEq)]
pub struct BaseKey {
    pub theme: Theme,
    pub regions: u64,
    pub projector: u64,
    pub answered: BTreeSet<String>,
    pub feedback: Option<AnswerFeedback>,
}

impl BaseKey {
    pub fn from_inputs(inputs: &LayerInputs<'_>) -> Self {
        Self {
            theme: inputs.theme,
            regions: inputs.regions.generation(),
            projector: inputs.projector.generation(),
            answered: inputs.answered.clone(),
            feedback: inputs.feedback.cloned(),
        }
    }
}

impl LayerDiff for BaseKey {
    fn is_dirty(prev: &Self, next: &Self) -> bool {
        // Wrong feedback is transient and painted by the highlight layer
        let feedback_dirty =
            prev.feedback != next.feedback && !matches!(&next.feedback, Some(f) if !f.is_correct);
        prev.theme != next.theme
            || prev.regions != next.regions
            || prev.projector != next.projector
            || prev.answered != next.answered
            || feedback_dirty
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HighlightKey {
    pub theme: Theme,
    pub regions: u64,
    pub projector: u64,
    pub hovered: Option<String>,
    /// Region of the latest wrong guess
    pub wrong: Option<String>,
}

impl HighlightKey {
    pub fn from_inputs(inputs: &LayerInputs<'_>) -> Self {
        Self {
            theme: inputs.theme,
            regions: inputs.regions.generation(),
            projector: inputs.projector.generation(),
            hovered: inputs.hovered.map(str::to_string),
            wrong: inputs
                .feedback
                .filter(|f| !f.is_correct)
                .map(|f| f.region_code.clone()),
        }
    }
}

impl LayerDiff for HighlightKey {
    fn is_dirty(prev: &Self, next: &Self) -> bool {
        prev != next
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InteractionKey {
    pub regions: u64,
    pub projector: u64,
    pub game_state: GameState,
    pub answered: BTreeSet<String>,
}

impl InteractionKey {
    pub fn from_inputs(inputs: &LayerInputs<'_>) -> Self {
        Self {
            regions: inputs.regions.generation(),
            projector: inputs.projector.generation(),
            game_state: inputs.game_state,
            answered: inputs.answered.clone(),
        }
    }
}

impl LayerDiff for InteractionKey {
    fn is_dirty(prev: &Self, next: &Self) -> bool {
        prev.regions != next.regions
            || prev.projector != next.projector
            || prev.game_state != next.game_state
            || prev.answered != next.answered
    }
}

/// Projected geometry of one region, shared by the three layers
#[derive(Clone, Debug)]
pub struct RegionShape {
    pub index: usize,
    pub code: String,
    pub path: ProjectedPath,
    pub mesh: FillMesh,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegionPaint {
    /// Index of the region in its collection
    pub index: usize,
    pub code: String,
    pub status: RegionStatus,
    pub fill: Color,
    pub stroke: Color,
    /// Stroke width in screen pixels
    pub stroke_px: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HighlightPaint {
    pub index: usize,
    pub code: String,
    /// `None` for stroke-only emphasis
    pub fill: Option<Color>,
    pub stroke: Color,
    pub stroke_px: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cursor {
    Default,
    Pointer,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HitTarget {
    pub index: usize,
    pub code: String,
    pub cursor: Cursor,
    /// Answered regions take no hover or click
    pub enabled: bool,
}

/// Pointer input in screen pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Move(Coord<f64>),
    Leave,
    Click(Coord<f64>),
    ContextMenu(Coord<f64>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionEvent {
    /// Emitted only when the hovered region changes
    Hover(Option<String>),
    Click(String),
    ContextMenu(String),
}

/// Memo slot shared by the three layers
#[derive(Debug)]
struct Memo<K, T> {
    key: Option<K>,
    output: Vec<T>,
    renders: u64,
}

impl<K, T> Default for Memo<K, T> {
    fn default() -> Self {
        Self {
            key: None,
            output: Vec::new(),
            renders: 0,
        }
    }
}

impl<K: LayerDiff, T> Memo<K, T> {
    /// Re-render through `render` if `key` is dirty; returns whether it did
    fn update(&mut self, key: K, render: impl FnOnce(&K) -> Vec<T>) -> bool {
        if self.key.as_ref().is_some_and(|prev| !K::is_dirty(prev, &key)) {
            return false;
        }
        self.output = render(&key);
        self.key = Some(key);
        self.renders += 1;
        true
    }
}

/// Fill and stroke of every region, ordered by status rank
#[derive(Debug, Default)]
pub struct BaseLayer {
    memo: Memo<BaseKey, RegionPaint>,
}

impl BaseLayer {
    pub fn paints(&self) -> &[RegionPaint] {
        &self.memo.output
    }

    pub fn render_count(&self) -> u64 {
        self.memo.renders
    }

    fn render(key: &BaseKey, shapes: &[RegionShape]) -> Vec<RegionPaint> {
        profiling::scope!("BaseLayer::render");
        let colors = key.theme.colors();
        let correct = key.feedback.as_ref().filter(|f| f.is_correct);
        let mut paints: Vec<RegionPaint> = shapes
            .iter()
            .map(|shape| {
                let status = RegionStatus::of(&shape.code, &key.answered, correct);
                let (fill, stroke) = match status {
                    RegionStatus::Default | RegionStatus::WrongFeedback => {
                        (colors.region_fill(&shape.code), colors.stroke)
                    }
                    RegionStatus::Answered => (colors.answered_fill, colors.answered_stroke),
                    RegionStatus::CorrectFeedback => (colors.correct_fill, colors.correct_stroke),
                };
                RegionPaint {
                    index: shape.index,
                    code: shape.code.clone(),
                    status,
                    fill,
                    stroke,
                    stroke_px: 1.0,
                }
            })
            .collect();
        paints.sort_by_key(|p| p.status);
        paints
    }
}

/// Hovered region and the latest wrong guess
#[derive(Debug, Default)]
pub struct HighlightLayer {
    memo: Memo<HighlightKey, HighlightPaint>,
}

impl HighlightLayer {
    /// At most two paints: the wrong-guess flash first, then the hover stroke
    pub fn paints(&self) -> &[HighlightPaint] {
        &self.memo.output
    }

    pub fn render_count(&self) -> u64 {
        self.memo.renders
    }

    fn render(
        key: &HighlightKey,
        regions: &FeatureCollection,
        shapes: &[RegionShape],
        slots: &[Option<usize>],
    ) -> Vec<HighlightPaint> {
        let colors = key.theme.colors();
        let shape_of = |code: &str| {
            let index = regions.index_of(code)?;
            let slot = (*slots.get(index)?)?;
            shapes.get(slot)
        };
        let mut paints = Vec::with_capacity(2);
        if let Some(shape) = key.wrong.as_deref().and_then(shape_of) {
            paints.push(HighlightPaint {
                index: shape.index,
                code: shape.code.clone(),
                fill: Some(colors.wrong_fill),
                stroke: colors.wrong_stroke,
                stroke_px: 1.0,
            });
        }
        if let Some(shape) = key.hovered.as_deref().and_then(shape_of) {
            paints.push(HighlightPaint {
                index: shape.index,
                code: shape.code.clone(),
                fill: None,
                stroke: colors.hover_stroke,
                stroke_px: 1.5,
            });
        }
        paints
    }
}

/// Transparent hit targets
#[derive(Debug, Default)]
pub struct InteractionLayer {
    memo: Memo<InteractionKey, HitTarget>,
}

impl InteractionLayer {
    pub fn targets(&self) -> &[HitTarget] {
        &self.memo.output
    }

    pub fn render_count(&self) -> u64 {
        self.memo.renders
    }

    fn render(key: &InteractionKey, shapes: &[RegionShape]) -> Vec<HitTarget> {
        shapes
            .iter()
            .map(|shape| {
                let answered = key.answered.contains(&shape.code);
                let cursor = if key.game_state.accepts_picks() && !answered {
                    Cursor::Pointer
                } else {
                    Cursor::Default
                };
                HitTarget {
                    index: shape.index,
                    code: shape.code.clone(),
                    cursor,
                    enabled: !answered,
                }
            })
            .collect()
    }
}

/// Owner of the region shapes and of the three layers
#[derive(Debug, Default)]
pub struct LayerCompositor {
    /// (regions, projector) generations the shapes were built for
    shapes_key: Option<(u64, u64)>,
    shapes: Vec<RegionShape>,
    /// Region index to position in `shapes`
    slots: Vec<Option<usize>>,
    base: BaseLayer,
    highlight: HighlightLayer,
    interaction: InteractionLayer,
    pointer_hover: Option<String>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl LayerCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring every layer up to date with `inputs`
    ///
    /// Returns how many layers re-rendered.
    pub fn compose(&mut self, inputs: &LayerInputs<'_>) -> usize {
        profiling::scope!("LayerCompositor::compose");
        self.ensure_shapes(inputs.regions, inputs.projector);

        let shapes = &self.shapes;
        let slots = &self.slots;
        let regions = inputs.regions.as_ref();
        let mut rendered = 0;
        if self
            .base
            .memo
            .update(BaseKey::from_inputs(inputs), |key| BaseLayer::render(key, shapes))
        {
            rendered += 1;
        }
        if self
            .highlight
            .memo
            .update(HighlightKey::from_inputs(inputs), |key| {
                HighlightLayer::render(key, regions, shapes, slots)
            })
        {
            rendered += 1;
        }
        if self
            .interaction
            .memo
            .update(InteractionKey::from_inputs(inputs), |key| {
                InteractionLayer::render(key, shapes)
            })
        {
            rendered += 1;
        }
        if rendered > 0 {
            tracing::trace!("Composed map layers, {} re-rendered", rendered);
        }
        rendered
    }

    fn ensure_shapes(&mut self, regions: &FeatureCollection, projector: &GeometryProjector) {
        let key = (regions.generation(), projector.generation());
        if self.shapes_key == Some(key) {
            return;
        }
        profiling::scope!("LayerCompositor::build_shapes");
        self.shapes.clear();
        self.slots = vec![None; regions.len()];
        for (index, (code, feature)) in regions.iter().enumerate() {
            let Some(path) = projector.project(&feature.geometry) else {
                continue;
            };
            let mesh = path.triangulate();
            self.slots[index] = Some(self.shapes.len());
            self.shapes.push(RegionShape {
                index,
                code: code.to_string(),
                path,
                mesh,
            });
        }
        self.shapes_key = Some(key);
        self.pointer_hover = None;
        tracing::debug!(
            "Built {} region shapes out of {} features",
            self.shapes.len(),
            regions.len()
        );
    }

    pub fn shapes(&self) -> &[RegionShape] {
        &self.shapes
    }

    /// Shape of the region at `index` in its collection
    pub fn shape(&self, index: usize) -> Option<&RegionShape> {
        let slot = (*self.slots.get(index)?)?;
        self.shapes.get(slot)
    }

    pub fn base(&self) -> &BaseLayer {
        &self.base
    }

    pub fn highlight(&self) -> &HighlightLayer {
        &self.highlight
    }

    pub fn interaction(&self) -> &InteractionLayer {
        &self.interaction
    }

    /// Topmost hit target under a screen position
    pub fn hit_test(&self, screen: Coord<f64>, transform: &Transform) -> Option<&HitTarget> {
        let map = transform.invert(screen);
        self.interaction
            .targets()
            .iter()
            .rev()
            .find(|target| self.shape(target.index).is_some_and(|s| s.path.contains(map)))
    }

    /// Translate a pointer event into a map interaction
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        transform: &Transform,
    ) -> Option<InteractionEvent> {
        match event {
            PointerEvent::Move(screen) => {
                let hovered = self
                    .hit_test(screen, transform)
                    .filter(|t| t.enabled)
                    .map(|t| t.code.clone());
                self.set_pointer_hover(hovered)
            }
            PointerEvent::Leave => self.set_pointer_hover(None),
            PointerEvent::Click(screen) => self
                .hit_test(screen, transform)
                .filter(|t| t.enabled)
                .map(|t| InteractionEvent::Click(t.code.clone())),
            PointerEvent::ContextMenu(screen) => self
                .hit_test(screen, transform)
                .map(|t| InteractionEvent::ContextMenu(t.code.clone())),
        }
    }

    fn set_pointer_hover(&mut self, hovered: Option<String>) -> Option<InteractionEvent> {
        if self.pointer_hover == hovered {
            return None;
        }
        self.pointer_hover.clone_from(&hovered);
        Some(InteractionEvent::Hover(hovered))
    }
}
