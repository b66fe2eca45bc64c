//! Cartographic projection and path generation
//!
//! A [`GeometryProjector`] maps lon/lat geometry to screen pixels at `k = 1` using a spherical
//! Mercator projection. It is a pure function of its configuration and the viewport size; a new
//! viewport means a new projector, and every index built on the old one is rebuilt.

use crate::feature::FeatureCollection;
use crate::{MapError, Result, utils};
use earcutr::earcut;
use geo::{
    Area, BoundingRect, Centroid, Contains, Coord, Geometry, LineString, MapCoords, Point, Polygon,
    Rect,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed projection parameters
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProjectionConfig {
    /// Longitude (degrees) placed at the viewport center
    pub center_lon: f64,
    /// Latitude (degrees) placed at the viewport center
    pub center_lat: f64,
    /// Pixels per radian of longitude
    pub scale: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            center_lon: 127.25,
            center_lat: 37.55,
            scale: 8000.0,
        }
    }
}

/// Mercator projector bound to one viewport size
#[derive(Clone, Debug)]
pub struct GeometryProjector {
    /// Web Mercator meters of the point drawn at the viewport center
    origin: Coord<f64>,
    pixels_per_meter: f64,
    width: f64,
    height: f64,
    generation: u64,
}

fn validate_viewport(width: f64, height: f64) -> Result<()> {
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(MapError::InvalidViewport { width, height });
    }
    Ok(())
}

impl GeometryProjector {
    pub fn new(config: &ProjectionConfig, width: f64, height: f64) -> Result<Self> {
        validate_viewport(width, height)?;
        if !(config.scale.is_finite() && config.scale > 0.0) {
            return Err(MapError::InvalidConfig(format!(
                "projection scale must be positive, got {}",
                config.scale
            )));
        }
        let origin = utils::wgs84_to_mercator(config.center_lat, config.center_lon);
        Ok(Self {
            origin: origin.0,
            pixels_per_meter: config.scale / utils::MERCATOR_RADIUS_M,
            width,
            height,
            generation: utils::next_generation(),
        })
    }

    /// Fit the bounds of `collection` inside the viewport minus `padding` pixels per side
    ///
    /// Falls back to `fallback` when the collection has no extent (empty or a single point).
    pub fn fit_extent(
        collection: &FeatureCollection,
        width: f64,
        height: f64,
        padding: f64,
        fallback: &ProjectionConfig,
    ) -> Result<Self> {
        validate_viewport(width, height)?;
        let mercator_bounds = collection
            .features()
            .iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .map(|r| {
                Rect::new(
                    utils::wgs84_to_mercator(r.min().y, r.min().x).0,
                    utils::wgs84_to_mercator(r.max().y, r.max().x).0,
                )
            })
            .reduce(utils::union_rect);

        let Some(bounds) = mercator_bounds else {
            return Self::new(fallback, width, height);
        };
        let inner_w = (width - 2.0 * padding).max(1.0);
        let inner_h = (height - 2.0 * padding).max(1.0);
        let fit = (inner_w / bounds.width()).min(inner_h / bounds.height());
        if !fit.is_finite() || fit <= 0.0 {
            return Self::new(fallback, width, height);
        }

        tracing::debug!(
            "Fitted projection to {} features: {:.6} px/m",
            collection.len(),
            fit
        );
        Ok(Self {
            origin: bounds.center(),
            pixels_per_meter: fit,
            width,
            height,
            generation: utils::next_generation(),
        })
    }

    /// Project a lon/lat coordinate to screen pixels at `k = 1`
    #[inline(always)]
    pub fn project_coord(&self, c: Coord<f64>) -> Coord<f64> {
        let m = utils::wgs84_to_mercator(c.y, c.x);
        Coord {
            x: self.width / 2.0 + (m.x() - self.origin.x) * self.pixels_per_meter,
            y: self.height / 2.0 - (m.y() - self.origin.y) * self.pixels_per_meter,
        }
    }

    /// Screen pixels at `k = 1` back to lon/lat
    pub fn invert(&self, p: Coord<f64>) -> Coord<f64> {
        let mx = self.origin.x + (p.x - self.width / 2.0) / self.pixels_per_meter;
        let my = self.origin.y - (p.y - self.height / 2.0) / self.pixels_per_meter;
        let (lat, lon) = utils::mercator_to_wgs84(mx, my);
        Coord { x: lon, y: lat }
    }

    /// Generate the projected path of a geometry, `None` if it would be empty
    pub fn project(&self, geometry: &Geometry<f64>) -> Option<ProjectedPath> {
        let projected = geometry.map_coords(|c| self.project_coord(c));

        let mut outlines = Vec::new();
        let mut polygons = Vec::new();
        collect_parts(&projected, &mut outlines, &mut polygons);
        outlines.retain(|o: &Vec<Coord<f64>>| o.len() >= 2);
        if outlines.is_empty() {
            return None;
        }

        let bounds = projected.bounding_rect()?;
        if !utils::is_finite_rect(&bounds) {
            return None;
        }
        let centroid = projected
            .centroid()
            .map(|p| p.0)
            .unwrap_or_else(|| bounds.center());
        let area: f64 = polygons.iter().map(|p| p.unsigned_area()).sum();

        Some(ProjectedPath {
            outlines,
            polygons,
            bounds,
            centroid,
            area,
        })
    }

    pub fn viewport(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn pixels_per_meter(&self) -> f64 {
        self.pixels_per_meter
    }

    /// Changes whenever a projector is constructed
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn collect_parts(
    geometry: &Geometry<f64>,
    outlines: &mut Vec<Vec<Coord<f64>>>,
    polygons: &mut Vec<Polygon<f64>>,
) {
    match geometry {
        Geometry::Polygon(p) => push_polygon(p.clone(), outlines, polygons),
        Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                push_polygon(p.clone(), outlines, polygons);
            }
        }
        Geometry::Rect(r) => push_polygon(r.to_polygon(), outlines, polygons),
        Geometry::Triangle(t) => push_polygon(t.to_polygon(), outlines, polygons),
        Geometry::LineString(ls) => outlines.push(ls.0.clone()),
        Geometry::MultiLineString(mls) => {
            outlines.extend(mls.0.iter().map(|ls| ls.0.clone()));
        }
        Geometry::Line(l) => outlines.push(vec![l.start, l.end]),
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect_parts(g, outlines, polygons);
            }
        }
        // Points have no path
        Geometry::Point(_) | Geometry::MultiPoint(_) => {}
    }
}

fn push_polygon(
    polygon: Polygon<f64>,
    outlines: &mut Vec<Vec<Coord<f64>>>,
    polygons: &mut Vec<Polygon<f64>>,
) {
    if polygon.exterior().0.len() < 3 {
        return;
    }
    outlines.push(polygon.exterior().0.clone());
    outlines.extend(polygon.interiors().iter().map(|r| r.0.clone()));
    polygons.push(polygon);
}

/// Projected geometry in screen pixels at `k = 1`
#[derive(Clone, Debug)]
pub struct ProjectedPath {
    /// Polylines to stroke (polygon rings are closed)
    outlines: Vec<Vec<Coord<f64>>>,
    /// Fillable parts (empty for roads)
    polygons: Vec<Polygon<f64>>,
    bounds: Rect<f64>,
    centroid: Coord<f64>,
    area: f64,
}

impl ProjectedPath {
    pub fn outlines(&self) -> &[Vec<Coord<f64>>] {
        &self.outlines
    }

    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    pub fn centroid(&self) -> Coord<f64> {
        self.centroid
    }

    /// Area in square pixels at `k = 1` (zero for lines)
    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn is_fillable(&self) -> bool {
        !self.polygons.is_empty()
    }

    /// Hit test in projected pixels at `k = 1`
    pub fn contains(&self, c: Coord<f64>) -> bool {
        if !utils::rect_contains_coord(&self.bounds, c) {
            return false;
        }
        let point = Point::from(c);
        self.polygons.iter().any(|p| p.contains(&point))
    }

    /// Triangulate the fillable parts
    pub fn triangulate(&self) -> FillMesh {
        profiling::scope!("ProjectedPath::triangulate");
        let mut mesh = FillMesh::default();
        for polygon in &self.polygons {
            mesh.append_polygon(polygon);
        }
        mesh
    }
}

/// Triangle mesh of a filled path, vertices in projected pixels at `k = 1`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FillMesh {
    pub vertices: Vec<Coord<f64>>,
    pub indices: Vec<u32>,
}

impl FillMesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn append_polygon(&mut self, polygon: &Polygon<f64>) {
        let mut coords_2d: Vec<f64> = Vec::new();
        let mut hole_indices: Vec<usize> = Vec::new();
        let mut ring_vertices: Vec<Coord<f64>> = Vec::new();

        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        for (ring_i, ring) in rings.enumerate() {
            let points = open_ring(ring);
            if points.len() < 3 {
                if ring_i == 0 {
                    return;
                }
                continue;
            }
            if ring_i > 0 {
                hole_indices.push(ring_vertices.len());
            }
            for c in points {
                coords_2d.push(c.x);
                coords_2d.push(c.y);
                ring_vertices.push(*c);
            }
        }

        let triangles = match earcut(&coords_2d, &hole_indices, 2) {
            Ok(ix) => ix,
            Err(_) => {
                tracing::warn!(
                    "Skipping untriangulable polygon with {} vertices",
                    ring_vertices.len()
                );
                return;
            }
        };

        let base = self.vertices.len() as u32;
        self.vertices.extend(ring_vertices);
        self.indices
            .extend(triangles.into_iter().map(|i| base + i as u32));
    }
}

/// Ring points without the closing duplicate
fn open_ring(ring: &LineString<f64>) -> &[Coord<f64>] {
    let points = ring.0.as_slice();
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() >= 2 && first == last => {
            &points[..points.len() - 1]
        }
        _ => points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;
    use geo::{LineString, Point, polygon};

    fn projector() -> GeometryProjector {
        GeometryProjector::new(&ProjectionConfig::default(), 800.0, 600.0).unwrap()
    }

    #[test]
    fn test_center_projects_to_viewport_center() {
        let p = projector();
        let c = p.project_coord(Coord {
            x: 127.25,
            y: 37.55,
        });
        assert!((c.x - 400.0).abs() < 1e-6);
        assert!((c.y - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_north_is_up_and_east_is_right() {
        let p = projector();
        let center = p.project_coord(Coord { x: 127.25, y: 37.55 });
        let north_east = p.project_coord(Coord { x: 127.35, y: 37.65 });
        assert!(north_east.x > center.x);
        assert!(north_east.y < center.y);
    }

    #[test]
    fn test_scale_is_pixels_per_radian() {
        let p = projector();
        let a = p.project_coord(Coord { x: 127.25, y: 37.55 });
        let b = p.project_coord(Coord {
            x: 127.25 + 1.0_f64.to_degrees(),
            y: 37.55,
        });
        assert!((b.x - a.x - 8000.0).abs() < 1e-6);
    }

    #[test]
    fn test_invert_roundtrip() {
        let p = projector();
        let lonlat = Coord { x: 127.0, y: 37.3 };
        let back = p.invert(p.project_coord(lonlat));
        assert!((back.x - lonlat.x).abs() < 1e-9);
        assert!((back.y - lonlat.y).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_viewport() {
        let config = ProjectionConfig::default();
        assert!(matches!(
            GeometryProjector::new(&config, 0.0, 600.0),
            Err(MapError::InvalidViewport { .. })
        ));
        assert!(GeometryProjector::new(&config, f64::NAN, 600.0).is_err());
    }

    #[test]
    fn test_point_geometry_has_no_path() {
        let p = projector();
        assert!(p.project(&Geometry::Point(Point::new(127.0, 37.5))).is_none());
        let degenerate = Geometry::LineString(LineString::from(vec![(127.0, 37.5)]));
        assert!(p.project(&degenerate).is_none());
    }

    #[test]
    fn test_polygon_path_area_and_contains() {
        let p = projector();
        let square = polygon![
            (x: 127.2, y: 37.5),
            (x: 127.3, y: 37.5),
            (x: 127.3, y: 37.6),
            (x: 127.2, y: 37.6),
            (x: 127.2, y: 37.5),
        ];
        let path = p.project(&Geometry::Polygon(square)).unwrap();
        let b = path.bounds();
        assert!((path.area() - b.width() * b.height()).abs() / path.area() < 1e-6);
        assert!(path.contains(path.centroid()));
        assert!(!path.contains(Coord { x: b.max().x + 1.0, y: b.min().y }));
        assert!(path.is_fillable());

        let mesh = path.triangulate();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
    }

    #[test]
    fn test_line_path_has_zero_area() {
        let p = projector();
        let road = LineString::from(vec![(127.2, 37.5), (127.3, 37.6)]);
        let path = p.project(&Geometry::LineString(road)).unwrap();
        assert_eq!(path.area(), 0.0);
        assert!(!path.is_fillable());
        assert!(path.triangulate().is_empty());
        assert_eq!(path.outlines().len(), 1);
    }

    #[test]
    fn test_fit_extent_keeps_features_inside_padding() {
        let collection = FeatureCollection::new(vec![
            Feature::region(
                "A",
                "A",
                polygon![(x: 126.0, y: 37.0), (x: 127.0, y: 37.0), (x: 127.0, y: 38.0)],
            ),
            Feature::region(
                "B",
                "B",
                polygon![(x: 128.0, y: 36.0), (x: 129.0, y: 36.0), (x: 129.0, y: 36.5)],
            ),
        ]);
        let p = GeometryProjector::fit_extent(
            &collection,
            800.0,
            600.0,
            20.0,
            &ProjectionConfig::default(),
        )
        .unwrap();
        for feature in collection.features() {
            let b = p.project(&feature.geometry).unwrap().bounds();
            assert!(b.min().x >= 20.0 - 1e-6 && b.max().x <= 780.0 + 1e-6);
            assert!(b.min().y >= 20.0 - 1e-6 && b.max().y <= 580.0 + 1e-6);
        }
    }

    #[test]
    fn test_fit_extent_empty_falls_back() {
        let config = ProjectionConfig::default();
        let p = GeometryProjector::fit_extent(&FeatureCollection::empty(), 800.0, 600.0, 20.0, &config)
            .unwrap();
        assert!((p.pixels_per_meter() - config.scale / utils::MERCATOR_RADIUS_M).abs() < 1e-12);
    }
}
