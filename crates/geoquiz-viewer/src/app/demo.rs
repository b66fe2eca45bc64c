//! Synthetic demo data: a jittered grid of districts and a few thousand roads across it

use geo::{Coord, LineString, Polygon};
use geoquiz_map::{Feature, FeatureCollection};

const WEST: f64 = 126.6;
const SOUTH: f64 = 37.0;
const SPAN_LON: f64 = 1.3;
const SPAN_LAT: f64 = 1.1;

/// Districts sharing one city prefix (and so one palette color) per side
const CITY_SIDE: usize = 3;

/// xorshift64*, enough for reproducible demo data
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        self.0.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform in [0, 1)
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }
}

/// Lattice point shared by the up to four cells around it
fn lattice(per_side: usize, seed: u64, col: usize, row: usize) -> Coord<f64> {
    let d_lon = SPAN_LON / per_side as f64;
    let d_lat = SPAN_LAT / per_side as f64;
    let border = col == 0 || row == 0 || col == per_side || row == per_side;
    let (jx, jy) = if border {
        (0.0, 0.0)
    } else {
        let mut rng = Rng::new(seed ^ ((col as u64) << 32 | row as u64));
        (rng.range(-0.3, 0.3), rng.range(-0.3, 0.3))
    };
    Coord {
        x: WEST + (col as f64 + jx) * d_lon,
        y: SOUTH + (row as f64 + jy) * d_lat,
    }
}

pub fn regions(per_side: usize, seed: u64) -> FeatureCollection {
    let per_side = per_side.max(1);
    let cities_per_row = per_side.div_ceil(CITY_SIDE);
    let mut features = Vec::with_capacity(per_side * per_side);
    for row in 0..per_side {
        for col in 0..per_side {
            let ring = vec![
                lattice(per_side, seed, col, row),
                lattice(per_side, seed, col + 1, row),
                lattice(per_side, seed, col + 1, row + 1),
                lattice(per_side, seed, col, row + 1),
                lattice(per_side, seed, col, row),
            ];
            let city = 1100 + (row / CITY_SIDE) * cities_per_row + col / CITY_SIDE;
            let district = (row % CITY_SIDE) * CITY_SIDE + col % CITY_SIDE;
            let code = format!("{city:04}{district}");
            let name = format!("District {}-{}", city - 1099, district + 1);
            features.push(Feature::region(
                code,
                name,
                Polygon::new(LineString::from(ring), vec![]),
            ));
        }
    }
    FeatureCollection::new(features)
}

/// Road class, share of the roads, number of vertices and step length (degrees)
const ROAD_MIX: [(&str, f64, usize, f64); 4] = [
    ("motorway", 0.04, 24, 0.02),
    ("trunk", 0.08, 16, 0.012),
    ("primary", 0.23, 10, 0.006),
    ("secondary", 0.65, 6, 0.003),
];

pub fn roads(count: usize, seed: u64) -> FeatureCollection {
    let mut rng = Rng::new(seed.wrapping_add(0x5EED));
    let mut features = Vec::with_capacity(count);
    for i in 0..count {
        let pick = rng.next_f64();
        let mut acc = 0.0;
        let (class, _, vertices, step) = ROAD_MIX
            .iter()
            .copied()
            .find(|(_, share, _, _)| {
                acc += share;
                pick < acc
            })
            .unwrap_or(ROAD_MIX[ROAD_MIX.len() - 1]);

        let mut heading = rng.range(0.0, std::f64::consts::TAU);
        let mut at = Coord {
            x: rng.range(WEST, WEST + SPAN_LON),
            y: rng.range(SOUTH, SOUTH + SPAN_LAT),
        };
        let mut line = Vec::with_capacity(vertices);
        line.push(at);
        for _ in 1..vertices {
            heading += rng.range(-0.4, 0.4);
            at = Coord {
                x: at.x + heading.cos() * step,
                y: at.y + heading.sin() * step * 0.8,
            };
            line.push(at);
        }

        let name = match class {
            "motorway" => Some(format!("Expressway {}", i % 40 + 1)),
            "trunk" => Some(format!("National Route {}", i % 90 + 1)),
            _ if rng.next_f64() < 0.2 => None,
            _ => Some(format!("{}-ro {}", STREETS[i % STREETS.len()], i % 30 + 1)),
        };
        let mut road = Feature::road(class, name, LineString::from(line));
        if class == "trunk" {
            road = road.with_route_ref(format!("{}", i % 90 + 1));
        }
        features.push(road);
    }
    FeatureCollection::new(features)
}

const STREETS: [&str; 8] = [
    "Sejong", "Jongno", "Eulji", "Toegye", "Dosan", "Hakdong", "Yeongdong", "Gangnam",
];
