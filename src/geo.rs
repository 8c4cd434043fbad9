//! Geographic projection
//!
//! Converts latitude/longitude to layer pixels for the current map view.
//! [`MapView`] uses spherical Web Mercator with 256-pixel tiles, the same
//! convention slippy-map libraries use for their layer points.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Spherical Mercator earth radius in meters
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude limit that keeps the projected world square
const MAX_LATITUDE_DEG: f64 = 85.051_128_779_8;

/// Tile edge length in pixels at zoom 0
const TILE_SIZE: f64 = 256.0;

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A planar point (or displacement) in layer pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    fn round(self) -> Point {
        Point::new(self.x.round(), self.y.round())
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Converts geographic coordinates to planar pixel coordinates
pub trait GeoProjector {
    fn project(&self, at: LatLng) -> Point;
}

impl<F> GeoProjector for F
where
    F: Fn(LatLng) -> Point,
{
    fn project(&self, at: LatLng) -> Point {
        self(at)
    }
}

/// Map view state: center, zoom and viewport size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl MapView {
    pub fn new(center: LatLng, zoom: f64, width: f64, height: f64) -> Self {
        Self {
            center,
            zoom,
            width,
            height,
        }
    }

    /// Same viewport, new center
    pub fn pan_to(self, center: LatLng) -> Self {
        Self { center, ..self }
    }

    /// Same viewport, new zoom level
    pub fn zoom_to(self, zoom: f64) -> Self {
        Self { zoom, ..self }
    }

    fn world_size(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.zoom)
    }

    /// Absolute pixel position of a coordinate in the world at this zoom
    fn world_pixel(&self, at: LatLng) -> Point {
        let lat = at.lat.clamp(-MAX_LATITUDE_DEG, MAX_LATITUDE_DEG).to_radians();
        let mx = EARTH_RADIUS_M * at.lon.to_radians();
        let my = EARTH_RADIUS_M * (FRAC_PI_4 + lat / 2.0).tan().ln();
        let k = 0.5 / (PI * EARTH_RADIUS_M);
        let size = self.world_size();
        Point::new(size * (k * mx + 0.5), size * (-k * my + 0.5))
    }

    /// World pixel of the viewport's top-left corner
    fn pixel_origin(&self) -> Point {
        let half = Point::new(self.width / 2.0, self.height / 2.0);
        (self.world_pixel(self.center) - half).round()
    }

    /// Inverse of [`GeoProjector::project`]
    pub fn unproject(&self, point: Point) -> LatLng {
        let world = point + self.pixel_origin();
        let size = self.world_size();
        let k = 0.5 / (PI * EARTH_RADIUS_M);
        let mx = (world.x / size - 0.5) / k;
        let my = -(world.y / size - 0.5) / k;
        let lon = (mx / EARTH_RADIUS_M).to_degrees();
        let lat = (2.0 * (my / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees();
        LatLng::new(lat, lon)
    }
}

impl GeoProjector for MapView {
    fn project(&self, at: LatLng) -> Point {
        self.world_pixel(at) - self.pixel_origin()
    }
}
