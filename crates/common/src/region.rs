/// Geographic bounding region: a west/south/east/north rectangle in radians
/// plus a height range in meters, mirroring the six-component `region` array
/// of the tileset schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub min_height: f64,
    pub max_height: f64,
}

impl Region {
    /// Build a region from a schema-order array
    /// `[west, south, east, north, minHeight, maxHeight]`.
    pub fn from_array(values: [f64; 6]) -> Self {
        Self {
            west: values[0],
            south: values[1],
            east: values[2],
            north: values[3],
            min_height: values[4],
            max_height: values[5],
        }
    }

    /// Schema-order array form, for serialization.
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.west,
            self.south,
            self.east,
            self.north,
            self.min_height,
            self.max_height,
        ]
    }
}

/// Running componentwise extrema over contributed regions.
///
/// The fold is commutative and associative: contributions may arrive in any
/// order and still produce the same enclosing region. Whether anything
/// contributed at all is tracked explicitly, so callers can distinguish an
/// empty fold from a degenerate region.
#[derive(Debug, Clone, Copy)]
pub struct RegionBounds {
    west: f64,
    south: f64,
    east: f64,
    north: f64,
    min_height: f64,
    max_height: f64,
    contributed: bool,
}

impl RegionBounds {
    pub fn new() -> Self {
        Self {
            west: f64::INFINITY,
            south: f64::INFINITY,
            east: f64::NEG_INFINITY,
            north: f64::NEG_INFINITY,
            min_height: f64::INFINITY,
            max_height: f64::NEG_INFINITY,
            contributed: false,
        }
    }

    /// Widen the bounds to cover `region`.
    pub fn include(&mut self, region: &Region) {
        self.west = self.west.min(region.west);
        self.south = self.south.min(region.south);
        self.east = self.east.max(region.east);
        self.north = self.north.max(region.north);
        self.min_height = self.min_height.min(region.min_height);
        self.max_height = self.max_height.max(region.max_height);
        self.contributed = true;
    }

    /// The enclosing region, or `None` when nothing ever contributed.
    pub fn enclosing(&self) -> Option<Region> {
        self.contributed.then(|| Region {
            west: self.west,
            south: self.south,
            east: self.east,
            north: self.north,
            min_height: self.min_height,
            max_height: self.max_height,
        })
    }
}

impl Default for RegionBounds {
    fn default() -> Self {
        Self::new()
    }
}
