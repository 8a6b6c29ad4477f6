use glam::DVec3;

/// Containment verdict between two extent boxes.
///
/// Containment is a partial order: boxes that tie, overlap, or disagree
/// across axes are `Incomparable`. Two identical boxes are `Incomparable`,
/// not equal-as-contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// The box is strictly nested inside the other on all three axes.
    Dominated,
    /// No decidable containment in either direction.
    Incomparable,
    /// The box strictly encloses the other on all three axes.
    Dominates,
}

/// Compare one axis interval of box A against the same axis of box B.
///
/// The boundary rules are asymmetric: sharing a minimum still counts as
/// nested, sharing a maximum does not. The asymmetry keeps the verdict
/// strict enough that a box never dominates itself.
pub fn axis_containment(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> Containment {
    if a_min >= b_min && a_max < b_max {
        Containment::Dominated
    } else if a_min <= b_min && a_max > b_max {
        Containment::Dominates
    } else {
        Containment::Incomparable
    }
}

/// Axis-aligned extent box in the fragment-local Cartesian frame: x and z
/// span the horizontal plane, y spans height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtentBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl ExtentBox {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Componentwise min/max envelope over per-sub-tile sample points, or
    /// `None` when either sample set is empty.
    pub fn from_sample_points(min_points: &[[f64; 3]], max_points: &[[f64; 3]]) -> Option<Self> {
        if min_points.is_empty() || max_points.is_empty() {
            return None;
        }
        let mut min = DVec3::INFINITY;
        let mut max = DVec3::NEG_INFINITY;
        for point in min_points {
            min = min.min(DVec3::from_array(*point));
        }
        for point in max_points {
            max = max.max(DVec3::from_array(*point));
        }
        Some(Self { min, max })
    }

    /// Containment verdict for `self` against `other`, combining the
    /// west-east (x), south-north (z), and height (y) axes. Decisive only
    /// when all three axes agree; everything else is `Incomparable`.
    pub fn containment(&self, other: &ExtentBox) -> Containment {
        let west_east = axis_containment(self.min.x, self.max.x, other.min.x, other.max.x);
        let south_north = axis_containment(self.min.z, self.max.z, other.min.z, other.max.z);
        let height = axis_containment(self.min.y, self.max.y, other.min.y, other.max.y);
        let all = [west_east, south_north, height];
        if all == [Containment::Dominated; 3] {
            Containment::Dominated
        } else if all == [Containment::Dominates; 3] {
            Containment::Dominates
        } else {
            Containment::Incomparable
        }
    }

    /// Taxicab size proxy: the sum of the three edge lengths. Not a true
    /// volume; used only to break ties between incomparable boxes.
    pub fn taxicab_size(&self) -> f64 {
        (self.max - self.min).element_sum()
    }

    /// Longest edge across all three axes.
    pub fn longest_edge(&self) -> f64 {
        (self.max - self.min).max_element()
    }
}
