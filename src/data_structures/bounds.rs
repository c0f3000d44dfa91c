//! Axis-aligned bounding boxes used for spatial partitioning and culling.

use cgmath::{Point3, Vector3};

/// An axis-aligned box given by its minimum and maximum corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// A cube centred on the origin with the given half extent.
    pub fn cube(half_extent: f32) -> Self {
        Self {
            min: Point3::new(-half_extent, -half_extent, -half_extent),
            max: Point3::new(half_extent, half_extent, half_extent),
        }
    }

    /// Smallest box enclosing all points, `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3<f32>>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |acc, p| Self {
            min: Point3::new(acc.min.x.min(p.x), acc.min.y.min(p.y), acc.min.z.min(p.z)),
            max: Point3::new(acc.max.x.max(p.x), acc.max.y.max(p.y), acc.max.z.max(p.z)),
        }))
    }

    pub fn centre(&self) -> Point3<f32> {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// True if `other` lies completely inside `self` (touching faces count as inside).
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// The eight sub-boxes produced by splitting at the centre, ordered by
    /// the bit pattern `x | y << 1 | z << 2` (bit set means upper half).
    pub fn octants(&self) -> [Aabb; 8] {
        let c = self.centre();
        std::array::from_fn(|i| {
            let (lx, hx) = if i & 1 == 0 { (self.min.x, c.x) } else { (c.x, self.max.x) };
            let (ly, hy) = if i & 2 == 0 { (self.min.y, c.y) } else { (c.y, self.max.y) };
            let (lz, hz) = if i & 4 == 0 { (self.min.z, c.z) } else { (c.z, self.max.z) };
            Aabb::new(Point3::new(lx, ly, lz), Point3::new(hx, hy, hz))
        })
    }
}
