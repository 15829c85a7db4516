use serde::{Deserialize, Serialize};

/// A 3-D intensity stack stored plane by plane, row-major within each plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelStack {
    z: usize,
    y: usize,
    x: usize,
    data: Vec<u16>,
}

impl PixelStack {
    /// Build a stack from raw samples; `None` when the sample count does not match the shape.
    pub fn new(z: usize, y: usize, x: usize, data: Vec<u16>) -> Option<Self> {
        (z.checked_mul(y)?.checked_mul(x)? == data.len()).then_some(Self { z, y, x, data })
    }

    pub fn zeros(z: usize, y: usize, x: usize) -> Self {
        Self {
            z,
            y,
            x,
            data: vec![0; z * y * x],
        }
    }

    /// Shape as `(z, y, x)`
    pub const fn shape(&self) -> (usize, usize, usize) {
        (self.z, self.y, self.x)
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn get(&self, z: usize, y: usize, x: usize) -> Option<u16> {
        if z >= self.z || y >= self.y || x >= self.x {
            return None;
        }
        self.data.get((z * self.y + y) * self.x + x).copied()
    }

    /// Lateral section at depth `z`
    pub fn xy_plane(&self, z: usize) -> Option<Plane> {
        if z >= self.z {
            return None;
        }
        let start = z * self.y * self.x;
        let values = self.data[start..start + self.y * self.x]
            .iter()
            .map(|&v| f64::from(v))
            .collect();
        Some(Plane {
            width: self.x,
            height: self.y,
            values,
        })
    }

    /// Axial section through row `y`; top row is the first plane
    pub fn xz_plane(&self, y: usize) -> Option<Plane> {
        if y >= self.y {
            return None;
        }
        let mut values = Vec::with_capacity(self.z * self.x);
        for z in 0..self.z {
            let start = (z * self.y + y) * self.x;
            values.extend(self.data[start..start + self.x].iter().map(|&v| f64::from(v)));
        }
        Some(Plane {
            width: self.x,
            height: self.z,
            values,
        })
    }
}

/// A 2-D grid of real values, row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f64>,
}

impl Plane {
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> PixelStack {
        PixelStack::new(2, 2, 3, (0..12).collect()).unwrap()
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        assert!(PixelStack::new(2, 2, 2, vec![0; 7]).is_none());
    }

    #[test]
    fn test_sections() {
        let stack = ramp();
        assert_eq!(stack.get(1, 0, 2), Some(8));
        let xy = stack.xy_plane(1).unwrap();
        assert_eq!(xy.values, vec![6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        let xz = stack.xz_plane(1).unwrap();
        assert_eq!((xz.width, xz.height), (3, 2));
        assert_eq!(xz.values, vec![3.0, 4.0, 5.0, 9.0, 10.0, 11.0]);
        assert!(stack.xz_plane(2).is_none());
    }

    #[test]
    fn test_value_range() {
        let xy = ramp().xy_plane(0).unwrap();
        assert_eq!(xy.value_range(), Some((0.0, 5.0)));
    }
}
