use noisy_float::prelude::*;
use serde::{Deserialize, Serialize};

/// A particle four-momentum
///
/// The zero component is the energy. The remaining three are the
/// spatial momentum components. No unit conventions or on-shell
/// conditions are imposed.
#[derive(
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Clone,
    Copy,
    Default,
)]
pub struct FourVector {
    pt: N64,
    p: [N64; 4],
}

impl FourVector {
    /// Construct a four-vector from energy and spatial momentum components
    pub fn new(e: N64, px: N64, py: N64, pz: N64) -> Self {
        [e, px, py, pz].into()
    }

    /// The euclidean norm \sqrt{\sum v_\mu^2} with \mu = 0,1,2,3
    pub fn euclid_norm(&self) -> N64 {
        self.euclid_norm_sq().sqrt()
    }

    /// The square \sum v_\mu^2 with \mu = 0,1,2,3 of the euclidean norm
    pub fn euclid_norm_sq(&self) -> N64 {
        self.p.iter().map(|e| *e * *e).sum()
    }

    /// The spatial norm \sqrt{\sum v_i^2} with i = 1,2,3
    pub fn spatial_norm(&self) -> N64 {
        self.spatial_norm_sq().sqrt()
    }

    /// The square \sum v_i^2 with i = 1,2,3 of the spatial norm
    pub fn spatial_norm_sq(&self) -> N64 {
        self.p.iter().skip(1).map(|e| *e * *e).sum()
    }

    /// The scalar transverse momentum
    pub fn pt(&self) -> N64 {
        self.pt
    }

    /// The energy component
    pub fn energy(&self) -> N64 {
        self.p[0]
    }

    const fn len() -> usize {
        4
    }

    fn update_pt(&mut self) {
        self.pt = (self.p[1] * self.p[1] + self.p[2] * self.p[2]).sqrt();
    }
}

impl From<[N64; 4]> for FourVector {
    fn from(p: [N64; 4]) -> FourVector {
        let mut res = FourVector {
            p,
            pt: N64::default(),
        };
        res.update_pt();
        res
    }
}

impl From<[f64; 4]> for FourVector {
    fn from(p: [f64; 4]) -> FourVector {
        p.map(n64).into()
    }
}

impl std::ops::Index<usize> for FourVector {
    type Output = N64;

    fn index(&self, i: usize) -> &Self::Output {
        &self.p[i]
    }
}

impl std::ops::AddAssign for FourVector {
    fn add_assign(&mut self, rhs: FourVector) {
        for i in 0..Self::len() {
            self.p[i] += rhs[i]
        }
        self.update_pt();
    }
}

impl std::ops::SubAssign for FourVector {
    fn sub_assign(&mut self, rhs: FourVector) {
        for i in 0..Self::len() {
            self.p[i] -= rhs[i]
        }
        self.update_pt();
    }
}

impl std::ops::Add for FourVector {
    type Output = Self;

    fn add(mut self, rhs: FourVector) -> Self::Output {
        self += rhs;
        self
    }
}

impl std::ops::Sub for FourVector {
    type Output = Self;

    fn sub(mut self, rhs: FourVector) -> Self::Output {
        self -= rhs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pt_is_cached() {
        let p = FourVector::from([5., 3., 4., 0.]);
        assert_eq!(p.pt(), n64(5.));
        let q = p - FourVector::from([0., 3., 0., 0.]);
        assert_eq!(q.pt(), n64(4.));
    }

    #[test]
    fn norms() {
        let p = FourVector::from([2., 0., 3., 4.]);
        assert_eq!(p.spatial_norm(), n64(5.));
        assert_eq!(p.euclid_norm_sq(), n64(29.));
    }

    #[test]
    fn arithmetic() {
        let p = FourVector::from([1., 2., 3., 4.]);
        let q = FourVector::from([4., 3., 2., 1.]);
        assert_eq!(p + q, FourVector::from([5., 5., 5., 5.]));
        assert_eq!((p + q) - q, p);
    }
}
