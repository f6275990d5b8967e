/// Exponential linear unit.
#[derive(Clone, Copy, Debug)]
pub struct Elu {
    alpha: f32,
}

impl Default for Elu {
    fn default() -> Self {
        Self { alpha: 1. }
    }
}

impl Elu {
    pub fn new(alpha: f32) -> Self {
        Self { alpha }
    }

    pub fn f(&self, z: f32) -> f32 {
        if z > 0. {
            z
        } else {
            self.alpha * z.exp_m1()
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        if z > 0. { 1. } else { self.alpha * z.exp() }
    }
}
