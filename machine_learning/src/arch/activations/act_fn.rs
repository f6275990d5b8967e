use super::{Elu, Sigmoid, Tanh};

/// The element-wise nonlinearity applied after a layer.
#[derive(Debug, Clone, Copy)]
pub enum ActFn {
    Elu(Elu),
    Sigmoid(Sigmoid),
    Tanh(Tanh),
}

impl ActFn {
    pub fn elu(alpha: f32) -> Self {
        Self::Elu(Elu::new(alpha))
    }

    pub fn sigmoid() -> Self {
        Self::Sigmoid(Sigmoid)
    }

    pub fn tanh() -> Self {
        Self::Tanh(Tanh)
    }

    pub fn f(&self, z: f32) -> f32 {
        match self {
            Self::Elu(a) => a.f(z),
            Self::Sigmoid(a) => a.f(z),
            Self::Tanh(a) => a.f(z),
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        match self {
            Self::Elu(a) => a.df(z),
            Self::Sigmoid(a) => a.df(z),
            Self::Tanh(a) => a.df(z),
        }
    }
}
