//! This module defines various unit types and their conversions.
//!
//! Quantities are wrapped in newtypes so that, for example, a distance can't accidentally be added
//! to a cost. Arithmetic between compatible types is defined by the `impl_mul!` and `impl_div!`
//! rules at the bottom of the file.
use float_cmp::{ApproxEq, F64Margin};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{AddAssign, Neg, SubAssign};

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::Display,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite (i.e. not infinite or NaN)
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// Returns the larger of two values
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            /// Returns the smaller of two values
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Neg for $name {
            type Output = $name;
            fn neg(self) -> $name {
                $name(-self.0)
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                $name(iter.map(|x| x.0).sum())
            }
        }

        impl<'a> Sum<&'a $name> for $name {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                $name(iter.map(|x| x.0).sum())
            }
        }

        impl ApproxEq for $name {
            type Margin = F64Margin;

            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Mul<$name> for Dimensionless {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }

        impl std::ops::Div<$name> for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

/// Represents a dimensionless quantity (fractions, weights, service levels etc.).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Default,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::Sub,
    derive_more::Display,
)]
pub struct Dimensionless(pub f64);

impl Dimensionless {
    /// Creates a new dimensionless value
    pub fn new(val: f64) -> Self {
        Self(val)
    }

    /// Returns the value as a f64.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether the underlying value is finite (i.e. not infinite or NaN)
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 / rhs.0)
    }
}

impl Sum for Dimensionless {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Dimensionless(iter.map(|x| x.0).sum())
    }
}

impl ApproxEq for Dimensionless {
    type Margin = F64Margin;

    fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
        self.0.approx_eq(other.0, margin)
    }
}

impl From<f64> for Dimensionless {
    fn from(val: f64) -> Self {
        Self(val)
    }
}

// Base quantities
unit_struct!(Money);
unit_struct!(Quantity);
unit_struct!(Miles);

// Derived quantities
unit_struct!(MoneyPerQuantity);
unit_struct!(MoneyPerMile);

// Division rules
impl_div!(Money, Quantity, MoneyPerQuantity);
impl_div!(Money, Miles, MoneyPerMile);

// Multiplication rules
impl_mul!(MoneyPerQuantity, Quantity, Money);
impl_mul!(MoneyPerMile, Miles, Money);
