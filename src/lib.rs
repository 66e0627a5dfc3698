//! Unit-aware variables and the relations between them.
//!
//! A [`Relation`] ties an [`Equation`] to a set of [`Variable`]s. When every
//! variable but one has a value, the relation can be solved numerically for
//! the remaining one, with units converted along the way.
//!
//! ```rust
//! use relations::{Relation, SolveOptions, UnitRegistry, Variable};
//!
//! let units = UnitRegistry::global();
//! let v1 = Variable::new("v_1", units.parse_unit("m^2/s^2")?)
//!     .with_magnitude(45.0)?;
//! let x1 = Variable::new("x_1", units.parse_unit("ft/s")?);
//!
//! let relation =
//!     Relation::new(vec![x1.clone(), v1.clone()], "x_1^2 = v_1".parse()?)?;
//! let options = SolveOptions {
//!     verbose: false,
//!     ..Default::default()
//! };
//! relation.solve_with(&[x1.clone(), v1], &options)?;
//!
//! assert!((x1.magnitude()? - 22.0085).abs() < 1e-3);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod algebra;
mod equations;
mod error;
mod relation;
pub mod solve;
pub mod units;
mod variable;

pub use algebra::{Expression, Parameter};
pub use equations::Equation;
pub use error::Error;
pub use relation::{Pairing, Relation, RelationBuilder, SolveOptions};
pub use solve::{SolveError, SolverConfig};
pub use units::{Dimension, Unit, UnitError, UnitQuantity, UnitRegistry};
pub use variable::{Value, Variable};
