//! Physical units, their dimensions, and conversions between them.

mod dimension;
mod quantity;
mod registry;
mod unit;

pub use dimension::Dimension;
pub use quantity::UnitQuantity;
pub use registry::UnitRegistry;
pub use unit::Unit;

use smol_str::SmolStr;

/// Things that can go wrong when working with units.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("Unable to convert from \"{from}\" ({}) to \"{to}\" ({})", .from.dimension(), .to.dimension())]
    Incompatible { from: Unit, to: Unit },
    #[error("There is no unit called \"{name}\"")]
    UnknownUnit { name: SmolStr },
    #[error("Unable to parse \"{text}\" as a unit: {reason}")]
    Parse { text: String, reason: String },
    #[error("\"{name}\" is already defined")]
    AlreadyDefined { name: SmolStr },
}
