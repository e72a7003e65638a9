pub mod curve;
pub mod normalize;
pub mod row;
pub use curve::{assemble, Assembly, CurvePoint, CurveRecord};
pub use normalize::{dilution_series, NormalizedMatrix, Normalizer};
pub use row::{
    parse_initial_concentration, AssayRow, AssayRowBuilder, RawAssayMatrix,
    DEFAULT_INITIAL_CONCENTRATION, DILUTION_WELLS,
};
