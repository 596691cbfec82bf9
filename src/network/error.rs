use thiserror::Error;

/// Everything that can go wrong while assembling the model.
///
/// All variants are detected before the first simulation step runs.
/// Numeric degeneracies of the loss computation are not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Country in the information table but not in the country list
    #[error("data integrity: country {country:?} appears in the country information table but not in the country list")]
    UnknownCountry { country: String },

    /// Country in the country list but without region/code information
    #[error("data integrity: country {country:?} has no entry in the country information table")]
    MissingCountryInfo { country: String },

    /// Same identifier twice in one list
    #[error("data integrity: {list} list contains {identifier:?} more than once")]
    DuplicateIdentifier { list: &'static str, identifier: String },

    /// Lookup of a country or item that the catalog does not know
    #[error("data integrity: {kind} {identifier:?} is not part of the catalog")]
    NotInCatalog { kind: &'static str, identifier: String },

    /// Operator extent does not match the catalog
    #[error("shape mismatch in {operator}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        operator: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Entry outside of the declared operator extent
    #[error("shape mismatch in {operator}: entry ({row}, {col}) lies outside of {shape:?}")]
    EntryOutOfBounds {
        operator: String,
        row: usize,
        col: usize,
        shape: (usize, usize),
    },

    /// Operator or vector built against another composite index
    #[error("index mismatch: {operator} was built against a different composite index")]
    IndexMismatch { operator: String },
}

impl ModelError {
    /// True for catalog/mapping failures, false for operator shape failures
    pub fn is_data_integrity(&self) -> bool
    {
        matches!(
            self,
            Self::UnknownCountry { .. }
                | Self::MissingCountryInfo { .. }
                | Self::DuplicateIdentifier { .. }
                | Self::NotInCatalog { .. }
        )
    }

    /// Operator extent failures
    pub fn is_shape_mismatch(&self) -> bool
    {
        matches!(self, Self::ShapeMismatch { .. } | Self::EntryOutOfBounds { .. })
    }

    /// Short failure class for log output
    pub fn class(&self) -> &'static str
    {
        if self.is_data_integrity(){
            "data integrity"
        } else if self.is_shape_mismatch(){
            "shape mismatch"
        } else {
            "index mismatch"
        }
    }
}
