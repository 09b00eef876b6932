//! Reduction kinds for sparse-mm-reduce

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// How the products of a row are combined
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReductionType {
    /// Sum of products
    Sum,
    /// Sum of products divided by the row's nonzero count
    Mean,
    /// Largest product
    Amax,
    /// Smallest product
    Amin,
}

impl ReductionType {
    /// Every supported reduction
    pub const ALL: [ReductionType; 4] = [
        ReductionType::Sum,
        ReductionType::Mean,
        ReductionType::Amax,
        ReductionType::Amin,
    ];

    /// Canonical name, as accepted by [`FromStr`]
    pub fn name(self) -> &'static str {
        match self {
            ReductionType::Sum => "sum",
            ReductionType::Mean => "mean",
            ReductionType::Amax => "amax",
            ReductionType::Amin => "amin",
        }
    }

    /// Whether the forward pass records which nonzero won each output
    ///
    /// Only selecting reductions do; their gradient flows to a single
    /// contributor.
    #[inline]
    pub fn needs_arg_out(self) -> bool {
        matches!(self, ReductionType::Amax | ReductionType::Amin)
    }
}

impl FromStr for ReductionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(ReductionType::Sum),
            "mean" => Ok(ReductionType::Mean),
            "amax" | "max" => Ok(ReductionType::Amax),
            "amin" | "min" => Ok(ReductionType::Amin),
            "prod" => Err(Error::Unsupported {
                op: "sparse_mm_reduce",
                reason: "reduce type prod is not supported".to_string(),
            }),
            other => Err(Error::invalid_argument(
                "reduce",
                format!(
                    "expected one of sum, mean, amax, amin, got '{}'",
                    other
                ),
            )),
        }
    }
}

impl fmt::Display for ReductionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;

    #[test]
    fn test_parse() {
        for r in ReductionType::ALL {
            assert_eq!(r.name().parse::<ReductionType>().unwrap(), r);
        }
        assert_eq!("max".parse::<ReductionType>().unwrap(), ReductionType::Amax);
        assert_eq!("min".parse::<ReductionType>().unwrap(), ReductionType::Amin);
    }

    #[test]
    fn test_parse_rejects() {
        let err = "prod".parse::<ReductionType>().unwrap_err();
        assert_eq!(err.violation(), ViolationKind::Unsupported);

        let err = "median".parse::<ReductionType>().unwrap_err();
        assert_eq!(err.violation(), ViolationKind::InvalidArgument);
        assert_eq!(err.arg(), Some("reduce"));
    }

    #[test]
    fn test_needs_arg_out() {
        assert!(!ReductionType::Sum.needs_arg_out());
        assert!(!ReductionType::Mean.needs_arg_out());
        assert!(ReductionType::Amax.needs_arg_out());
        assert!(ReductionType::Amin.needs_arg_out());
        assert_eq!(ReductionType::Amin.to_string(), "amin");
    }
}
