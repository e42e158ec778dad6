//! Layer weight curves.
//!
//! A scale maps a layer index to a non-negative weight. The configuration is
//! one of a closed set of curve shapes, each pinned by a domain `[d0, d1]`
//! and a range `[r0, r1]` so that `weight(d0) = r0` and `weight(d1) = r1`.
//! `solve()` turns it into a `SolvedScale` once at startup; the allocator
//! only ever sees `SolvedScale::weight`.
//!
//! ```toml
//! [strategy.liquidity_scale.exp]
//! domain = [0, 10]
//! range = [1, 4]
//! ```

use serde::{Deserialize, Serialize};

use crate::{MmError, MmResult};

/// Domain and range of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub domain: [f64; 2],
    pub range: [f64; 2],
}

impl ScaleBounds {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self { domain, range }
    }

    fn validate(&self) -> MmResult<()> {
        let [d0, d1] = self.domain;
        let [r0, r1] = self.range;
        if !(d0.is_finite() && d1.is_finite() && r0.is_finite() && r1.is_finite()) {
            return Err(MmError::UnsolvableScale(
                "domain and range must be finite".to_string(),
            ));
        }
        if d1 <= d0 {
            return Err(MmError::UnsolvableScale(format!(
                "domain [{d0}, {d1}] is empty or inverted"
            )));
        }
        if r0 < 0.0 || r1 < 0.0 {
            return Err(MmError::UnsolvableScale(format!(
                "range [{r0}, {r1}] must be non-negative"
            )));
        }
        Ok(())
    }
}

/// Curve shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleConfig {
    /// `r0 * b^(x - d0)`
    Exp(ScaleBounds),
    /// Straight line through both endpoints.
    Linear(ScaleBounds),
    /// `r0 + a * ln(1 + x - d0)`
    Log(ScaleBounds),
    /// `r0 + a * (x - d0)^2`
    Quadratic(ScaleBounds),
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self::Exp(ScaleBounds::new([0.0, 10.0], [1.0, 4.0]))
    }
}

impl ScaleConfig {
    pub fn bounds(&self) -> &ScaleBounds {
        match self {
            Self::Exp(b) | Self::Linear(b) | Self::Log(b) | Self::Quadratic(b) => b,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Exp(_) => "exp",
            Self::Linear(_) => "linear",
            Self::Log(_) => "log",
            Self::Quadratic(_) => "quadratic",
        }
    }

    /// Solve the curve coefficients.
    pub fn solve(&self) -> MmResult<SolvedScale> {
        let bounds = *self.bounds();
        bounds.validate()?;

        let [d0, d1] = bounds.domain;
        let [r0, r1] = bounds.range;
        let width = d1 - d0;

        let curve = match self {
            Self::Exp(_) => {
                if r0 <= 0.0 || r1 <= 0.0 {
                    return Err(MmError::UnsolvableScale(format!(
                        "exp range [{r0}, {r1}] must be strictly positive"
                    )));
                }
                Curve::Exp {
                    base: (r1 / r0).powf(1.0 / width),
                }
            }
            Self::Linear(_) => Curve::Linear {
                slope: (r1 - r0) / width,
            },
            Self::Log(_) => Curve::Log {
                coef: (r1 - r0) / (1.0 + width).ln(),
            },
            Self::Quadratic(_) => Curve::Quadratic {
                coef: (r1 - r0) / (width * width),
            },
        };

        if !curve.coefficient().is_finite() {
            return Err(MmError::UnsolvableScale(format!(
                "{} coefficient is not finite",
                self.name()
            )));
        }

        Ok(SolvedScale { bounds, curve })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Curve {
    Exp { base: f64 },
    Linear { slope: f64 },
    Log { coef: f64 },
    Quadratic { coef: f64 },
}

impl Curve {
    fn coefficient(&self) -> f64 {
        match *self {
            Self::Exp { base } => base,
            Self::Linear { slope } => slope,
            Self::Log { coef } | Self::Quadratic { coef } => coef,
        }
    }
}

/// A solved scale: `weight(x)` for any x, clamped to the domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolvedScale {
    bounds: ScaleBounds,
    curve: Curve,
}

impl SolvedScale {
    pub fn weight(&self, x: f64) -> f64 {
        let [d0, d1] = self.bounds.domain;
        let r0 = self.bounds.range[0];
        let dx = x.clamp(d0, d1) - d0;

        match self.curve {
            Curve::Exp { base } => r0 * base.powf(dx),
            Curve::Linear { slope } => r0 + slope * dx,
            Curve::Log { coef } => r0 + coef * (1.0 + dx).ln(),
            Curve::Quadratic { coef } => r0 + coef * dx * dx,
        }
    }

    /// Weight of ladder layer `index`.
    pub fn layer_weight(&self, index: u32) -> f64 {
        self.weight(f64::from(index))
    }

    /// Σ weight(i) for i in [0, layers].
    pub fn sum_over_layers(&self, layers: u32) -> f64 {
        (0..=layers).map(|i| self.layer_weight(i)).sum()
    }

    pub fn domain(&self) -> [f64; 2] {
        self.bounds.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_exp_hits_both_endpoints() {
        let scale = ScaleConfig::Exp(ScaleBounds::new([0.0, 10.0], [1.0, 4.0]))
            .solve()
            .unwrap();
        assert_approx(scale.weight(0.0), 1.0);
        assert_approx(scale.weight(10.0), 4.0);
        assert_approx(scale.weight(5.0), 2.0);
    }

    #[test]
    fn test_linear_midpoint() {
        let scale = ScaleConfig::Linear(ScaleBounds::new([0.0, 4.0], [1.0, 3.0]))
            .solve()
            .unwrap();
        assert_approx(scale.weight(2.0), 2.0);
        assert_approx(scale.sum_over_layers(4), 1.0 + 1.5 + 2.0 + 2.5 + 3.0);
    }

    #[test]
    fn test_log_and_quadratic_endpoints() {
        for config in [
            ScaleConfig::Log(ScaleBounds::new([0.0, 5.0], [0.5, 2.0])),
            ScaleConfig::Quadratic(ScaleBounds::new([0.0, 5.0], [0.5, 2.0])),
        ] {
            let scale = config.solve().unwrap();
            assert_approx(scale.weight(0.0), 0.5);
            assert_approx(scale.weight(5.0), 2.0);
        }
    }

    #[test]
    fn test_weight_clamped_to_domain() {
        let scale = ScaleConfig::Linear(ScaleBounds::new([1.0, 3.0], [2.0, 6.0]))
            .solve()
            .unwrap();
        assert_approx(scale.weight(0.0), 2.0);
        assert_approx(scale.weight(10.0), 6.0);
    }

    #[test]
    fn test_decreasing_curve_allowed() {
        let scale = ScaleConfig::Exp(ScaleBounds::new([0.0, 2.0], [4.0, 1.0]))
            .solve()
            .unwrap();
        assert_approx(scale.weight(1.0), 2.0);
    }

    #[test]
    fn test_unsolvable_configs() {
        let cases = [
            ScaleConfig::Exp(ScaleBounds::new([0.0, 10.0], [0.0, 4.0])),
            ScaleConfig::Linear(ScaleBounds::new([3.0, 3.0], [1.0, 2.0])),
            ScaleConfig::Linear(ScaleBounds::new([5.0, 1.0], [1.0, 2.0])),
            ScaleConfig::Quadratic(ScaleBounds::new([0.0, 1.0], [-1.0, 2.0])),
            ScaleConfig::Log(ScaleBounds::new([0.0, f64::NAN], [1.0, 2.0])),
        ];
        for config in cases {
            assert!(
                matches!(config.solve(), Err(MmError::UnsolvableScale(_))),
                "{config:?} should be unsolvable"
            );
        }
    }

    #[test]
    fn test_toml_variant_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            scale: ScaleConfig,
        }
        let parsed: Wrapper = toml::from_str(
            r#"
[scale.quadratic]
domain = [0.0, 8.0]
range = [1.0, 3.0]
"#,
        )
        .unwrap();
        assert_eq!(
            parsed.scale,
            ScaleConfig::Quadratic(ScaleBounds::new([0.0, 8.0], [1.0, 3.0]))
        );
    }
}
