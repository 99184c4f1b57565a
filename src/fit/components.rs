//! One independent exponential fit per energy component.
//!
//! Each component (E_R, E_G, E_H) is fitted against magnitude on its own; a
//! failure for one component is recorded and the others still proceed.

use tracing::{info, warn};

use crate::domain::{EnergyComponent, EnergyRecord, FittedCurve, InitialGuess};
use crate::fit::fitter::{fit_exponential, FitError};

/// Output of fitting every component.
#[derive(Debug, Clone, Default)]
pub struct CurveSet {
    /// Successful fits, in `EnergyComponent::ALL` order.
    pub fitted: Vec<FittedCurve>,
    /// Components whose fit failed and why (for diagnostics).
    pub skipped: Vec<(EnergyComponent, FitError)>,
}

impl CurveSet {
    pub fn get(&self, component: EnergyComponent) -> Option<&FittedCurve> {
        self.fitted.iter().find(|c| c.component == component)
    }
}

/// Fit every energy component against magnitude.
pub fn fit_components(records: &[EnergyRecord], guess: InitialGuess) -> CurveSet {
    let magnitudes: Vec<f64> = records.iter().map(|r| r.event.magnitude).collect();
    let mut set = CurveSet::default();

    for component in EnergyComponent::ALL {
        let energies: Vec<f64> = records.iter().map(|r| component.value(&r.energy)).collect();
        match fit_exponential(&magnitudes, &energies, guess) {
            Ok(fit) => {
                info!(
                    component = component.column(),
                    a = fit.a,
                    b = fit.b,
                    evaluations = fit.evaluations,
                    "fitted exponential curve"
                );
                let predicted = magnitudes.iter().map(|&m| fit.predict(m)).collect();
                set.fitted.push(FittedCurve {
                    component,
                    a: fit.a,
                    b: fit.b,
                    predicted,
                    sse: fit.sse,
                    evaluations: fit.evaluations,
                });
            }
            Err(err) => {
                warn!(component = component.column(), reason = %err, "skipping fit line");
                set.skipped.push((component, err));
            }
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EnergyBreakdown, Event};

    fn record(magnitude: f64, radiated: f64, fracture: f64, thermal: f64) -> EnergyRecord {
        EnergyRecord {
            event: Event::with_magnitude(magnitude),
            energy: EnergyBreakdown {
                total_energy: radiated + fracture + thermal,
                radiated_energy: radiated,
                fracture_energy: fracture,
                thermal_energy: thermal,
                thermal_clamped: false,
            },
        }
    }

    #[test]
    fn each_component_is_fitted_independently() {
        let records: Vec<EnergyRecord> = (0..6)
            .map(|i| {
                let m = f64::from(i);
                record(m, 2.0 * (0.5 * m).exp(), 3.0 * (-0.4 * m).exp(), 1.0 * (0.2 * m).exp())
            })
            .collect();
        let set = fit_components(&records, InitialGuess::default());
        assert!(set.skipped.is_empty(), "{:?}", set.skipped);
        assert_eq!(set.fitted.len(), 3);

        let radiated = set.get(EnergyComponent::Radiated).unwrap();
        assert!((radiated.b - 0.5).abs() < 1e-6);
        assert_eq!(radiated.predicted.len(), records.len());
        let fracture = set.get(EnergyComponent::Fracture).unwrap();
        assert!((fracture.b + 0.4).abs() < 1e-6);
    }

    #[test]
    fn a_failing_component_does_not_stop_the_others() {
        // Thermal energy is NaN everywhere, the other two are clean.
        let records: Vec<EnergyRecord> = (0..6)
            .map(|i| {
                let m = f64::from(i);
                record(m, 2.0 * (0.5 * m).exp(), 3.0 * (-0.4 * m).exp(), f64::NAN)
            })
            .collect();
        let set = fit_components(&records, InitialGuess::default());
        assert_eq!(set.fitted.len(), 2);
        assert_eq!(set.skipped.len(), 1);
        assert_eq!(set.skipped[0].0, EnergyComponent::Thermal);
        assert!(matches!(set.skipped[0].1, FitError::NonFiniteInput { index: 0 }));
    }

    #[test]
    fn identical_magnitudes_skip_every_component() {
        let records: Vec<EnergyRecord> = (0..3).map(|i| record(4.0, 1.0 + f64::from(i), 2.0, 3.0)).collect();
        let set = fit_components(&records, InitialGuess::default());
        assert!(set.fitted.is_empty());
        assert_eq!(set.skipped.len(), 3);
        assert!(set.skipped.iter().all(|(_, e)| *e == FitError::DegenerateInput));
    }
}
