//! Energy partitioning model.
//!
//! Converts one event's attributes into an `EnergyBreakdown`:
//!
//! - `W   = 10^(1.5·m + 4.8)` (magnitude-only total, joules)
//! - `E_R = Δσ / (2·μ_ref) · M0`, `M0 = 10^(1.5·m + 9.1)` when the stress drop is
//!   known, else `0.7·W`
//! - `E_G = 0.5 · μ · D²` when slip and shear modulus are known, else `0.2·W`
//! - `E_H = W − E_R − E_G`, floored at a non-negative value
//!
//! Every function here is pure and total: a missing attribute selects the
//! fallback branch, it is never an error.

use crate::domain::{EnergyBreakdown, Event, PartitionMode, ThermalFloor};

/// Fraction of `W` assigned to radiated energy when no stress drop is known.
pub const RADIATED_FRACTION: f64 = 0.7;
/// Fraction of `W` assigned to fracture energy without slip/modulus data.
pub const FRACTURE_FRACTION: f64 = 0.2;
/// Fraction of `W` assigned to thermal energy in the fixed split.
pub const THERMAL_FRACTION: f64 = 0.1;

/// Reference crustal shear modulus (Pa) used by the stress-drop relation.
pub const REFERENCE_SHEAR_MODULUS: f64 = 3.0e10;

/// Magnitude-only total released energy `W = 10^(1.5·m + 4.8)`.
///
/// Magnitudes are not bounds-checked; extreme inputs give extreme (possibly
/// infinite) energies.
pub fn total_energy(magnitude: f64) -> f64 {
    10f64.powf(1.5 * magnitude + 4.8)
}

/// Seismic moment `M0 = 10^(1.5·m + 9.1)` in N·m.
pub fn seismic_moment(magnitude: f64) -> f64 {
    10f64.powf(1.5 * magnitude + 9.1)
}

/// Radiated energy `E_R`.
///
/// With a stress drop this is the Orowan estimate `Δσ / (2·μ_ref) · M0`;
/// without one it is the fixed fraction of the magnitude-only total.
pub fn radiated_energy(magnitude: f64, stress_drop: Option<f64>) -> f64 {
    match known(stress_drop) {
        Some(stress_drop) => stress_drop / (2.0 * REFERENCE_SHEAR_MODULUS) * seismic_moment(magnitude),
        None => RADIATED_FRACTION * total_energy(magnitude),
    }
}

/// Fracture energy `E_G`.
///
/// Needs both slip and shear modulus for the `0.5·μ·D²` scaling; with either
/// missing it falls back to a fixed fraction of the magnitude-only total.
pub fn fracture_energy(magnitude: f64, fault_slip: Option<f64>, material_elasticity: Option<f64>) -> f64 {
    match (known(fault_slip), known(material_elasticity)) {
        (Some(slip), Some(modulus)) => 0.5 * modulus * slip * slip,
        _ => FRACTURE_FRACTION * total_energy(magnitude),
    }
}

/// Thermal energy `E_H` as the residual of the total.
///
/// Returns the residual and whether it had to be floored.
pub fn thermal_energy(total: f64, radiated: f64, fracture: f64, floor: ThermalFloor) -> (f64, bool) {
    let residual = total - radiated - fracture;
    if residual >= 0.0 {
        return (residual, false);
    }

    let floored = match floor {
        ThermalFloor::Zero => 0.0,
        ThermalFloor::FallbackFraction => THERMAL_FRACTION * total,
    };
    (floored, true)
}

/// Partition one event's energy according to `mode`.
pub fn partition(event: &Event, mode: PartitionMode, floor: ThermalFloor) -> EnergyBreakdown {
    let total = total_energy(event.magnitude);

    match mode {
        PartitionMode::FallbackFraction => EnergyBreakdown {
            total_energy: total,
            radiated_energy: RADIATED_FRACTION * total,
            fracture_energy: FRACTURE_FRACTION * total,
            thermal_energy: THERMAL_FRACTION * total,
            thermal_clamped: false,
        },
        PartitionMode::PhysicalResidual => {
            let radiated = radiated_energy(event.magnitude, event.stress_drop);
            let fracture = fracture_energy(event.magnitude, event.fault_slip, event.material_elasticity);
            let (thermal, thermal_clamped) = thermal_energy(total, radiated, fracture, floor);
            EnergyBreakdown {
                total_energy: total,
                radiated_energy: radiated,
                fracture_energy: fracture,
                thermal_energy: thermal,
                thermal_clamped,
            }
        }
    }
}

/// An auxiliary attribute counts only when finite and strictly positive.
fn known(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn total_energy_matches_closed_form() {
        for m in [-1.0, 0.0, 2.5, 5.0, 7.3, 9.5] {
            let expected = 10f64.powf(1.5 * m + 4.8);
            assert_relative_eq!(total_energy(m), expected, max_relative = 1e-9);
        }
        assert_relative_eq!(total_energy(5.0), 1.995e12, max_relative = 1e-3);
    }

    #[test]
    fn magnitude_five_without_auxiliary_data() {
        let event = Event::with_magnitude(5.0);
        for mode in [PartitionMode::FallbackFraction, PartitionMode::PhysicalResidual] {
            let e = partition(&event, mode, ThermalFloor::Zero);
            assert_relative_eq!(e.total_energy, 1.995e12, max_relative = 1e-3);
            assert_relative_eq!(e.radiated_energy, 1.396e12, max_relative = 1e-3);
            assert_relative_eq!(e.fracture_energy, 3.99e11, max_relative = 1e-3);
            assert_relative_eq!(e.thermal_energy, 1.995e11, max_relative = 1e-3);
            assert!(!e.thermal_clamped);
        }
    }

    #[test]
    fn radiated_fallback_ignores_other_fields() {
        let mut event = Event::with_magnitude(4.2);
        event.fault_slip = Some(1.5);
        event.material_elasticity = Some(3.2e10);
        event.depth = Some(12.0);
        let e = partition(&event, PartitionMode::PhysicalResidual, ThermalFloor::Zero);
        assert_relative_eq!(e.radiated_energy, 0.7 * total_energy(4.2), max_relative = 1e-12);
        assert_relative_eq!(radiated_energy(4.2, None), 0.7 * total_energy(4.2), max_relative = 1e-12);
    }

    #[test]
    fn stress_drop_uses_orowan_relation() {
        let e_r = radiated_energy(5.0, Some(3.0e6));
        let expected = 3.0e6 / 6.0e10 * 10f64.powf(16.6);
        assert_relative_eq!(e_r, expected, max_relative = 1e-12);
    }

    #[test]
    fn unusable_stress_drop_falls_back() {
        let fallback = radiated_energy(3.0, None);
        for bad in [f64::NAN, f64::INFINITY, 0.0, -1.0e6] {
            assert_eq!(radiated_energy(3.0, Some(bad)), fallback);
        }
    }

    #[test]
    fn fracture_needs_both_slip_and_modulus() {
        assert_relative_eq!(fracture_energy(5.0, Some(2.0), Some(3.0e10)), 0.5 * 3.0e10 * 4.0);
        let fallback = 0.2 * total_energy(5.0);
        assert_relative_eq!(fracture_energy(5.0, Some(2.0), None), fallback);
        assert_relative_eq!(fracture_energy(5.0, None, Some(3.0e10)), fallback);
        assert_relative_eq!(fracture_energy(5.0, None, None), fallback);
    }

    #[test]
    fn negative_residual_is_floored() {
        // A large stress drop pushes E_R well above W.
        let mut event = Event::with_magnitude(4.0);
        event.stress_drop = Some(1.0e9);

        let zero = partition(&event, PartitionMode::PhysicalResidual, ThermalFloor::Zero);
        assert!(zero.thermal_clamped);
        assert_eq!(zero.thermal_energy, 0.0);

        let tenth = partition(&event, PartitionMode::PhysicalResidual, ThermalFloor::FallbackFraction);
        assert!(tenth.thermal_clamped);
        assert_relative_eq!(tenth.thermal_energy, 0.1 * tenth.total_energy, max_relative = 1e-12);
    }

    #[test]
    fn unclamped_components_sum_to_total() {
        let mut event = Event::with_magnitude(6.0);
        event.fault_slip = Some(0.8);
        event.material_elasticity = Some(3.0e10);
        let e = partition(&event, PartitionMode::PhysicalResidual, ThermalFloor::Zero);
        assert!(!e.thermal_clamped);
        assert_relative_eq!(
            e.radiated_energy + e.fracture_energy + e.thermal_energy,
            e.total_energy,
            max_relative = 1e-12
        );
    }

    #[test]
    fn fallback_fraction_mode_ignores_auxiliary_data() {
        let mut event = Event::with_magnitude(5.0);
        event.stress_drop = Some(1.0e9);
        event.fault_slip = Some(3.0);
        event.material_elasticity = Some(3.0e10);
        let e = partition(&event, PartitionMode::FallbackFraction, ThermalFloor::Zero);
        assert_relative_eq!(e.radiated_energy, 0.7 * e.total_energy, max_relative = 1e-12);
        assert_relative_eq!(e.fracture_energy, 0.2 * e.total_energy, max_relative = 1e-12);
        assert_relative_eq!(e.thermal_energy, 0.1 * e.total_energy, max_relative = 1e-12);
    }

    #[test]
    fn radiated_energy_strictly_increases_with_magnitude() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let m0: f64 = rng.gen_range(-2.0..9.0);
            let dm: f64 = rng.gen_range(0.01..1.0);
            let stress_drop = if rng.gen_bool(0.5) { Some(rng.gen_range(1.0e5..1.0e8)) } else { None };
            assert!(radiated_energy(m0 + dm, stress_drop) > radiated_energy(m0, stress_drop));
        }
    }

    #[test]
    fn thermal_energy_never_negative() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let mut event = Event::with_magnitude(rng.gen_range(0.0..9.0));
            if rng.gen_bool(0.5) {
                event.stress_drop = Some(rng.gen_range(1.0e4..1.0e9));
            }
            if rng.gen_bool(0.5) {
                event.fault_slip = Some(rng.gen_range(0.01..20.0));
                event.material_elasticity = Some(rng.gen_range(1.0e9..8.0e10));
            }
            for floor in [ThermalFloor::Zero, ThermalFloor::FallbackFraction] {
                let e = partition(&event, PartitionMode::PhysicalResidual, floor);
                assert!(e.thermal_energy >= 0.0);
                assert!(e.radiated_energy >= 0.0 && e.fracture_energy >= 0.0);
            }
        }
    }
}
