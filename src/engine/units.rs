//! Unit system shared by every engine.
//!
//! Lengths in Å, time in ps, mass in amu, energy in kcal/mol, temperature in
//! K, charge in e. Forces are kcal/mol/Å; accelerations need
//! [`KCAL_PER_MOL_TO_INTERNAL`] to become Å/ps².

/// Boltzmann constant in kcal/(mol·K).
pub const BOLTZMANN: f64 = 0.001_987_204_1;

/// 1 kcal/mol expressed in amu·Å²/ps².
pub const KCAL_PER_MOL_TO_INTERNAL: f64 = 418.4;

/// Coulomb constant in kcal·Å/(mol·e²).
pub const COULOMB: f64 = 332.063_7;

/// Kinetic energy in kcal/mol of particles with the given masses and
/// velocities (Å/ps).
pub fn kinetic_energy(masses: &[f64], velocities: &[[f64; 3]]) -> f64 {
    let twice: f64 = masses
        .iter()
        .zip(velocities)
        .map(|(m, v)| m * (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]))
        .sum();
    0.5 * twice / KCAL_PER_MOL_TO_INTERNAL
}

/// Instantaneous temperature for `dof` degrees of freedom.
pub fn temperature(kinetic_energy: f64, dof: usize) -> f64 {
    if dof == 0 {
        return 0.0;
    }
    2.0 * kinetic_energy / (dof as f64 * BOLTZMANN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinetic_energy_of_single_particle() {
        // 1 amu at 1 Å/ps: ½·1·1 amu·Å²/ps² = 0.5/418.4 kcal/mol
        let ke = kinetic_energy(&[1.0], &[[1.0, 0.0, 0.0]]);
        assert!((ke - 0.5 / 418.4).abs() < 1e-15);
    }

    #[test]
    fn temperature_inverts_equipartition() {
        let dof = 300;
        let t = 310.0;
        let ke = 0.5 * dof as f64 * BOLTZMANN * t;
        assert!((temperature(ke, dof) - t).abs() < 1e-9);
        assert_eq!(temperature(1.0, 0), 0.0);
    }
}
