//! Per-frame structural metrics.

fn centroid(positions: &[[f64; 3]], selection: &[usize]) -> [f64; 3] {
    let mut c = [0.0; 3];
    for &i in selection {
        for k in 0..3 {
            c[k] += positions[i][k];
        }
    }
    let n = selection.len() as f64;
    [c[0] / n, c[1] / n, c[2] / n]
}

/// Radius of gyration of the selected atoms (unweighted), in Å.
///
/// `None` for an empty selection.
pub fn radius_of_gyration(positions: &[[f64; 3]], selection: &[usize]) -> Option<f64> {
    if selection.is_empty() {
        return None;
    }
    let c = centroid(positions, selection);
    let sum: f64 = selection
        .iter()
        .map(|&i| {
            let p = positions[i];
            (p[0] - c[0]).powi(2) + (p[1] - c[1]).powi(2) + (p[2] - c[2]).powi(2)
        })
        .sum();
    Some((sum / selection.len() as f64).sqrt())
}

/// RMSD between two conformations over the selected atoms after removing
/// the translation between their centroids. No rotational fit is applied.
pub fn rmsd(reference: &[[f64; 3]], positions: &[[f64; 3]], selection: &[usize]) -> Option<f64> {
    if selection.is_empty() || reference.len() != positions.len() {
        return None;
    }
    let c_ref = centroid(reference, selection);
    let c = centroid(positions, selection);
    let sum: f64 = selection
        .iter()
        .map(|&i| {
            (0..3)
                .map(|k| ((positions[i][k] - c[k]) - (reference[i][k] - c_ref[k])).powi(2))
                .sum::<f64>()
        })
        .sum();
    Some((sum / selection.len() as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gyration_of_symmetric_pair() {
        let positions = [[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [50.0, 50.0, 50.0]];
        assert_eq!(radius_of_gyration(&positions, &[0, 1]), Some(1.0));
        assert_eq!(radius_of_gyration(&positions, &[]), None);
    }

    #[test]
    fn translation_does_not_change_rmsd() {
        let reference = [[0.0, 0.0, 0.0], [1.5, 0.0, 0.0], [1.5, 1.5, 0.0]];
        let shifted: Vec<[f64; 3]> = reference
            .iter()
            .map(|p| [p[0] + 7.0, p[1] - 3.0, p[2] + 0.5])
            .collect();
        let r = rmsd(&reference, &shifted, &[0, 1, 2]).unwrap();
        assert!(r.abs() < 1e-12);
    }

    #[test]
    fn rmsd_of_single_displaced_atom() {
        let reference = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let moved = [[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]];
        // centroids differ by 1 Å, each atom deviates by 1 Å afterwards
        assert!((rmsd(&reference, &moved, &[0, 1]).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(rmsd(&reference, &moved[..1], &[0]), None);
    }
}
