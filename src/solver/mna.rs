//! MNA matrix assembly and solving.

use crate::error::{BreadboardError, Result};

/// MNA matrix system Ax = z.
///
/// The first `num_nodes` rows/columns are node voltages (ground excluded),
/// the remaining `num_sources` are source branch currents:
///
/// ```text
/// [ G  B ] [ v ]   [ I ]
/// [ C  D ] [ j ] = [ E ]
/// ```
#[derive(Debug, Clone)]
pub struct MnaMatrix {
    /// System matrix A (row-major)
    pub a: Vec<f64>,
    /// Source vector z
    pub z: Vec<f64>,
    /// Matrix dimension
    pub size: usize,
    /// Number of non-ground node rows
    pub num_nodes: usize,
}

impl MnaMatrix {
    /// Create a zeroed system for the given node and source counts.
    pub fn new(num_nodes: usize, num_sources: usize) -> Self {
        let size = num_nodes + num_sources;
        Self {
            a: vec![0.0; size * size],
            z: vec![0.0; size],
            size,
            num_nodes,
        }
    }

    /// Get the row of the k-th source branch current.
    pub fn branch_index(&self, source: usize) -> usize {
        self.num_nodes + source
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.a[row * self.size + col]
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] += value;
    }

    /// Add to source vector element.
    pub fn add_source(&mut self, row: usize, value: f64) {
        self.z[row] += value;
    }

    /// Stamp a conductance between two nodes.
    /// For a conductance G between nodes n1 and n2:
    ///   A[n1,n1] += G
    ///   A[n2,n2] += G
    ///   A[n1,n2] -= G
    ///   A[n2,n1] -= G
    pub fn stamp_conductance(&mut self, n1: Option<usize>, n2: Option<usize>, g: f64) {
        if let Some(i) = n1 {
            self.add(i, i, g);
        }
        if let Some(j) = n2 {
            self.add(j, j, g);
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.add(i, j, -g);
            self.add(j, i, -g);
        }
    }

    /// Stamp a current source between two nodes.
    /// Current flows through the source from n+ to n-, i.e. it is drawn
    /// out of n+ and delivered into n-.
    pub fn stamp_current_source(&mut self, n_pos: Option<usize>, n_neg: Option<usize>, current: f64) {
        if let Some(i) = n_pos {
            self.add_source(i, -current);
        }
        if let Some(j) = n_neg {
            self.add_source(j, current);
        }
    }

    /// Stamp a voltage source with series resistance on branch `br`.
    ///
    /// The branch current j flows into n+ from the circuit, through the
    /// source, and out of n-. The constraint row reads
    ///   V[n+] - V[n-] - R * j = E
    /// so a source delivering current (j < 0) sags below E.
    pub fn stamp_voltage_source(
        &mut self,
        n_pos: Option<usize>,
        n_neg: Option<usize>,
        br: usize,
        voltage: f64,
        resistance: f64,
    ) {
        if let Some(i) = n_pos {
            self.add(br, i, 1.0);
            self.add(i, br, 1.0);
        }
        if let Some(j) = n_neg {
            self.add(br, j, -1.0);
            self.add(j, br, -1.0);
        }
        self.add(br, br, -resistance);
        self.z[br] = voltage;
    }

    /// Disconnect a branch row so its current solves to zero.
    ///
    /// Used when a source is replaced by a current injection but keeps its
    /// index in the system.
    pub fn stamp_open_branch(&mut self, br: usize) {
        for col in 0..self.size {
            self.a[br * self.size + col] = 0.0;
            self.a[col * self.size + br] = 0.0;
        }
        self.a[br * self.size + br] = 1.0;
        self.z[br] = 0.0;
    }

    /// Add a small conductance from every node to ground.
    ///
    /// Keeps nodes that nothing drives (open LEDs, floating probes) from
    /// making the system singular.
    pub fn add_leakage(&mut self, g: f64) {
        for i in 0..self.num_nodes {
            self.add(i, i, g);
        }
    }

    /// Solve Ax = z by Gaussian elimination with scaled partial pivoting.
    ///
    /// Each row is scaled by its largest entry when choosing pivots, so that
    /// milliohm shunts and megaohm meters in the same system do not steer the
    /// pivot order. A pivot smaller than `pivot_epsilon` means there is no
    /// unique solution.
    pub fn solve(&self, pivot_epsilon: f64) -> Result<Vec<f64>> {
        let n = self.size;
        let mut lu = self.a.clone();
        let mut x = self.z.clone();

        let mut scale: Vec<f64> = (0..n)
            .map(|i| lu[i * n..(i + 1) * n].iter().fold(0.0f64, |m, v| m.max(v.abs())))
            .collect();

        for k in 0..n {
            // Find pivot
            let mut pivot_row = k;
            let mut best = -1.0f64;
            for i in k..n {
                if scale[i] == 0.0 {
                    continue;
                }
                let ratio = lu[i * n + k].abs() / scale[i];
                if ratio > best {
                    best = ratio;
                    pivot_row = i;
                }
            }

            let pivot = lu[pivot_row * n + k];
            if !(pivot.abs() >= pivot_epsilon) {
                return Err(BreadboardError::SingularMatrix { step: k });
            }

            // Swap rows if needed
            if pivot_row != k {
                for j in 0..n {
                    lu.swap(k * n + j, pivot_row * n + j);
                }
                x.swap(k, pivot_row);
                scale.swap(k, pivot_row);
            }

            // Eliminate
            for i in (k + 1)..n {
                let factor = lu[i * n + k] / pivot;
                if factor == 0.0 {
                    continue;
                }
                lu[i * n + k] = 0.0;
                for j in (k + 1)..n {
                    lu[i * n + j] -= factor * lu[k * n + j];
                }
                x[i] -= factor * x[k];
            }
        }

        // Back substitution
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                x[i] -= lu[i * n + j] * x[j];
            }
            x[i] /= lu[i * n + i];
        }

        if x.iter().any(|v| !v.is_finite()) {
            return Err(BreadboardError::SingularMatrix { step: n });
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_voltage_divider() {
        // 10V source on node 0, 1k from node 0 to node 1, 1k from node 1 to ground
        let mut m = MnaMatrix::new(2, 1);
        m.stamp_conductance(Some(0), Some(1), 1e-3);
        m.stamp_conductance(Some(1), None, 1e-3);
        m.stamp_voltage_source(Some(0), None, 2, 10.0, 0.0);

        let x = m.solve(1e-14).unwrap();
        assert_abs_diff_eq!(x[0], 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(x[1], 5.0, epsilon = 1e-9);
        // 5 mA delivered, so the branch current is negative
        assert_abs_diff_eq!(x[2], -5e-3, epsilon = 1e-12);
    }

    #[test]
    fn test_source_resistance_sags_output() {
        // 9V with 1.45 Ohm internal resistance into 3 Ohm
        let mut m = MnaMatrix::new(1, 1);
        m.stamp_conductance(Some(0), None, 1.0 / 3.0);
        m.stamp_voltage_source(Some(0), None, 1, 9.0, 1.45);

        let x = m.solve(1e-14).unwrap();
        assert_abs_diff_eq!(-x[1], 9.0 / 4.45, epsilon = 1e-9);
        assert_abs_diff_eq!(x[0], 3.0 * 9.0 / 4.45, epsilon = 1e-9);
    }

    #[test]
    fn test_current_source_into_resistor() {
        let mut m = MnaMatrix::new(1, 0);
        m.stamp_conductance(Some(0), None, 0.5);
        // Flows from ground through the source into node 0
        m.stamp_current_source(None, Some(0), 2.0);
        let x = m.solve(1e-14).unwrap();
        assert_abs_diff_eq!(x[0], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_matrix_detected() {
        // Node with nothing attached and no leakage
        let mut m = MnaMatrix::new(2, 0);
        m.stamp_conductance(Some(0), None, 1.0);
        assert!(matches!(
            m.solve(1e-14),
            Err(BreadboardError::SingularMatrix { step: 1 })
        ));
    }

    #[test]
    fn test_leakage_rescues_floating_node() {
        let mut m = MnaMatrix::new(2, 0);
        m.stamp_conductance(Some(0), None, 1.0);
        m.add_leakage(1e-12);
        let x = m.solve(1e-14).unwrap();
        assert_eq!(x[1], 0.0);
    }

    #[test]
    fn test_scaled_pivoting_handles_wide_value_range() {
        // 50 mOhm shunt in series with a 10 MOhm meter across a 1V source
        let mut m = MnaMatrix::new(2, 1);
        m.stamp_conductance(Some(0), Some(1), 1.0 / 0.05);
        m.stamp_conductance(Some(1), None, 1.0 / 10e6);
        m.stamp_voltage_source(Some(0), None, 2, 1.0, 0.0);

        let x = m.solve(1e-14).unwrap();
        let i = 1.0 / (10e6 + 0.05);
        assert_abs_diff_eq!(x[1], i * 10e6, epsilon = 1e-9);
        assert_abs_diff_eq!(-x[2], i, epsilon = 1e-15);
    }

    #[test]
    fn test_open_branch_forces_zero_current() {
        let mut m = MnaMatrix::new(1, 1);
        m.stamp_conductance(Some(0), None, 1.0);
        m.stamp_voltage_source(Some(0), None, 1, 5.0, 0.01);
        m.stamp_open_branch(1);
        m.stamp_current_source(None, Some(0), 0.5);
        let x = m.solve(1e-14).unwrap();
        assert_abs_diff_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_eq!(x[1], 0.0);
    }

    #[test]
    fn test_empty_system() {
        let m = MnaMatrix::new(0, 0);
        assert!(m.solve(1e-14).unwrap().is_empty());
    }
}
