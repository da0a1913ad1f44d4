//! Small dense linear algebra for penalised least squares.

/// Solve `(XᵀX + diag(penalty)) β = Xᵀy` for β.
///
/// `rows` holds the design matrix row by row. Returns `None` when the system
/// is not positive definite.
pub fn ridge_solve(rows: &[Vec<f64>], y: &[f64], penalty: &[f64]) -> Option<Vec<f64>> {
    let p = penalty.len();
    if rows.len() != y.len() || rows.iter().any(|r| r.len() != p) {
        return None;
    }

    let mut gram = vec![vec![0.0; p]; p];
    let mut rhs = vec![0.0; p];
    for (row, &target) in rows.iter().zip(y) {
        for a in 0..p {
            if row[a] == 0.0 {
                continue;
            }
            rhs[a] += row[a] * target;
            for b in 0..=a {
                gram[a][b] += row[a] * row[b];
            }
        }
    }
    for a in 0..p {
        gram[a][a] += penalty[a];
        for b in 0..a {
            gram[b][a] = gram[a][b];
        }
    }

    cholesky_solve(&gram, &rhs)
}

/// Solve `A x = b` for symmetric positive definite `A`
pub fn cholesky_solve(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L y = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * z[j];
        }
        z[i] = sum / l[i][i];
    }

    // Lᵀ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

/// Dot product of two equally sized slices
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
