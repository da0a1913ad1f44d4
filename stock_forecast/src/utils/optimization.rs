//! Derivative-free minimisation used for ARIMA parameter estimation.

// Standard simplex moves
const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Where the simplex ended up
#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    /// False when `max_iter` ran out first
    pub converged: bool,
}

/// Stopping rule and starting simplex size
#[derive(Debug, Clone)]
pub struct SimplexOptions {
    pub max_iter: usize,
    /// Stop once best and worst vertex values are this close
    pub tolerance: f64,
    /// Relative offset of each starting vertex (absolute for zero coordinates)
    pub initial_step: f64,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-10,
            initial_step: 0.1,
        }
    }
}

/// Nelder-Mead minimisation of `objective` from `initial`.
///
/// NaN and infinite objective values count as `+inf`.
pub fn nelder_mead<F>(objective: F, initial: &[f64], options: &SimplexOptions) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    let n = initial.len();
    if n == 0 {
        return Minimum {
            point: Vec::new(),
            value: eval(initial),
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(initial.to_vec());
    for i in 0..n {
        let mut vertex = initial.to_vec();
        vertex[i] += if initial[i].abs() > 1e-8 {
            options.initial_step * initial[i].abs()
        } else {
            options.initial_step
        };
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iter {
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        if (values[worst] - values[best]).abs() <= options.tolerance {
            converged = true;
            break;
        }

        let centroid = centroid_without(&simplex, worst);
        let reflected = towards(&centroid, &simplex[worst], -REFLECT);
        let reflected_value = eval(&reflected);

        if reflected_value < values[best] {
            let expanded = towards(&centroid, &reflected, EXPAND);
            let expanded_value = eval(&expanded);
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < values[worst] {
            let outside = towards(&centroid, &reflected, CONTRACT);
            let value = eval(&outside);
            (outside, value)
        } else {
            let inside = towards(&centroid, &simplex[worst], CONTRACT);
            let value = eval(&inside);
            (inside, value)
        };

        if contracted_value < values[worst].min(reflected_value) {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        let anchor = simplex[best].clone();
        for i in 0..=n {
            if i != best {
                simplex[i] = towards(&anchor, &simplex[i], SHRINK);
                values[i] = eval(&simplex[i]);
            }
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);

    Minimum {
        point: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
    }
}

fn centroid_without(simplex: &[Vec<f64>], skip: usize) -> Vec<f64> {
    let dims = simplex[0].len();
    let count = (simplex.len() - 1) as f64;
    let mut centroid = vec![0.0; dims];
    for (i, vertex) in simplex.iter().enumerate() {
        if i == skip {
            continue;
        }
        for (c, v) in centroid.iter_mut().zip(vertex) {
            *c += v;
        }
    }
    centroid.iter_mut().for_each(|c| *c /= count);
    centroid
}

/// `origin + scale * (point - origin)`
fn towards(origin: &[f64], point: &[f64], scale: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(point)
        .map(|(o, p)| o + scale * (p - o))
        .collect()
}
