//! Interpolation helpers:
//! - shortest-path slerp (flip on negative dot)
//! - ease-in-out-cubic crossfade curve
//! - clamped cubic splines (zero end slopes) for translation axes
//! - quaternion exp/log and Hermite blending for rotation resampling

use glam::{Quat, Vec3};

/// Slerp that always takes the short way around: the end quaternion is
/// negated when its dot product with the start is negative.
#[inline]
pub fn shortest_slerp(a: Quat, mut b: Quat, t: f32) -> Quat {
    if a.dot(b) < 0.0 {
        b = -b;
    }
    a.slerp(b, t)
}

/// Ease-in-out cubic over normalized `t` in [0,1].
#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u / 2.0
    }
}

/// Rotation vector (angle * axis) of a unit quaternion. Inverse of
/// [`quat_exp`]; the zero vector for (near-)identity rotations.
pub fn quat_log(q: Quat) -> Vec3 {
    // Work on the hemisphere with w >= 0 so the angle stays in [0, pi].
    let q = if q.w < 0.0 { -q } else { q };
    let v = Vec3::new(q.x, q.y, q.z);
    let sin_half = v.length();
    if sin_half < 1e-8 {
        return Vec3::ZERO;
    }
    let half_angle = q.w.clamp(-1.0, 1.0).acos();
    v * (2.0 * half_angle / sin_half)
}

/// Unit quaternion for a rotation vector (angle * axis).
pub fn quat_exp(v: Vec3) -> Quat {
    let angle = v.length();
    if angle < 1e-8 {
        return Quat::IDENTITY;
    }
    Quat::from_axis_angle(v / angle, angle)
}

/// Hermite basis evaluated at `t`: (h00, h10, h01, h11).
#[inline]
fn hermite_basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;
    (
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    )
}

/// Hermite-interpolate orientation between `q0` and `q1`.
///
/// `m0`/`m1` are tangent rotation vectors scaled to the segment (angular
/// velocity at each key times the segment length), expressed in `q0`'s frame.
/// The blend runs on the log map of the relative rotation, so endpoints are
/// hit exactly.
pub fn quat_hermite(q0: Quat, q1: Quat, m0: Vec3, m1: Vec3, t: f32) -> Quat {
    let mut rel = q0.inverse() * q1;
    if rel.w < 0.0 {
        rel = -rel;
    }
    let r1 = quat_log(rel);
    let (_h00, h10, h01, h11) = hermite_basis(t.clamp(0.0, 1.0));
    // Start value is the zero vector, so h00 contributes nothing.
    let r = m0 * h10 + r1 * h01 + m1 * h11;
    (q0 * quat_exp(r)).normalize()
}

/// Catmull-Rom-style angular velocity at each key of a rotation track,
/// expressed as rotation vectors per second in the local frame of the key.
/// End keys get zero velocity, matching the clamped translation splines.
pub fn rotation_velocities(times: &[f32], rotations: &[Quat]) -> Vec<Vec3> {
    let n = rotations.len();
    let mut out = vec![Vec3::ZERO; n];
    for i in 1..n.saturating_sub(1) {
        let dt = times[i + 1] - times[i - 1];
        if dt <= 0.0 {
            continue;
        }
        let mut rel = rotations[i - 1].inverse() * rotations[i + 1];
        if rel.w < 0.0 {
            rel = -rel;
        }
        out[i] = quat_log(rel) / dt;
    }
    out
}

/// Cubic spline through `(x, y)` samples with clamped (zero first-derivative)
/// boundary conditions, evaluated piecewise.
#[derive(Clone, Debug)]
pub struct CubicSpline {
    xs: Vec<f32>,
    ys: Vec<f32>,
    /// Second derivatives at each knot from the tridiagonal solve.
    m: Vec<f32>,
}

impl CubicSpline {
    /// Fit a clamped spline (f'(x0) = f'(xn) = 0). `xs` must be strictly
    /// increasing with `xs.len() == ys.len() >= 2`.
    pub fn fit_clamped(xs: Vec<f32>, ys: Vec<f32>) -> Self {
        let n = xs.len();
        debug_assert!(n >= 2 && n == ys.len());
        let mut a = vec![0.0f32; n]; // sub-diagonal
        let mut b = vec![0.0f32; n]; // diagonal
        let mut c = vec![0.0f32; n]; // super-diagonal
        let mut d = vec![0.0f32; n]; // rhs

        let h = |i: usize| xs[i + 1] - xs[i];
        let slope = |i: usize| (ys[i + 1] - ys[i]) / h(i).max(f32::EPSILON);

        // Clamped end rows (target slope zero at both ends).
        b[0] = 2.0 * h(0);
        c[0] = h(0);
        d[0] = 6.0 * slope(0);
        for i in 1..n - 1 {
            a[i] = h(i - 1);
            b[i] = 2.0 * (h(i - 1) + h(i));
            c[i] = h(i);
            d[i] = 6.0 * (slope(i) - slope(i - 1));
        }
        a[n - 1] = h(n - 2);
        b[n - 1] = 2.0 * h(n - 2);
        d[n - 1] = -6.0 * slope(n - 2);

        // Thomas algorithm.
        for i in 1..n {
            let w = a[i] / b[i - 1];
            b[i] -= w * c[i - 1];
            d[i] -= w * d[i - 1];
        }
        let mut m = vec![0.0f32; n];
        m[n - 1] = d[n - 1] / b[n - 1];
        for i in (0..n - 1).rev() {
            m[i] = (d[i] - c[i] * m[i + 1]) / b[i];
        }

        Self { xs, ys, m }
    }

    /// Evaluate at `x`, clamping outside the knot range.
    pub fn eval(&self, x: f32) -> f32 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }
        let i = self.xs.partition_point(|&k| k <= x).saturating_sub(1);
        let i = i.min(n - 2);
        let h = (self.xs[i + 1] - self.xs[i]).max(f32::EPSILON);
        let t0 = self.xs[i + 1] - x;
        let t1 = x - self.xs[i];
        (self.m[i] * t0 * t0 * t0 + self.m[i + 1] * t1 * t1 * t1) / (6.0 * h)
            + (self.ys[i] / h - self.m[i] * h / 6.0) * t0
            + (self.ys[i + 1] / h - self.m[i + 1] * h / 6.0) * t1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ease_endpoints_and_midpoint() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn log_exp_round_trip() {
        let q = Quat::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), 1.3);
        let back = quat_exp(quat_log(q));
        assert!(q.dot(back).abs() > 1.0 - 1e-5);
    }

    #[test]
    fn spline_hits_knots() {
        let s = CubicSpline::fit_clamped(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, -1.0, 0.5]);
        for (x, y) in [(0.0, 0.0), (1.0, 1.0), (2.0, -1.0), (3.0, 0.5)] {
            assert!((s.eval(x) - y).abs() < 1e-4, "at {x}: {} vs {y}", s.eval(x));
        }
    }

    #[test]
    fn hermite_hits_endpoints() {
        let q0 = Quat::from_rotation_x(0.2);
        let q1 = Quat::from_rotation_y(0.9);
        let a = quat_hermite(q0, q1, Vec3::ZERO, Vec3::ZERO, 0.0);
        let b = quat_hermite(q0, q1, Vec3::ZERO, Vec3::ZERO, 1.0);
        assert!(q0.dot(a).abs() > 1.0 - 1e-5);
        assert!(q1.dot(b).abs() > 1.0 - 1e-5);
    }
}
