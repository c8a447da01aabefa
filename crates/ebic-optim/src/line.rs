//! One-dimensional minimization along a search direction
//!
//! A minimum is first bracketed by golden-ratio expansion with parabolic
//! extrapolation, then refined by Brent's method (parabolic interpolation
//! with golden-section fallback).

const GOLD: f64 = 1.618_033_988_749_895;
const CGOLD: f64 = 0.381_966_011_250_105;
const GROW_LIMIT: f64 = 100.0;
const TINY: f64 = 1e-20;

/// Three abscissae with `fb <= fa`; when `fb <= fc` as well, the minimum
/// lies between `a` and `c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Bracket {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub fa: f64,
    pub fb: f64,
    pub fc: f64,
}

impl Bracket {
    /// Whether the bracket actually encloses a minimum
    pub fn is_closed(&self) -> bool {
        self.fb <= self.fc
    }
}

#[inline]
fn sign(a: f64, b: f64) -> f64 {
    if b >= 0.0 { a.abs() } else { -a.abs() }
}

/// Bracket a minimum of `f` starting from `a` (with known value `fa`) and
/// a first trial step to `b`.
///
/// At most `max_evals` evaluations are spent; if the budget runs out while
/// the function is still decreasing the returned bracket is open.
pub(crate) fn bracket_minimum<E>(
    f: &mut impl FnMut(f64) -> Result<f64, E>,
    a: f64,
    b: f64,
    fa: f64,
    max_evals: usize,
) -> Result<Bracket, E> {
    let (mut a, mut b, mut fa) = (a, b, fa);
    let mut fb = f(b)?;
    if fb > fa {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut c = b + GOLD * (b - a);
    let mut fc = f(c)?;
    let mut evals = 2;

    while fb > fc && evals < max_evals {
        let r = (b - a) * (fb - fc);
        let q = (b - c) * (fb - fa);
        let mut u = b - ((b - c) * q - (b - a) * r) / (2.0 * sign((q - r).abs().max(TINY), q - r));
        let ulim = b + GROW_LIMIT * (c - b);
        let mut fu;

        if (b - u) * (u - c) > 0.0 {
            // Parabolic u between b and c
            fu = f(u)?;
            evals += 1;
            if fu < fc {
                return Ok(Bracket {
                    a: b,
                    b: u,
                    c,
                    fa: fb,
                    fb: fu,
                    fc,
                });
            } else if fu > fb {
                return Ok(Bracket {
                    a,
                    b,
                    c: u,
                    fa,
                    fb,
                    fc: fu,
                });
            }
            u = c + GOLD * (c - b);
            fu = f(u)?;
            evals += 1;
        } else if (c - u) * (u - ulim) > 0.0 {
            // Parabolic u between c and its allowed limit
            fu = f(u)?;
            evals += 1;
            if fu < fc {
                b = c;
                c = u;
                u = c + GOLD * (c - b);
                fb = fc;
                fc = fu;
                fu = f(u)?;
                evals += 1;
            }
        } else if (u - ulim) * (ulim - c) >= 0.0 {
            u = ulim;
            fu = f(u)?;
            evals += 1;
        } else {
            u = c + GOLD * (c - b);
            fu = f(u)?;
            evals += 1;
        }

        a = b;
        b = c;
        c = u;
        fa = fb;
        fb = fc;
        fc = fu;
    }

    Ok(Bracket {
        a,
        b,
        c,
        fa,
        fb,
        fc,
    })
}

/// Refine a closed bracket with Brent's method.
///
/// Stops when the bracket shrinks below `tolerance * (|x| + 1)` or after
/// `max_iterations` evaluations. Returns `(x_min, f_min)`; `f_min` never
/// exceeds `bracket.fb`.
pub(crate) fn brent_minimize<E>(
    f: &mut impl FnMut(f64) -> Result<f64, E>,
    bracket: &Bracket,
    tolerance: f64,
    max_iterations: usize,
) -> Result<(f64, f64), E> {
    let mut a = bracket.a.min(bracket.c);
    let mut b = bracket.a.max(bracket.c);
    let (mut x, mut w, mut v) = (bracket.b, bracket.b, bracket.b);
    let (mut fx, mut fw, mut fv) = (bracket.fb, bracket.fb, bracket.fb);
    let mut d: f64 = 0.0;
    let mut e: f64 = 0.0;

    for _ in 0..max_iterations {
        let xm = 0.5 * (a + b);
        let tol1 = tolerance * (x.abs() + 1.0);
        let tol2 = 2.0 * tol1;
        if (x - xm).abs() <= tol2 - 0.5 * (b - a) {
            break;
        }

        if e.abs() > tol1 {
            let r = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            let etemp = e;
            e = d;
            if p.abs() >= (0.5 * q * etemp).abs() || p <= q * (a - x) || p >= q * (b - x) {
                e = if x >= xm { a - x } else { b - x };
                d = CGOLD * e;
            } else {
                d = p / q;
                let u = x + d;
                if u - a < tol2 || b - u < tol2 {
                    d = sign(tol1, xm - x);
                }
            }
        } else {
            e = if x >= xm { a - x } else { b - x };
            d = CGOLD * e;
        }

        let u = if d.abs() >= tol1 { x + d } else { x + sign(tol1, d) };
        let fu = f(u)?;

        if fu <= fx {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            w = x;
            x = u;
            fv = fw;
            fw = fx;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                w = u;
                fv = fw;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }

    Ok((x, fx))
}

/// Bracket then refine a minimum along `f`, starting at 0 with value `f0`.
///
/// Returns `(alpha, f(alpha))` with `f(alpha) <= f0`; without a strict
/// decrease `alpha` is 0.
pub(crate) fn line_minimize<E>(
    f: &mut impl FnMut(f64) -> Result<f64, E>,
    f0: f64,
    step: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<(f64, f64), E> {
    let bracket = bracket_minimum(f, 0.0, step, f0, max_iterations)?;
    let (x, fx) = if bracket.is_closed() {
        brent_minimize(f, &bracket, tolerance, max_iterations)?
    } else {
        (bracket.c, bracket.fc)
    };
    if fx < f0 { Ok((x, fx)) } else { Ok((0.0, f0)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_bracket_encloses_parabola_minimum() {
        let mut f = |x: f64| Ok::<_, Infallible>((x - 3.0).powi(2));
        let b = bracket_minimum(&mut f, 0.0, 0.5, 9.0, 50).unwrap();
        assert!(b.is_closed());
        let lo = b.a.min(b.c);
        let hi = b.a.max(b.c);
        assert!(lo <= 3.0 && 3.0 <= hi, "bracket {b:?}");
        assert!(b.fb <= b.fa);
    }

    #[test]
    fn test_bracket_reverses_uphill_step() {
        let mut f = |x: f64| Ok::<_, Infallible>((x + 2.0).powi(2));
        let b = bracket_minimum(&mut f, 0.0, 1.0, 4.0, 50).unwrap();
        assert!(b.is_closed());
        assert!(b.a.min(b.c) <= -2.0 && -2.0 <= b.a.max(b.c));
    }

    #[test]
    fn test_line_minimize_quadratic() {
        let mut f = |x: f64| Ok::<_, Infallible>((x - 1.25).powi(2) + 2.0);
        let (x, fx) = line_minimize(&mut f, 1.25f64.powi(2) + 2.0, 0.1, 1e-8, 100).unwrap();
        assert!((x - 1.25).abs() < 1e-4, "x = {x}");
        assert!((fx - 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_line_minimize_flat_function_stays_put() {
        let mut f = |_x: f64| Ok::<_, Infallible>(5.0);
        let (x, fx) = line_minimize(&mut f, 5.0, 1.0, 1e-3, 20).unwrap();
        assert_eq!(fx, 5.0);
        assert_eq!(x, 0.0);
    }

    #[test]
    fn test_line_minimize_never_worse_than_start() {
        // Step function with a spike next to the origin
        let mut f = |x: f64| Ok::<_, Infallible>(if x.abs() < 1e-9 { 1.0 } else { 2.0 });
        let (_, fx) = line_minimize(&mut f, 1.0, 0.5, 1e-3, 20).unwrap();
        assert_eq!(fx, 1.0);
    }

    #[test]
    fn test_error_propagates() {
        let mut f = |x: f64| if x > 0.2 { Err("boom") } else { Ok(x) };
        assert!(line_minimize(&mut f, 0.0, 1.0, 1e-3, 20).is_err());
    }
}
