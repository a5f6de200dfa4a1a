//! 1-D spring arrangement along the spread axis.
//!
//! Fruchterman–Reingold restricted to one axis: every member repels every
//! other with k²/d, linked members attract with d²/k, and per-step movement
//! is capped by a temperature that cools linearly to zero. The iteration
//! count is fixed, never a convergence test.

use sha2::{Digest, Sha256};

/// Tuning for one spread computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub k: f64,
    pub iterations: usize,
    /// Results span at most `[-scale, scale]` before separation.
    pub scale: f64,
    pub min_separation: f64,
}

/// Stable seed in `[-1, 1]` from the device name.
pub fn seed(name: &str) -> f64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let v = u64::from_be_bytes(head) as f64 / u64::MAX as f64;
    v * 2.0 - 1.0
}

/// Spread coordinates for `names`, index-aligned.
///
/// `links` are index pairs into `names`; repeats are harmless but callers
/// pass each connected pair once. Identical inputs give bit-identical
/// output.
pub fn spread(names: &[&str], links: &[(usize, usize)], params: &SpringParams) -> Vec<f64> {
    let n = names.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![0.0];
    }

    let k = params.k;
    let width = k * n as f64;
    let mut pos: Vec<f64> = names.iter().map(|name| seed(name) * width / 2.0).collect();

    let t0 = width / 10.0;
    for step in 0..params.iterations {
        let t = t0 * (1.0 - step as f64 / params.iterations as f64);
        let mut disp = vec![0.0f64; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let (dir, dist) = direction(pos[i], pos[j]);
                let force = k * k / dist;
                disp[i] += dir * force;
                disp[j] -= dir * force;
            }
        }

        for &(a, b) in links {
            if a == b || a >= n || b >= n {
                continue;
            }
            let (dir, dist) = direction(pos[a], pos[b]);
            let force = dist * dist / k;
            disp[a] -= dir * force;
            disp[b] += dir * force;
        }

        for (p, d) in pos.iter_mut().zip(&disp) {
            *p += d.clamp(-t, t);
        }
    }

    normalize(&mut pos, params.scale);
    separate(&mut pos, params.min_separation);
    pos
}

/// Unit direction from `b` to `a` and the (floored) distance. Coincident
/// points are split by index order: the first one goes negative.
fn direction(a: f64, b: f64) -> (f64, f64) {
    let d = a - b;
    let dist = d.abs().max(1e-6);
    let dir = if d > 0.0 { 1.0 } else { -1.0 };
    (dir, dist)
}

/// Centre on zero and scale so the widest member sits at `±scale`.
fn normalize(pos: &mut [f64], scale: f64) {
    recentre(pos);
    let widest = pos.iter().fold(0.0f64, |m, p| m.max(p.abs()));
    if widest > 0.0 {
        for p in pos.iter_mut() {
            *p *= scale / widest;
        }
    }
}

/// Push members apart until neighbours are at least `gap` apart, keeping
/// their order, then re-centre.
fn separate(pos: &mut [f64], gap: f64) {
    if gap <= 0.0 {
        return;
    }
    let mut order: Vec<usize> = (0..pos.len()).collect();
    order.sort_by(|&x, &y| pos[x].total_cmp(&pos[y]).then(x.cmp(&y)));
    for w in 1..order.len() {
        let (prev, cur) = (order[w - 1], order[w]);
        if pos[cur] - pos[prev] < gap {
            pos[cur] = pos[prev] + gap;
        }
    }
    recentre(pos);
}

/// Apply per-member nudges (index-aligned with `pos`) without letting any
/// two neighbours move closer. Walking members in spread order, each gap
/// grows by however much the upper member's nudge exceeds the lower one's
/// and never shrinks, so order and separation survive. Re-centres.
pub fn nudge_apart(pos: &mut [f64], nudges: &[f64]) {
    if pos.len() < 2 || pos.len() != nudges.len() {
        return;
    }
    let mut order: Vec<usize> = (0..pos.len()).collect();
    order.sort_by(|&x, &y| pos[x].total_cmp(&pos[y]).then(x.cmp(&y)));

    let before = pos.to_vec();
    pos[order[0]] = before[order[0]] + nudges[order[0]];
    for w in 1..order.len() {
        let (prev, cur) = (order[w - 1], order[w]);
        let grow = (nudges[cur] - nudges[prev]).max(0.0);
        pos[cur] = pos[prev] + (before[cur] - before[prev]) + grow;
    }
    recentre(pos);
}

fn recentre(pos: &mut [f64]) {
    let mean = pos.iter().sum::<f64>() / pos.len() as f64;
    for p in pos.iter_mut() {
        *p -= mean;
    }
}
