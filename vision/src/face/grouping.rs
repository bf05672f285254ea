//! Clustering of raw sliding-window hits into face detections

use super::FaceBounds;

/// Merge overlapping candidate rectangles.
///
/// Candidates are partitioned into clusters of similar rectangles (`eps`
/// controls how far apart edges may be). Clusters with `group_threshold`
/// members or fewer are dropped, the rest are averaged, and an averaged
/// rectangle lying inside a better supported one is dropped as well.
/// A threshold of 0 returns the candidates untouched.
pub fn group_rectangles(
    rects: &[FaceBounds],
    group_threshold: usize,
    eps: f32,
) -> Vec<FaceBounds> {
    if group_threshold == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let (labels, class_count) = partition(rects, |a, b| similar(a, b, eps));

    let mut sums = vec![[0i64; 4]; class_count];
    let mut counts = vec![0usize; class_count];
    for (rect, &label) in rects.iter().zip(&labels) {
        let sum = &mut sums[label];
        sum[0] += rect.x as i64;
        sum[1] += rect.y as i64;
        sum[2] += rect.width as i64;
        sum[3] += rect.height as i64;
        counts[label] += 1;
    }

    let averaged: Vec<FaceBounds> = sums
        .iter()
        .zip(&counts)
        .map(|(sum, &count)| {
            let s = 1.0 / count as f64;
            FaceBounds {
                x: (sum[0] as f64 * s).round() as i32,
                y: (sum[1] as f64 * s).round() as i32,
                width: (sum[2] as f64 * s).round() as i32,
                height: (sum[3] as f64 * s).round() as i32,
            }
        })
        .collect();

    let mut grouped = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = counts[i];
        if n1 <= group_threshold {
            continue;
        }

        let nested = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = counts[j];
            if j == i || n2 <= group_threshold {
                return false;
            }
            let dx = (r2.width as f32 * eps).round() as i32;
            let dy = (r2.height as f32 * eps).round() as i32;

            r1.x >= r2.x - dx
                && r1.y >= r2.y - dy
                && r1.x + r1.width <= r2.x + r2.width + dx
                && r1.y + r1.height <= r2.y + r2.height + dy
                && (n2 > n1.max(3) || n1 < 3)
        });

        if !nested {
            grouped.push(*r1);
        }
    }

    grouped
}

fn similar(a: &FaceBounds, b: &FaceBounds, eps: f32) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f32 * 0.5;

    ((a.x - b.x).abs() as f32) <= delta
        && ((a.y - b.y).abs() as f32) <= delta
        && ((a.x + a.width - b.x - b.width).abs() as f32) <= delta
        && ((a.y + a.height - b.y - b.height).abs() as f32) <= delta
}

/// Union-find over an equivalence predicate. Labels are numbered in order of
/// first appearance.
fn partition<F>(items: &[FaceBounds], same: F) -> (Vec<usize>, usize)
where
    F: Fn(&FaceBounds, &FaceBounds) -> bool,
{
    let mut parent: Vec<usize> = (0..items.len()).collect();

    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if same(&items[i], &items[j]) {
                let (ri, rj) = (root(&mut parent, i), root(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut label_of_root = vec![usize::MAX; items.len()];
    let mut labels = Vec::with_capacity(items.len());
    let mut next = 0;
    for i in 0..items.len() {
        let r = root(&mut parent, i);
        if label_of_root[r] == usize::MAX {
            label_of_root[r] = next;
            next += 1;
        }
        labels.push(label_of_root[r]);
    }

    (labels, next)
}
