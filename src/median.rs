use std::cmp::Ordering;

use rand::Rng;

/// Return <= for PartialOrd types.
///
/// Incomparable values (NaN) compare as equal.
fn less_eq<T: PartialOrd>(x: &T, y: &T) -> bool {
    use std::cmp::Ordering::{Equal, Less};

    matches!(x.partial_cmp(y), None | Some(Less) | Some(Equal))
}

/// Index of the median of one to three elements.
///
/// ```
/// use vptree::small_median;
/// assert_eq!(small_median(&[1.0]), 0);
/// assert_eq!(small_median(&[1.0, 2.0]), 0);
/// assert_eq!(small_median(&[2.0, 1.0]), 1);
/// assert_eq!(small_median(&[1.0, 2.0, 3.0]), 1);
/// assert_eq!(small_median(&[1.0, 3.0, 2.0]), 2);
/// assert_eq!(small_median(&[3.0, 1.0, 2.0]), 2);
/// assert_eq!(small_median(&[2.0, 1.0, 3.0]), 0);
/// assert_eq!(small_median(&[3.0, 2.0, 1.0]), 1);
/// assert_eq!(small_median(&[2.0, 3.0, 1.0]), 0);
/// ```
///
/// Panics on an empty slice or one with more than three elements.
pub fn small_median<T: PartialOrd>(arr: &[T]) -> usize {
    small_median_by(arr, &|a: &T, b: &T| less_eq(a, b))
}

/// `small_median` with a custom `x <= y` predicate.
pub fn small_median_by<T, F>(arr: &[T], f: &F) -> usize
where
    F: Fn(&T, &T) -> bool,
{
    match arr.len() {
        1 => 0,
        2 => {
            if f(&arr[0], &arr[1]) {
                0
            } else {
                1
            }
        }
        3 => {
            if f(&arr[1], &arr[2]) {
                if f(&arr[1], &arr[0]) {
                    if f(&arr[0], &arr[2]) {
                        0
                    } else {
                        2
                    }
                } else {
                    1
                }
            } else if f(&arr[2], &arr[0]) {
                if f(&arr[0], &arr[1]) {
                    0
                } else {
                    1
                }
            } else {
                2
            }
        }
        n => panic!("small_median_by takes 1 to 3 elements, got {}", n),
    }
}

/// Partial sort the elements such that `arr[k]` holds the element that
/// would be there after a full sort, every element before it compares
/// `<=` and every element after it compares `>=`.
///
/// Pivots are the median of three positions drawn from `rng`, so a seeded
/// generator gives a reproducible arrangement. Runs of equal elements are
/// grouped around the pivot, which keeps the expected cost linear even
/// when most elements compare equal.
///
/// Panics if `k >= arr.len()`.
pub fn quick_select_by<T, F, R>(arr: &mut [T], k: usize, cmp: &F, rng: &mut R)
where
    F: Fn(&T, &T) -> Ordering,
    R: Rng,
{
    assert!(k < arr.len(), "select position {} out of {}", k, arr.len());

    let mut lo = 0;
    let mut hi = arr.len();
    loop {
        let window = &mut arr[lo..hi];
        let n = window.len();
        if n <= 1 {
            return;
        }
        if n == 2 {
            if cmp(&window[1], &window[0]) == Ordering::Less {
                window.swap(0, 1);
            }
            return;
        }

        // Choose a random pivot (the median among three random elements)
        window.swap(0, rng.random_range(0..n));
        window.swap(1, rng.random_range(1..n));
        window.swap(2, rng.random_range(2..n));
        let le = |a: &T, b: &T| cmp(a, b) != Ordering::Greater;
        let mid_idx = small_median_by(&window[0..3], &le);
        window.swap(0, mid_idx);

        let (lt, gt) = partition3(window, cmp);
        let target = k - lo;
        if target < lt {
            hi = lo + lt;
        } else if target >= gt {
            lo += gt;
        } else {
            return;
        }
    }
}

/// Three-way partition around `arr[0]`.
///
/// Returns `(lt, gt)` such that `arr[..lt] < pivot`, `arr[lt..gt] == pivot`
/// and `arr[gt..] > pivot`.
fn partition3<T, F>(arr: &mut [T], cmp: &F) -> (usize, usize)
where
    F: Fn(&T, &T) -> Ordering,
{
    // The pivot stays at the front of the equal run while scanning.
    let mut lt = 0;
    let mut i = 1;
    let mut gt = arr.len();
    while i < gt {
        match cmp(&arr[i], &arr[lt]) {
            Ordering::Less => {
                arr.swap(i, lt);
                lt += 1;
                i += 1;
            }
            Ordering::Greater => {
                gt -= 1;
                arr.swap(i, gt);
            }
            Ordering::Equal => i += 1,
        }
    }
    (lt, gt)
}
