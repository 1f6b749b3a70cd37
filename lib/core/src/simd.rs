// SIMD kernels for the squared Euclidean distance used by nearest-neighbor voting.
// Platform intrinsics where available, scalar fallback everywhere else.
// Every path yields exactly 0.0 for identical inputs.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

// Below this length the setup cost outweighs the vector width
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
const MIN_DIM_SIZE_SIMD: usize = 16;

/// Squared L2 distance between two equal-length slices.
/// Mismatched lengths are treated as infinitely far apart.
#[inline]
pub fn squared_l2_simd(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2")
            && is_x86_feature_detected!("fma")
            && a.len() >= MIN_DIM_SIZE_SIMD
        {
            return unsafe { squared_l2_avx2(a, b) };
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") && a.len() >= MIN_DIM_SIZE_SIMD {
            return unsafe { squared_l2_neon(a, b) };
        }
    }

    squared_l2_scalar(a, b)
}

/// AVX2 kernel, 16 floats per iteration over two registers
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
#[inline]
unsafe fn squared_l2_avx2(a: &[f32], b: &[f32]) -> f32 {
    let dim = a.len();
    let mut i = 0;

    let mut sum1 = _mm256_setzero_ps();
    let mut sum2 = _mm256_setzero_ps();

    while i + 15 < dim {
        let d1 = _mm256_sub_ps(
            _mm256_loadu_ps(a.as_ptr().add(i)),
            _mm256_loadu_ps(b.as_ptr().add(i)),
        );
        let d2 = _mm256_sub_ps(
            _mm256_loadu_ps(a.as_ptr().add(i + 8)),
            _mm256_loadu_ps(b.as_ptr().add(i + 8)),
        );

        sum1 = _mm256_fmadd_ps(d1, d1, sum1);
        sum2 = _mm256_fmadd_ps(d2, d2, sum2);

        i += 16;
    }

    let combined = _mm256_add_ps(sum1, sum2);

    // Horizontal sum of the 8 lanes
    let sum_high = _mm256_extractf128_ps(combined, 1);
    let sum_low = _mm256_castps256_ps128(combined);
    let mut sum_128 = _mm_add_ps(sum_high, sum_low);
    sum_128 = _mm_hadd_ps(sum_128, sum_128);
    sum_128 = _mm_hadd_ps(sum_128, sum_128);

    let mut dist = _mm_cvtss_f32(sum_128);

    while i < dim {
        let d = a[i] - b[i];
        dist += d * d;
        i += 1;
    }

    dist
}

/// NEON kernel for ARM64/Apple Silicon
#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
#[inline]
unsafe fn squared_l2_neon(a: &[f32], b: &[f32]) -> f32 {
    let dim = a.len();
    let mut i = 0;

    let mut sum1 = vdupq_n_f32(0.0);
    let mut sum2 = vdupq_n_f32(0.0);

    while i + 7 < dim {
        let d1 = vsubq_f32(vld1q_f32(a.as_ptr().add(i)), vld1q_f32(b.as_ptr().add(i)));
        let d2 = vsubq_f32(
            vld1q_f32(a.as_ptr().add(i + 4)),
            vld1q_f32(b.as_ptr().add(i + 4)),
        );

        sum1 = vfmaq_f32(sum1, d1, d1);
        sum2 = vfmaq_f32(sum2, d2, d2);

        i += 8;
    }

    while i + 3 < dim {
        let d = vsubq_f32(vld1q_f32(a.as_ptr().add(i)), vld1q_f32(b.as_ptr().add(i)));
        sum1 = vfmaq_f32(sum1, d, d);
        i += 4;
    }

    let mut dist = vaddvq_f32(vaddq_f32(sum1, sum2));

    while i < dim {
        let d = a[i] - b[i];
        dist += d * d;
        i += 1;
    }

    dist
}

/// Scalar fallback with two accumulators for better pipelining
#[inline]
fn squared_l2_scalar(a: &[f32], b: &[f32]) -> f32 {
    let mut acc0 = 0.0f32;
    let mut acc1 = 0.0f32;

    let a_chunks = a.chunks_exact(2);
    let b_chunks = b.chunks_exact(2);
    let a_rem = a_chunks.remainder();
    let b_rem = b_chunks.remainder();

    for (x, y) in a_chunks.zip(b_chunks) {
        let d0 = x[0] - y[0];
        let d1 = x[1] - y[1];
        acc0 += d0 * d0;
        acc1 += d1 * d1;
    }

    for (x, y) in a_rem.iter().zip(b_rem) {
        let d = x - y;
        acc0 += d * d;
    }

    acc0 + acc1
}
