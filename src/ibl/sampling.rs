use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

/// Smallest roughness fed to the GGX distribution. Exactly zero collapses the lobe.
pub const MIN_ROUGHNESS: f32 = 1e-3;

pub fn radical_inverse_vdc(bits: u32) -> f32 {
    (bits.reverse_bits() as f32) * 2.328_306_4e-10
}

/// `i`-th point of an `n`-point Hammersley set.
pub fn hammersley(i: u32, n: u32) -> Vec2 {
    Vec2::new(i as f32 / n.max(1) as f32, radical_inverse_vdc(i))
}

/// Orthonormal `(tangent, bitangent)` pair around `normal`.
pub fn tangent_frame(normal: Vec3) -> (Vec3, Vec3) {
    let up = if normal.z.abs() < 0.999 { Vec3::Z } else { Vec3::X };
    let tangent = up.cross(normal).normalize();
    let bitangent = normal.cross(tangent);
    (tangent, bitangent)
}

/// GGX half-vector around `normal` for the sample point `xi`.
pub fn importance_sample_ggx(xi: Vec2, normal: Vec3, roughness: f32) -> Vec3 {
    let a = roughness * roughness;
    let phi = TAU * xi.x;
    let cos_theta = ((1.0 - xi.y) / (1.0 + (a * a - 1.0) * xi.y)).max(0.0).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let h = Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta);
    let (tangent, bitangent) = tangent_frame(normal);
    (tangent * h.x + bitangent * h.y + normal * h.z).normalize()
}

/// GGX / Trowbridge-Reitz normal distribution.
pub fn distribution_ggx(n_dot_h: f32, roughness: f32) -> f32 {
    let a = roughness.max(MIN_ROUGHNESS);
    let a2 = a * a * a * a;
    let cos2 = n_dot_h * n_dot_h;
    // (1 - cos²) + cos²·α² instead of cos²·(α² - 1) + 1, which rounds to zero at tiny α.
    let denom = (1.0 - cos2) + cos2 * a2;
    a2 / (PI * denom * denom)
}

/// Schlick-GGX geometry term with the image-based-lighting remap `k = α² / 2`.
pub fn geometry_schlick_ggx_ibl(n_dot_v: f32, roughness: f32) -> f32 {
    let k = (roughness * roughness) * 0.5;
    n_dot_v / (n_dot_v * (1.0 - k) + k)
}

pub fn geometry_smith_ibl(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    geometry_schlick_ggx_ibl(n_dot_v, roughness) * geometry_schlick_ggx_ibl(n_dot_l, roughness)
}

pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * incident.dot(normal) * normal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radical_inverse_reverses_bits() {
        assert_eq!(radical_inverse_vdc(0), 0.0);
        assert!((radical_inverse_vdc(1) - 0.5).abs() < 1e-7);
        assert!((radical_inverse_vdc(2) - 0.25).abs() < 1e-7);
        assert!((radical_inverse_vdc(3) - 0.75).abs() < 1e-7);
    }

    #[test]
    fn hammersley_first_axis_is_linear() {
        let point = hammersley(3, 4);
        assert!((point.x - 0.75).abs() < 1e-7);
        assert!((point.y - 0.75).abs() < 1e-7);
    }

    #[test]
    fn tangent_frame_is_orthonormal() {
        for normal in [Vec3::Z, Vec3::NEG_Z, Vec3::Y, Vec3::new(1.0, 2.0, 3.0).normalize()] {
            let (t, b) = tangent_frame(normal);
            assert!(t.dot(normal).abs() < 1e-5);
            assert!(b.dot(normal).abs() < 1e-5);
            assert!(t.dot(b).abs() < 1e-5);
            assert!((t.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn smooth_ggx_samples_hug_the_normal() {
        let normal = Vec3::new(0.0, 1.0, 0.0);
        for i in 0..64 {
            let h = importance_sample_ggx(hammersley(i, 64), normal, 0.0);
            assert!(h.dot(normal) > 0.9999);
        }
    }

    #[test]
    fn distribution_is_finite_at_zero_roughness() {
        let d = distribution_ggx(1.0, 0.0);
        assert!(d.is_finite() && d > 0.0);
        for n_dot_h in [1.0, 0.999_999, 0.99] {
            let d = distribution_ggx(n_dot_h, MIN_ROUGHNESS);
            assert!(d.is_finite() && d >= 0.0, "n_dot_h {n_dot_h}: {d}");
        }
    }

    #[test]
    fn distribution_matches_the_textbook_form_at_moderate_roughness() {
        let roughness = 0.5f32;
        let a2 = roughness.powi(4);
        for n_dot_h in [0.2f32, 0.7, 1.0] {
            let expected = a2 / (PI * (n_dot_h * n_dot_h * (a2 - 1.0) + 1.0).powi(2));
            let d = distribution_ggx(n_dot_h, roughness);
            assert!((d - expected).abs() <= expected * 1e-4, "{d} vs {expected}");
        }
    }
}
