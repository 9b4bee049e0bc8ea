/// Color stops of a terrain ramp: water blues, lowland greens, upland browns, white peaks.
const TERRAIN_STOPS: [(f32, [f32; 3]); 6] = [
    (0.00, [0.20, 0.20, 0.60]),
    (0.15, [0.00, 0.60, 1.00]),
    (0.25, [0.00, 0.80, 0.40]),
    (0.50, [1.00, 1.00, 0.60]),
    (0.75, [0.50, 0.36, 0.33]),
    (1.00, [1.00, 1.00, 1.00]),
];

pub fn terrain_color(value: f32, min: f32, max: f32) -> [u8; 3] {
    let t = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.5
    };

    let upper = TERRAIN_STOPS
        .iter()
        .position(|(stop, _)| *stop >= t)
        .unwrap_or(TERRAIN_STOPS.len() - 1)
        .max(1);
    let (t0, c0) = TERRAIN_STOPS[upper - 1];
    let (t1, c1) = TERRAIN_STOPS[upper];
    let f = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);

    std::array::from_fn(|i| ((c0[i] + (c1[i] - c0[i]) * f) * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_endpoints() {
        assert_eq!(terrain_color(0.0, 0.0, 100.0), [51, 51, 153]);
        assert_eq!(terrain_color(100.0, 0.0, 100.0), [255, 255, 255]);
    }

    #[test]
    fn test_out_of_range_values_clamp() {
        assert_eq!(terrain_color(-50.0, 0.0, 100.0), terrain_color(0.0, 0.0, 100.0));
        assert_eq!(terrain_color(500.0, 0.0, 100.0), terrain_color(100.0, 0.0, 100.0));
    }

    #[test]
    fn test_flat_range_uses_midpoint() {
        assert_eq!(terrain_color(7.0, 7.0, 7.0), [255, 255, 153]);
    }
}
