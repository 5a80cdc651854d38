//! Named linear colormaps for raster layers.

use std::collections::BTreeMap;

use image::Rgb;

/// Piecewise linear colormap over positions in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    stops: Vec<(f32, [u8; 3])>,
}

impl Colormap {
    /// Stops must be sorted by position.
    pub fn new(stops: Vec<(f32, [u8; 3])>) -> Self {
        Self { stops }
    }

    /// Color at position `t`, clamped to the end stops.
    pub fn at(&self, t: f32) -> Rgb<u8> {
        let Some(first) = self.stops.first() else {
            return Rgb([0, 0, 0]);
        };
        if t.is_nan() || t <= first.0 {
            return Rgb(first.1);
        }

        for pair in self.stops.windows(2) {
            let (p0, c0) = pair[0];
            let (p1, c1) = pair[1];
            if t <= p1 {
                let f = if p1 > p0 { (t - p0) / (p1 - p0) } else { 1.0 };
                return Rgb(interpolate(c0, c1, f));
            }
        }

        Rgb(self.stops[self.stops.len() - 1].1)
    }

    /// Color of `value` normalised into `[vmin, vmax]`.
    pub fn scaled(&self, value: f32, vmin: f32, vmax: f32) -> Rgb<u8> {
        let t = if vmax > vmin { (value - vmin) / (vmax - vmin) } else { 0.5 };
        self.at(t)
    }
}

fn interpolate(a: [u8; 3], b: [u8; 3], f: f32) -> [u8; 3] {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * f).round().clamp(0.0, 255.0) as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}

/// Colormap registry, built once and handed to the plotters.
#[derive(Debug, Clone, Default)]
pub struct Colormaps {
    maps: BTreeMap<String, Colormap>,
}

impl Colormaps {
    pub fn standard() -> Self {
        let mut maps = Self::default();
        // cloud cover: clear sky blue, thin cloud near white, overcast grey
        maps.register(
            "clcov",
            Colormap::new(vec![
                (0.0, [0, 128, 230]),
                (0.1, [230, 230, 230]),
                (1.0, [77, 77, 77]),
            ]),
        );
        maps.register(
            "temperature",
            Colormap::new(vec![
                (0.0, [48, 18, 160]),
                (0.3, [60, 140, 240]),
                (0.5, [235, 235, 235]),
                (0.7, [250, 180, 40]),
                (1.0, [160, 0, 20]),
            ]),
        );
        maps.register(
            "precipitation",
            Colormap::new(vec![
                (0.0, [255, 255, 255]),
                (0.2, [150, 210, 250]),
                (0.5, [30, 110, 220]),
                (1.0, [120, 0, 160]),
            ]),
        );
        maps.register("greys", Colormap::new(vec![(0.0, [255, 255, 255]), (1.0, [0, 0, 0])]));
        maps
    }

    pub fn register(&mut self, name: impl Into<String>, colormap: Colormap) {
        self.maps.insert(name.into(), colormap);
    }

    pub fn get(&self, name: &str) -> Option<&Colormap> {
        self.maps.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }
}
