//! Map-style PNG rendering of 2-d latitude/longitude slices.
//!
//! Layers are painted in order: raster layers fill every pixel through a
//! colormap, contour layers draw isolines on top. North is up.

use std::path::PathBuf;

use image::{Rgb, RgbImage};
use ndarray::{Array2, Axis};
use serde::Deserialize;
use tracing::debug;

use super::{plot_error, require, PlotContext, Plotter};
use crate::{
    dataset::Label,
    error::{Error, Result},
    source::parse_options,
    variable::{Dimension, Variable},
    view::View,
};

const MODULE: &str = "horizontal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    Raster,
    Contour,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layer {
    pub field: Variable,
    pub layertype: LayerType,
    #[serde(default)]
    pub colormap: Option<String>,
    /// Contour spacing, in the field's units.
    #[serde(default)]
    pub interval: Option<f32>,
    #[serde(default)]
    pub vmin: Option<f32>,
    #[serde(default)]
    pub vmax: Option<f32>,
}

fn default_scale() -> u32 {
    4
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HorizontalOptions {
    pub layers: Vec<Layer>,
    /// Pixels per grid cell.
    #[serde(default = "default_scale")]
    pub scale: u32,
}

fn default_colormap(variable: Variable) -> &'static str {
    match variable {
        Variable::Cloudcover3d => "clcov",
        Variable::Temperature3d | Variable::TemperatureSurface => "temperature",
        Variable::PrecipitationAccumulated | Variable::SnowDepth => "precipitation",
        _ => "greys",
    }
}

pub struct HorizontalPlotter {
    context: PlotContext,
    options: Option<HorizontalOptions>,
}

impl HorizontalPlotter {
    pub fn create(context: PlotContext) -> Box<dyn Plotter> {
        Box::new(Self {
            context,
            options: None,
        })
    }

    fn render(&self, options: &HorizontalOptions, view: &View) -> std::result::Result<RgbImage, String> {
        let dataset = view.resolve().map_err(|e| e.to_string())?;
        let scale = options.scale.max(1);
        let mut image: Option<RgbImage> = None;

        for layer in &options.layers {
            let array = require(&dataset, layer.field)?;
            let grid = array
                .grid(Dimension::Latitude, Dimension::Longitude)
                .ok_or_else(|| {
                    format!(
                        "{} is not a latitude x longitude slice (dimensions {:?})",
                        layer.field, array.dims
                    )
                })?;
            let grid = north_up(grid, &dataset.labels(Dimension::Latitude).unwrap_or_default());
            let (rows, cols) = grid.dim();
            if rows == 0 || cols == 0 {
                return Err(format!("{} slice is empty", layer.field));
            }

            let canvas = image.get_or_insert_with(|| {
                RgbImage::from_pixel(cols as u32 * scale, rows as u32 * scale, Rgb([255, 255, 255]))
            });
            if canvas.dimensions() != (cols as u32 * scale, rows as u32 * scale) {
                return Err(format!("{} grid differs from the first layer", layer.field));
            }

            let (lo, hi) = value_range(&grid);
            let vmin = layer.vmin.unwrap_or(lo);
            let vmax = layer.vmax.unwrap_or(hi);

            match layer.layertype {
                LayerType::Raster => {
                    let name = layer
                        .colormap
                        .as_deref()
                        .unwrap_or_else(|| default_colormap(layer.field));
                    let colormap = self
                        .context
                        .colormaps
                        .get(name)
                        .ok_or_else(|| format!("unknown colormap `{name}`"))?;
                    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
                        let value = grid[[(y / scale) as usize, (x / scale) as usize]];
                        *pixel = colormap.scaled(value, vmin, vmax);
                    }
                }
                LayerType::Contour => {
                    let interval = layer.interval.unwrap_or((vmax - vmin) / 10.0);
                    for level in contour_levels(vmin, vmax, interval)? {
                        for (a, b) in march_squares(&grid, level) {
                            let to_pixel = |(x, y): (f32, f32)| {
                                ((x + 0.5) * scale as f32, (y + 0.5) * scale as f32)
                            };
                            draw_line(canvas, to_pixel(a), to_pixel(b), Rgb([0, 0, 0]));
                        }
                    }
                }
            }
        }

        image.ok_or_else(|| "no layers configured".to_string())
    }
}

impl Plotter for HorizontalPlotter {
    fn configure(&mut self, options: serde_yaml::Value) -> Result<()> {
        let options: HorizontalOptions = parse_options(MODULE, options)?;
        if options.layers.is_empty() {
            return Err(Error::configuration(MODULE, "at least one layer is required"));
        }
        for layer in &options.layers {
            if let Some(interval) = layer.interval {
                if !(interval > 0.0) {
                    return Err(Error::configuration(
                        MODULE,
                        format!("contour interval must be positive, got {interval}"),
                    ));
                }
            }
            if let Some(name) = &layer.colormap {
                if self.context.colormaps.get(name).is_none() {
                    let known: Vec<&str> = self.context.colormaps.names().collect();
                    return Err(Error::configuration(
                        MODULE,
                        format!("unknown colormap `{name}`, expected one of {}", known.join(", ")),
                    ));
                }
            }
        }
        self.options = Some(options);
        Ok(())
    }

    fn needed_variables(&self) -> Vec<Variable> {
        self.options
            .iter()
            .flat_map(|o| o.layers.iter().map(|l| l.field))
            .collect()
    }

    fn plot(&mut self, view: &View, unique_name: &str) -> Result<PathBuf> {
        let options = self
            .options
            .as_ref()
            .ok_or_else(|| plot_error(MODULE, unique_name, "plotter has not been configured"))?;
        let image = self
            .render(options, view)
            .map_err(|reason| plot_error(MODULE, unique_name, reason))?;

        let relative = PathBuf::from(format!("{unique_name}.png"));
        image
            .save(self.context.output_dir.join(&relative))
            .map_err(|e| plot_error(MODULE, unique_name, e))?;
        debug!(file = %relative.display(), "Wrote map");

        Ok(relative)
    }
}

/// Flips rows so the northernmost latitude comes first.
fn north_up(grid: Array2<f32>, latitudes: &[Label]) -> Array2<f32> {
    let ascending = match (latitudes.first(), latitudes.last()) {
        (Some(a), Some(b)) => a.as_number() < b.as_number(),
        _ => false,
    };
    if ascending {
        let mut flipped = grid;
        flipped.invert_axis(Axis(0));
        flipped
    } else {
        grid
    }
}

fn value_range(grid: &Array2<f32>) -> (f32, f32) {
    grid.iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
}

/// Upper bound on isolines per layer.
pub const MAX_CONTOUR_LEVELS: usize = 500;

/// Multiples of `interval` within `[min, max]`.
pub fn contour_levels(min: f32, max: f32, interval: f32) -> std::result::Result<Vec<f32>, String> {
    if !(interval > 0.0) || !(max > min) {
        return Ok(Vec::new());
    }
    let (min, max, interval) = (f64::from(min), f64::from(max), f64::from(interval));
    let start = (min / interval).ceil();
    let count = (max / interval).floor() - start + 1.0;
    if !(count <= MAX_CONTOUR_LEVELS as f64) {
        return Err(format!(
            "contour interval {interval} yields more than {MAX_CONTOUR_LEVELS} levels between {min} and {max}"
        ));
    }
    Ok((0..count.max(0.0) as usize)
        .map(|i| ((start + i as f64) * interval) as f32)
        .collect())
}

/// Isoline segments at `level`, in (column, row) grid coordinates.
pub fn march_squares(grid: &Array2<f32>, level: f32) -> Vec<((f32, f32), (f32, f32))> {
    let (rows, cols) = grid.dim();
    let mut segments = Vec::new();
    if rows < 2 || cols < 2 {
        return segments;
    }

    let edge = |x1: f32, y1: f32, x2: f32, y2: f32, v1: f32, v2: f32| {
        let t = if (v2 - v1).abs() < 1e-6 {
            0.5
        } else {
            ((level - v1) / (v2 - v1)).clamp(0.0, 1.0)
        };
        (x1 + t * (x2 - x1), y1 + t * (y2 - y1))
    };

    for y in 0..rows - 1 {
        for x in 0..cols - 1 {
            let tl = grid[[y, x]];
            let tr = grid[[y, x + 1]];
            let bl = grid[[y + 1, x]];
            let br = grid[[y + 1, x + 1]];
            if [tl, tr, bl, br].iter().any(|v| v.is_nan()) {
                continue;
            }

            let mut case = 0;
            if tl >= level {
                case |= 1;
            }
            if tr >= level {
                case |= 2;
            }
            if br >= level {
                case |= 4;
            }
            if bl >= level {
                case |= 8;
            }

            let (xf, yf) = (x as f32, y as f32);
            let top = edge(xf, yf, xf + 1.0, yf, tl, tr);
            let right = edge(xf + 1.0, yf, xf + 1.0, yf + 1.0, tr, br);
            let bottom = edge(xf, yf + 1.0, xf + 1.0, yf + 1.0, bl, br);
            let left = edge(xf, yf, xf, yf + 1.0, tl, bl);

            match case {
                1 | 14 => segments.push((left, top)),
                2 | 13 => segments.push((top, right)),
                3 | 12 => segments.push((left, right)),
                4 | 11 => segments.push((right, bottom)),
                5 => {
                    segments.push((left, top));
                    segments.push((right, bottom));
                }
                6 | 9 => segments.push((top, bottom)),
                7 | 8 => segments.push((left, bottom)),
                10 => {
                    segments.push((top, right));
                    segments.push((left, bottom));
                }
                _ => {}
            }
        }
    }

    segments
}

fn draw_line(image: &mut RgbImage, from: (f32, f32), to: (f32, f32), color: Rgb<u8>) {
    let (w, h) = image.dimensions();
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).ceil().max(1.0) as u32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let x = (from.0 + t * (to.0 - from.0)).floor();
        let y = (from.1 + t * (to.1 - from.1)).floor();
        if x >= 0.0 && y >= 0.0 && (x as u32) < w && (y as u32) < h {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ndarray::array;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        dataset::{tests::sample_dataset, Dataset},
        plotter::tests::context,
    };

    fn plotter(dir: &TempDir, yaml: &str) -> Box<dyn Plotter> {
        let mut plotter = HorizontalPlotter::create(context(dir));
        plotter.configure(serde_yaml::from_str(yaml).unwrap()).unwrap();
        plotter
    }

    #[test]
    fn should_need_every_layer_field() {
        let dir = TempDir::new().unwrap();
        let plotter = plotter(
            &dir,
            "{ layers: [ { field: cloudcover_3d, layertype: raster }, { field: pressure_sea_level, layertype: contour, interval: 400 } ] }",
        );
        assert_eq!(
            plotter.needed_variables(),
            vec![Variable::Cloudcover3d, Variable::PressureSeaLevel]
        );
    }

    #[test]
    fn should_reject_unknown_colormap() {
        let dir = TempDir::new().unwrap();
        let mut plotter = HorizontalPlotter::create(context(&dir));
        let options = serde_yaml::from_str(
            "{ layers: [ { field: snow_depth, layertype: raster, colormap: viridis } ] }",
        )
        .unwrap();
        assert!(matches!(plotter.configure(options), Err(Error::Configuration { .. })));

        let options = serde_yaml::from_str(
            "{ layers: [ { field: snow_depth, layertype: contour, interval: -5 } ] }",
        )
        .unwrap();
        assert!(matches!(plotter.configure(options), Err(Error::Configuration { .. })));
    }

    #[test]
    fn should_write_north_up_png() {
        let dir = TempDir::new().unwrap();
        let mut plotter = plotter(
            &dir,
            "{ scale: 1, layers: [ { field: temperature_3d, layertype: raster, colormap: greys } ] }",
        );
        let view = View::root(Arc::new(sample_dataset()), "t850")
            .for_queries(&[])
            .unwrap()
            .remove(0);
        let slice = view
            .along_dimensions(&[Dimension::Time, Dimension::Pressure])
            .unwrap()
            .remove(0);

        let file = plotter.plot(&slice, "t850_first").unwrap();
        assert_eq!(file, PathBuf::from("t850_first.png"));

        let image = image::open(dir.path().join(&file)).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (2, 2));
        // lowest value (lat 47, lon 11) ends up bottom left, in white
        assert_eq!(image.get_pixel(0, 1), &Rgb([255, 255, 255]));
        assert_eq!(image.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn should_fail_on_non_map_slice() {
        let dir = TempDir::new().unwrap();
        let mut plotter = plotter(&dir, "{ layers: [ { field: temperature_3d, layertype: raster } ] }");
        let view = View::root(Arc::new(sample_dataset()), "t");
        let err = plotter.plot(&view, "t").unwrap_err();
        assert!(matches!(err, Error::Plot { .. }));
    }

    #[test]
    fn should_trace_isolines_between_cells() {
        let grid = array![[0.0, 10.0], [0.0, 10.0]];
        let segments = march_squares(&grid, 5.0);
        assert_eq!(segments, vec![((0.5, 0.0), (0.5, 1.0))]);
        assert_eq!(contour_levels(0.0, 10.0, 4.0).unwrap(), vec![0.0, 4.0, 8.0]);
        assert!(contour_levels(0.0, 10.0, 0.0).unwrap().is_empty());
    }

    #[test]
    fn should_bound_contour_level_count() {
        let levels = contour_levels(100_000.0, 101_000.0, 250.0).unwrap();
        assert_eq!(levels, vec![100_000.0, 100_250.0, 100_500.0, 100_750.0, 101_000.0]);

        let err = contour_levels(100_000.0, 100_010.0, 0.001).unwrap_err();
        assert!(err.contains("more than 500 levels"));
    }

    #[test]
    fn should_fail_plot_on_dense_contours() {
        let dir = TempDir::new().unwrap();
        let field = Dataset::from_grid(
            Variable::PressureSeaLevel,
            vec![48.0, 47.0],
            vec![11.0, 12.0],
            array![[100_000.0, 100_010.0], [100_000.0, 100_010.0]],
        )
        .unwrap();
        let mut plotter = plotter(
            &dir,
            "{ layers: [ { field: pressure_sea_level, layertype: contour, interval: 0.001 } ] }",
        );
        let view = View::root(Arc::new(field), "mslp");
        assert!(matches!(plotter.plot(&view, "mslp"), Err(Error::Plot { .. })));
    }

    #[test]
    fn should_draw_contours_over_raster() {
        let dir = TempDir::new().unwrap();
        let field = Dataset::from_grid(
            Variable::PressureSeaLevel,
            vec![48.0, 47.0],
            vec![11.0, 12.0, 13.0],
            array![[100000.0, 101000.0, 102000.0], [100000.0, 101000.0, 102000.0]],
        )
        .unwrap();
        let mut plotter = plotter(
            &dir,
            "{ scale: 8, layers: [ { field: pressure_sea_level, layertype: raster }, { field: pressure_sea_level, layertype: contour, interval: 1000 } ] }",
        );
        let view = View::root(Arc::new(field), "mslp");
        plotter.plot(&view, "mslp").unwrap();

        let image = image::open(dir.path().join("mslp.png")).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (24, 16));
        assert_eq!(image.get_pixel(12, 8), &Rgb([0, 0, 0]));
    }
}
