//! Opens single-field GRIB2 files on regular latitude/longitude grids.

use std::{fs::File, io::BufReader, path::Path};

use ndarray::Array2;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
/// One decoded 2-d field, rows along latitude.
pub struct GridField {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub values: Array2<f32>,
}

/// Decodes a cached grid file into a field.
pub trait GridReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<GridField>;
}

/// Reads the first submessage of a GRIB2 file.
pub struct GribReader;

impl GridReader for GribReader {
    fn read(&self, path: &Path) -> Result<GridField> {
        let f = BufReader::new(File::open(path)?);
        let grib2 = grib::from_reader(f).map_err(|e| Error::decode(path, e))?;

        let (_, submessage) = grib2
            .iter()
            .next()
            .ok_or_else(|| Error::decode(path, "file holds no submessages"))?;

        let (ni, nj) = submessage.grid_shape().map_err(|e| Error::decode(path, e))?;
        let points: Vec<(f32, f32)> = submessage
            .latlons()
            .map_err(|e| Error::decode(path, e))?
            .collect();

        let decoder =
            grib::Grib2SubmessageDecoder::from(submessage).map_err(|e| Error::decode(path, e))?;
        let values: Vec<f32> = decoder.dispatch().map_err(|e| Error::decode(path, e))?.collect();

        field_from_points(ni, nj, &points, values).map_err(|reason| Error::decode(path, reason))
    }
}

/// Builds a field from grid points in scan order (longitude varying fastest).
pub fn field_from_points(
    ni: usize,
    nj: usize,
    points: &[(f32, f32)],
    values: Vec<f32>,
) -> std::result::Result<GridField, String> {
    if points.len() != ni * nj || values.len() != ni * nj {
        return Err(format!(
            "expected {} grid points, found {} coordinates and {} values",
            ni * nj,
            points.len(),
            values.len()
        ));
    }

    let longitudes = points[..ni].iter().map(|(_, lon)| f64::from(*lon)).collect();
    let latitudes = (0..nj).map(|j| f64::from(points[j * ni].0)).collect();
    let values = Array2::from_shape_vec((nj, ni), values).map_err(|e| e.to_string())?;

    Ok(GridField {
        latitudes,
        longitudes,
        values,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Returns the same small field for every path.
    pub struct ConstantReader;

    impl GridReader for ConstantReader {
        fn read(&self, _path: &Path) -> Result<GridField> {
            Ok(GridField {
                latitudes: vec![47.0, 48.0],
                longitudes: vec![11.0, 12.0],
                values: Array2::from_elem((2, 2), 273.15),
            })
        }
    }

    #[test]
    fn should_split_scan_order_into_axes() {
        let points = vec![(47.0, 11.0), (47.0, 11.5), (47.0, 12.0), (47.5, 11.0), (47.5, 11.5), (47.5, 12.0)];
        let field = field_from_points(3, 2, &points, (0..6).map(|v| v as f32).collect()).unwrap();

        assert_eq!(field.longitudes, vec![11.0, 11.5, 12.0]);
        assert_eq!(field.latitudes, vec![47.0, 47.5]);
        assert_eq!(field.values[[1, 0]], 3.0);
    }

    #[test]
    fn should_reject_inconsistent_grid() {
        let points = vec![(47.0, 11.0), (47.0, 11.5)];
        assert!(field_from_points(2, 2, &points, vec![0.0; 4]).is_err());
    }
}
