//! Labelled multi-axis arrays.
//!
//! A [`Dataset`] holds one n-dimensional array per [`Variable`], sharing a set
//! of labelled axes. Selecting a single label drops the axis and keeps the
//! label as a scalar coordinate, so a selected dataset still knows where it
//! came from. Selections share the value buffers of the dataset they were
//! taken from.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use ndarray::{Array2, ArcArray, ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    variable::{Dimension, Variable},
};

const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
/// A coordinate value along one axis.
pub enum Label {
    Number(f64),
    Time(DateTime<Utc>),
}

impl Label {
    /// Exact match, with a small tolerance for numbers.
    pub fn matches(&self, other: &Label) -> bool {
        match (self, other) {
            (Label::Number(a), Label::Number(b)) => (a - b).abs() <= TOLERANCE,
            (Label::Time(a), Label::Time(b)) => a == b,
            _ => false,
        }
    }

    /// Distance used for nearest-neighbour selection. Seconds for times.
    pub fn distance(&self, other: &Label) -> Option<f64> {
        match (self, other) {
            (Label::Number(a), Label::Number(b)) => Some((a - b).abs()),
            (Label::Time(a), Label::Time(b)) => Some((*a - *b).num_seconds().abs() as f64),
            _ => None,
        }
    }

    /// File-name safe rendering.
    pub fn name(&self) -> String {
        match self {
            Label::Number(n) => format!("{n:.2}"),
            Label::Time(t) => t.format("%Y-%m-%dT%H%MZ").to_string(),
        }
    }

    /// Display rendering.
    pub fn long_name(&self) -> String {
        match self {
            Label::Number(n) => format!("{n:.2}"),
            Label::Time(t) => t.format("%d %b %Y %H:%M UTC").to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Label::Number(n) => Some(*n),
            Label::Time(_) => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Label::Time(t) => Some(*t),
            Label::Number(_) => None,
        }
    }
}

impl From<f64> for Label {
    fn from(n: f64) -> Self {
        Label::Number(n)
    }
}

impl From<DateTime<Utc>> for Label {
    fn from(t: DateTime<Utc>) -> Self {
        Label::Time(t)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectMethod {
    #[default]
    Exact,
    Nearest,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Pins dimensions to single labels.
pub struct Query {
    pins: Vec<(Dimension, Label)>,
    method: SelectMethod,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(mut self, dimension: Dimension, label: impl Into<Label>) -> Self {
        self.pins.push((dimension, label.into()));
        self
    }

    pub fn with_method(mut self, method: SelectMethod) -> Self {
        self.method = method;
        self
    }

    pub fn pins(&self) -> &[(Dimension, Label)] {
        &self.pins
    }

    pub fn method(&self) -> SelectMethod {
        self.method
    }

    pub fn get(&self, dimension: Dimension) -> Option<&Label> {
        self.pins
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, l)| l)
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Labels along one axis, in stored order.
pub struct Coordinate {
    pub dimension: Dimension,
    pub labels: Vec<Label>,
}

impl Coordinate {
    pub fn new(dimension: Dimension, labels: Vec<Label>) -> Self {
        Self { dimension, labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn locate(&self, label: &Label, method: SelectMethod) -> Option<usize> {
        match method {
            SelectMethod::Exact => self.labels.iter().position(|l| l.matches(label)),
            SelectMethod::Nearest => self
                .labels
                .iter()
                .enumerate()
                .filter_map(|(i, l)| l.distance(label).map(|d| (i, d)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i),
        }
    }

    fn same_labels(&self, other: &Coordinate) -> bool {
        self.dimension == other.dimension
            && self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(&other.labels)
                .all(|(a, b)| a.matches(b))
    }
}

/// Reference-counted values; clones and selections alias one buffer.
pub type Values = ArcArray<f32, IxDyn>;

#[derive(Debug, Clone, PartialEq)]
/// One variable's values with the axes they are laid out along.
pub struct DataArray {
    pub dims: Vec<Dimension>,
    pub values: Values,
}

impl DataArray {
    pub fn new(dims: Vec<Dimension>, values: Values) -> Result<Self> {
        if dims.len() != values.ndim() {
            return Err(Error::Shape(format!(
                "{} dimension names for a {}-d array",
                dims.len(),
                values.ndim()
            )));
        }
        Ok(Self { dims, values })
    }

    pub fn axis_of(&self, dimension: Dimension) -> Option<usize> {
        self.dims.iter().position(|d| *d == dimension)
    }

    /// The single value of a 0-d array.
    pub fn scalar(&self) -> Option<f32> {
        if self.values.ndim() == 0 {
            self.values.first().copied()
        } else {
            None
        }
    }

    /// Values of a 1-d array along `dimension`.
    pub fn series(&self, dimension: Dimension) -> Option<Vec<f32>> {
        (self.dims.as_slice() == [dimension]).then(|| self.values.iter().copied().collect())
    }

    /// Values of a 2-d array as (`rows`, `cols`).
    pub fn grid(&self, rows: Dimension, cols: Dimension) -> Option<Array2<f32>> {
        let r = self.axis_of(rows)?;
        let c = self.axis_of(cols)?;
        if self.dims.len() != 2 {
            return None;
        }
        let view = self.values.view().into_dimensionality::<ndarray::Ix2>().ok()?;
        Some(if r < c { view.to_owned() } else { view.t().to_owned() })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    coords: Vec<Coordinate>,
    scalars: Vec<(Dimension, Label)>,
    variables: BTreeMap<Variable, DataArray>,
    attrs: BTreeMap<String, String>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single 2-d field on a regular latitude/longitude grid.
    pub fn from_grid(
        variable: Variable,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        values: Array2<f32>,
    ) -> Result<Self> {
        Dataset::new()
            .with_coord(Dimension::Latitude, latitudes.into_iter().map(Label::Number).collect())
            .with_coord(Dimension::Longitude, longitudes.into_iter().map(Label::Number).collect())
            .with_variable(
                variable,
                vec![Dimension::Latitude, Dimension::Longitude],
                values.into_dyn(),
            )
    }

    pub fn with_coord(mut self, dimension: Dimension, labels: Vec<Label>) -> Self {
        self.coords.retain(|c| c.dimension != dimension);
        self.scalars.retain(|(d, _)| *d != dimension);
        self.coords.push(Coordinate::new(dimension, labels));
        self
    }

    pub fn with_scalar(mut self, dimension: Dimension, label: impl Into<Label>) -> Self {
        self.coords.retain(|c| c.dimension != dimension);
        self.scalars.retain(|(d, _)| *d != dimension);
        self.scalars.push((dimension, label.into()));
        self
    }

    pub fn with_variable(
        mut self,
        variable: Variable,
        dims: Vec<Dimension>,
        values: ArrayD<f32>,
    ) -> Result<Self> {
        self.insert(variable, dims, values)?;
        Ok(self)
    }

    /// Adds a variable; every axis must already carry a coordinate of matching length.
    pub fn insert(
        &mut self,
        variable: Variable,
        dims: Vec<Dimension>,
        values: ArrayD<f32>,
    ) -> Result<()> {
        self.insert_array(variable, DataArray::new(dims, values.into_shared())?)
    }

    /// Adds or replaces a variable already wrapped in a [`DataArray`].
    pub fn insert_array(&mut self, variable: Variable, array: DataArray) -> Result<()> {
        for (axis, dim) in array.dims.iter().enumerate() {
            let coord = self
                .coord(*dim)
                .ok_or_else(|| Error::Shape(format!("{variable} uses {dim} which has no coordinate")))?;
            let len = array.values.len_of(Axis(axis));
            if coord.len() != len {
                return Err(Error::Shape(format!(
                    "{variable} has {len} values along {dim}, coordinate has {}",
                    coord.len()
                )));
            }
        }
        self.variables.insert(variable, array);
        Ok(())
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn coord(&self, dimension: Dimension) -> Option<&Coordinate> {
        self.coords.iter().find(|c| c.dimension == dimension)
    }

    pub fn scalar(&self, dimension: Dimension) -> Option<Label> {
        self.scalars
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, l)| *l)
    }

    /// Labels along `dimension` in stored order; a scalar coordinate counts as one.
    pub fn labels(&self, dimension: Dimension) -> Option<Vec<Label>> {
        self.coord(dimension)
            .map(|c| c.labels.clone())
            .or_else(|| self.scalar(dimension).map(|l| vec![l]))
    }

    /// Axes in stored order.
    pub fn dims(&self) -> Vec<Dimension> {
        self.coords.iter().map(|c| c.dimension).collect()
    }

    pub fn variable(&self, variable: Variable) -> Option<&DataArray> {
        self.variables.get(&variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&Variable, &DataArray)> {
        self.variables.iter()
    }

    pub fn contains(&self, variable: Variable) -> bool {
        self.variables.contains_key(&variable)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Selects one label per pinned dimension. Pinned axes become scalar coordinates.
    pub fn sel(&self, query: &Query) -> Result<Dataset> {
        let mut picks: Vec<(Dimension, usize)> = Vec::new();
        let mut scalars = self.scalars.clone();

        for (dim, label) in query.pins() {
            if picks.iter().any(|(d, _)| d == dim) {
                continue;
            }
            if let Some(coord) = self.coord(*dim) {
                let idx = coord.locate(label, query.method()).ok_or_else(|| {
                    Error::selection(*dim, format!("no value matching {}", label.long_name()))
                })?;
                picks.push((*dim, idx));
                scalars.push((*dim, coord.labels[idx]));
            } else if let Some(existing) = self.scalar(*dim) {
                if query.method() == SelectMethod::Exact && !existing.matches(label) {
                    return Err(Error::selection(
                        *dim,
                        format!(
                            "already fixed at {}, not {}",
                            existing.long_name(),
                            label.long_name()
                        ),
                    ));
                }
            } else {
                return Err(Error::selection(*dim, "dimension not present in dataset"));
            }
        }

        let coords = self
            .coords
            .iter()
            .filter(|c| !picks.iter().any(|(d, _)| *d == c.dimension))
            .cloned()
            .collect();

        let variables = self
            .variables
            .iter()
            .map(|(variable, array)| {
                let mut values = array.values.clone();
                let mut dims = array.dims.clone();
                for (dim, idx) in &picks {
                    if let Some(axis) = dims.iter().position(|d| d == dim) {
                        values = values.index_axis_move(Axis(axis), *idx);
                        dims.remove(axis);
                    }
                }
                (*variable, DataArray { dims, values })
            })
            .collect();

        Ok(Dataset {
            coords,
            scalars,
            variables,
            attrs: self.attrs.clone(),
        })
    }

    /// Differences between neighbours along `dimension`. The first entry has
    /// no predecessor and is NaN.
    pub fn diff(&self, variable: Variable, dimension: Dimension) -> Result<DataArray> {
        let array = self
            .variable(variable)
            .ok_or_else(|| Error::Shape(format!("no {variable} to difference")))?;
        let axis = array
            .axis_of(dimension)
            .map(Axis)
            .ok_or_else(|| Error::selection(dimension, format!("{variable} does not vary along it")))?;

        let mut diffed = array.values.to_owned();
        for i in 1..diffed.len_of(axis) {
            let previous = array.values.index_axis(axis, i - 1);
            let mut lane = diffed.index_axis_mut(axis, i);
            lane -= &previous;
        }
        if diffed.len_of(axis) > 0 {
            diffed.index_axis_mut(axis, 0).fill(f32::NAN);
        }

        DataArray::new(array.dims.clone(), diffed.into_shared())
    }

    /// Stacks `parts` along a new leading `dimension` labelled with `labels`.
    ///
    /// Every part must carry the same variables on the same axes.
    pub fn concat(parts: Vec<Dataset>, dimension: Dimension, labels: Vec<Label>) -> Result<Dataset> {
        if parts.is_empty() || parts.len() != labels.len() {
            return Err(Error::Shape(format!(
                "cannot concatenate {} parts with {} {dimension} labels",
                parts.len(),
                labels.len()
            )));
        }

        let first = &parts[0];
        for part in &parts[1..] {
            let coords_match = part.coords.len() == first.coords.len()
                && part.coords.iter().zip(&first.coords).all(|(a, b)| a.same_labels(b));
            let keys_match = part.variables.keys().eq(first.variables.keys());
            if !coords_match || !keys_match {
                return Err(Error::Shape(format!(
                    "parts concatenated along {dimension} do not share axes and variables"
                )));
            }
        }

        let mut variables = BTreeMap::new();
        for (variable, array) in &first.variables {
            let mut views = Vec::with_capacity(parts.len());
            for part in &parts {
                let other = &part.variables[variable];
                if other.dims != array.dims {
                    return Err(Error::Shape(format!("{variable} axes differ between parts")));
                }
                views.push(other.values.view());
            }
            let stacked = ndarray::stack(Axis(0), &views)
                .map_err(|e| Error::Shape(format!("{variable}: {e}")))?;
            let mut dims = Vec::with_capacity(array.dims.len() + 1);
            dims.push(dimension);
            dims.extend(&array.dims);
            variables.insert(
                *variable,
                DataArray {
                    dims,
                    values: stacked
                        .into_dimensionality::<IxDyn>()
                        .map_err(|e| Error::Shape(e.to_string()))?
                        .into_shared(),
                },
            );
        }

        let mut coords = vec![Coordinate::new(dimension, labels)];
        coords.extend(first.coords.iter().cloned());

        Ok(Dataset {
            coords,
            scalars: first
                .scalars
                .iter()
                .filter(|(d, _)| *d != dimension)
                .cloned()
                .collect(),
            variables,
            attrs: first.attrs.clone(),
        })
    }

    /// Combines variable-bearing datasets whose shared axes agree.
    pub fn merge(parts: Vec<Dataset>) -> Result<Dataset> {
        let mut merged = Dataset::new();

        for part in parts {
            for coord in part.coords {
                match merged.coord(coord.dimension) {
                    Some(existing) if !existing.same_labels(&coord) => {
                        return Err(Error::Shape(format!(
                            "{} labels disagree between merged parts",
                            coord.dimension
                        )))
                    }
                    Some(_) => {}
                    None => merged.coords.push(coord),
                }
            }
            for (dim, label) in part.scalars {
                match merged.scalar(dim) {
                    Some(existing) if !existing.matches(&label) => {
                        return Err(Error::Shape(format!("scalar {dim} disagrees between merged parts")))
                    }
                    Some(_) => {}
                    None => merged.scalars.push((dim, label)),
                }
            }
            for (variable, array) in part.variables {
                if merged.variables.insert(variable, array).is_some() {
                    return Err(Error::Shape(format!("{variable} appears in more than one part")));
                }
            }
            merged.attrs.extend(part.attrs);
        }

        Ok(merged)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dimensions:")?;
        for coord in &self.coords {
            writeln!(f, "  {}: {}", coord.dimension, coord.len())?;
        }
        if !self.scalars.is_empty() {
            writeln!(f, "Scalars:")?;
            for (dim, label) in &self.scalars {
                writeln!(f, "  {dim} = {}", label.long_name())?;
            }
        }
        writeln!(f, "Variables:")?;
        for (variable, array) in &self.variables {
            let dims: Vec<&str> = array.dims.iter().map(Dimension::as_str).collect();
            writeln!(f, "  {variable} ({})", dims.join(", "))?;
        }
        for (key, value) in &self.attrs {
            writeln!(f, "@{key}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Duration, TimeZone};
    use ndarray::Array;

    use super::*;

    pub fn init_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    /// temperature_3d over time(3) x pressure(3) x latitude(2) x longitude(2).
    pub fn sample_dataset() -> Dataset {
        let times = (0..3)
            .map(|h| Label::Time(init_time() + Duration::hours(3 * h)))
            .collect();
        let values = Array::from_shape_fn(IxDyn(&[3, 3, 2, 2]), |ix| {
            (ix[0] * 1000 + ix[1] * 100 + ix[2] * 10 + ix[3]) as f32
        });
        Dataset::new()
            .with_coord(Dimension::Time, times)
            .with_coord(
                Dimension::Pressure,
                vec![850.0.into(), 700.0.into(), 500.0.into()],
            )
            .with_coord(Dimension::Latitude, vec![47.0.into(), 48.0.into()])
            .with_coord(Dimension::Longitude, vec![11.0.into(), 12.0.into()])
            .with_scalar(Dimension::InitTime, init_time())
            .with_variable(
                Variable::Temperature3d,
                vec![
                    Dimension::Time,
                    Dimension::Pressure,
                    Dimension::Latitude,
                    Dimension::Longitude,
                ],
                values,
            )
            .unwrap()
    }

    #[test]
    fn should_select_single_pressure_level() {
        let ds = sample_dataset();
        let sel = ds.sel(&Query::new().pin(Dimension::Pressure, 850.0)).unwrap();

        assert_eq!(sel.dims(), vec![Dimension::Time, Dimension::Latitude, Dimension::Longitude]);
        assert_eq!(sel.scalar(Dimension::Pressure), Some(Label::Number(850.0)));
        let t = sel.variable(Variable::Temperature3d).unwrap();
        assert_eq!(t.values.shape(), &[3, 2, 2]);
        assert!(t.values.iter().all(|v| (*v as u32 / 100) % 10 == 0));
    }

    #[test]
    fn should_share_buffer_with_selection() {
        let ds = sample_dataset();
        let root = ds.variable(Variable::Temperature3d).unwrap();
        let sel = ds
            .sel(&Query::new().pin(Dimension::Time, init_time() + Duration::hours(6)))
            .unwrap();
        let t = sel.variable(Variable::Temperature3d).unwrap();

        let start = root.values.as_ptr() as usize;
        let end = start + root.values.len() * std::mem::size_of::<f32>();
        let at = t.values.as_ptr() as usize;
        assert!(start < at && at < end);
        assert_eq!(t.values[[0, 0, 0]], 2000.0);
    }

    #[test]
    fn should_difference_along_time() {
        let ds = sample_dataset();
        let d = ds.diff(Variable::Temperature3d, Dimension::Time).unwrap();

        assert_eq!(d.dims, ds.variable(Variable::Temperature3d).unwrap().dims);
        assert!(d.values[[0, 1, 0, 1]].is_nan());
        assert_eq!(d.values[[1, 1, 0, 1]], 1000.0);
        assert_eq!(d.values[[2, 2, 1, 0]], 1000.0);

        assert!(ds.diff(Variable::SnowDepth, Dimension::Time).is_err());
        assert!(matches!(
            ds.diff(Variable::Temperature3d, Dimension::Height),
            Err(Error::Selection { .. })
        ));
    }

    #[test]
    fn should_fail_on_missing_label() {
        let ds = sample_dataset();
        let err = ds.sel(&Query::new().pin(Dimension::Pressure, 925.0)).unwrap_err();
        assert!(matches!(err, Error::Selection { dimension: Dimension::Pressure, .. }));

        let err = ds.sel(&Query::new().pin(Dimension::Height, 10.0)).unwrap_err();
        assert!(matches!(err, Error::Selection { dimension: Dimension::Height, .. }));
    }

    #[test]
    fn should_select_nearest_grid_point() {
        let ds = sample_dataset();
        let query = Query::new()
            .pin(Dimension::Latitude, 47.9)
            .pin(Dimension::Longitude, 11.2)
            .with_method(SelectMethod::Nearest);
        let sel = ds.sel(&query).unwrap();

        assert_eq!(sel.scalar(Dimension::Latitude), Some(Label::Number(48.0)));
        assert_eq!(sel.scalar(Dimension::Longitude), Some(Label::Number(11.0)));
        let t = sel.variable(Variable::Temperature3d).unwrap();
        assert_eq!(t.dims, vec![Dimension::Time, Dimension::Pressure]);
        assert_eq!(t.values[[1, 2]], 1210.0);
    }

    #[test]
    fn should_accept_pin_matching_existing_scalar() {
        let ds = sample_dataset();
        let sel = ds.sel(&Query::new().pin(Dimension::InitTime, init_time())).unwrap();
        assert_eq!(sel.dims().len(), 4);
    }

    #[test]
    fn should_concat_along_new_axis() {
        let field = |v: f32| {
            Dataset::from_grid(
                Variable::PressureSeaLevel,
                vec![47.0, 48.0],
                vec![11.0],
                Array2::from_elem((2, 1), v),
            )
            .unwrap()
        };
        let ds = Dataset::concat(
            vec![field(1.0), field(2.0)],
            Dimension::Time,
            vec![init_time().into(), (init_time() + Duration::hours(3)).into()],
        )
        .unwrap();

        let mslp = ds.variable(Variable::PressureSeaLevel).unwrap();
        assert_eq!(mslp.dims[0], Dimension::Time);
        assert_eq!(mslp.values.shape(), &[2, 2, 1]);
        assert_eq!(mslp.values[[1, 0, 0]], 2.0);
    }

    #[test]
    fn should_refuse_concat_of_mismatched_grids() {
        let a = Dataset::from_grid(Variable::SnowDepth, vec![1.0], vec![1.0], Array2::zeros((1, 1))).unwrap();
        let b = Dataset::from_grid(Variable::SnowDepth, vec![2.0], vec![1.0], Array2::zeros((1, 1))).unwrap();
        assert!(Dataset::concat(vec![a, b], Dimension::Time, vec![0.0.into(), 1.0.into()]).is_err());
    }

    #[test]
    fn should_merge_variables_sharing_axes() {
        let t = sample_dataset();
        let mslp = Dataset::concat(
            (0..3)
                .map(|_| {
                    Dataset::from_grid(
                        Variable::PressureSeaLevel,
                        vec![47.0, 48.0],
                        vec![11.0, 12.0],
                        Array2::from_elem((2, 2), 101325.0),
                    )
                    .unwrap()
                })
                .collect(),
            Dimension::Time,
            t.labels(Dimension::Time).unwrap(),
        )
        .unwrap();

        let merged = Dataset::merge(vec![t, mslp]).unwrap();
        assert!(merged.contains(Variable::Temperature3d));
        assert!(merged.contains(Variable::PressureSeaLevel));
        assert_eq!(merged.dims().len(), 4);
    }

    #[test]
    fn should_extract_grid_in_requested_orientation() {
        let ds = sample_dataset()
            .sel(
                &Query::new()
                    .pin(Dimension::Time, init_time())
                    .pin(Dimension::Pressure, 500.0),
            )
            .unwrap();
        let t = ds.variable(Variable::Temperature3d).unwrap();
        let grid = t.grid(Dimension::Longitude, Dimension::Latitude).unwrap();
        assert_eq!(grid[[1, 0]], 201.0);
    }

    #[test]
    fn should_format_labels() {
        assert_eq!(Label::Number(850.0).name(), "850.00");
        assert_eq!(Label::Time(init_time()).name(), "2024-03-01T0000Z");
        assert_eq!(Label::Time(init_time()).long_name(), "01 Mar 2024 00:00 UTC");
    }
}
