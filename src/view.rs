//! Named, queryable slices over a shared dataset.
//!
//! A [`View`] never copies the dataset it points at. Children hold the
//! parent's resolved dataset behind an `Arc`, so resolving a view only applies
//! its own query, and the selected arrays alias the root dataset's buffers.
//! Views link to their parent to build hierarchical names.

use std::{collections::BTreeMap, sync::Arc};

use serde::Deserialize;

use crate::{
    dataset::{Dataset, Label, Query, SelectMethod},
    error::{Error, Result},
    variable::Dimension,
};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
/// An explicit sub-view request, as written in the plotter config.
pub struct QuerySpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub method: SelectMethod,
    #[serde(flatten)]
    pub pins: BTreeMap<Dimension, Label>,
}

impl QuerySpec {
    pub fn to_query(&self) -> Query {
        self.pins
            .iter()
            .fold(Query::new().with_method(self.method), |q, (d, l)| q.pin(*d, *l))
    }
}

#[derive(Debug, Clone)]
pub struct View {
    node: Arc<ViewNode>,
}

#[derive(Debug)]
struct ViewNode {
    dataset: Arc<Dataset>,
    query: Query,
    name: Option<String>,
    long_name: Option<String>,
    parent: Option<View>,
}

impl View {
    pub fn root(dataset: Arc<Dataset>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self::build(dataset, Query::new(), Some(name.clone()), Some(name), None)
    }

    fn build(
        dataset: Arc<Dataset>,
        query: Query,
        name: Option<String>,
        long_name: Option<String>,
        parent: Option<View>,
    ) -> Self {
        Self {
            node: Arc::new(ViewNode {
                dataset,
                query,
                name,
                long_name,
                parent,
            }),
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.node.dataset
    }

    pub fn query(&self) -> &Query {
        &self.node.query
    }

    pub fn name(&self) -> Option<&str> {
        self.node.name.as_deref()
    }

    pub fn long_name(&self) -> Option<&str> {
        self.node.long_name.as_deref()
    }

    pub fn parent(&self) -> Option<&View> {
        self.node.parent.as_ref()
    }

    /// Whether both handles point at the same view.
    pub fn same(&self, other: &View) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Applies this view's own query to the dataset it holds.
    pub fn resolve(&self) -> Result<Arc<Dataset>> {
        if self.node.query.is_empty() {
            Ok(Arc::clone(&self.node.dataset))
        } else {
            Ok(Arc::new(self.node.dataset.sel(&self.node.query)?))
        }
    }

    /// One child per query spec. No specs yields this view unchanged.
    pub fn for_queries(&self, specs: &[QuerySpec]) -> Result<Vec<View>> {
        if specs.is_empty() {
            return Ok(vec![self.clone()]);
        }

        let base = self.resolve()?;
        Ok(specs
            .iter()
            .map(|spec| {
                let query = spec.to_query();
                let name = spec.name.clone().unwrap_or_else(|| pin_name(query.pins()));
                let long_name = spec
                    .long_name
                    .clone()
                    .or_else(|| spec.name.clone())
                    .unwrap_or_else(|| pin_long_name(query.pins()));
                View::build(
                    Arc::clone(&base),
                    query,
                    Some(name),
                    Some(long_name),
                    Some(self.clone()),
                )
            })
            .collect())
    }

    /// One child per combination of labels along `dimensions`.
    ///
    /// The first dimension varies slowest; labels follow stored order. No
    /// dimensions yields this view unchanged, an empty axis yields nothing.
    pub fn along_dimensions(&self, dimensions: &[Dimension]) -> Result<Vec<View>> {
        if dimensions.is_empty() {
            return Ok(vec![self.clone()]);
        }

        let base = self.resolve()?;
        let mut combinations: Vec<Vec<(Dimension, Label)>> = vec![Vec::new()];
        for dim in dimensions {
            let labels = distinct(
                base.labels(*dim)
                    .ok_or_else(|| Error::selection(*dim, "dimension not present in dataset"))?,
            );
            combinations = combinations
                .into_iter()
                .flat_map(|prefix| {
                    labels.iter().map(move |label| {
                        let mut pins = prefix.clone();
                        pins.push((*dim, *label));
                        pins
                    })
                })
                .collect();
        }

        Ok(combinations
            .into_iter()
            .map(|pins| {
                let name = pin_name(&pins);
                let long_name = pin_long_name(&pins);
                let query = pins.into_iter().fold(Query::new(), |q, (d, l)| q.pin(d, l));
                View::build(
                    Arc::clone(&base),
                    query,
                    Some(name),
                    Some(long_name),
                    Some(self.clone()),
                )
            })
            .collect())
    }

    /// Views from the root down to this one.
    pub fn chain(&self) -> Vec<&View> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.parent() {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Root-first names joined for use in file names.
    pub fn full_name(&self) -> String {
        self.chain()
            .iter()
            .filter_map(|v| v.name())
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Root-first long names joined for display.
    pub fn full_long_name(&self) -> String {
        self.chain()
            .iter()
            .filter_map(|v| v.long_name())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// First occurrence of every label, in stored order.
fn distinct(labels: Vec<Label>) -> Vec<Label> {
    let mut unique: Vec<Label> = Vec::with_capacity(labels.len());
    for label in labels {
        if !unique.iter().any(|l| l.matches(&label)) {
            unique.push(label);
        }
    }
    unique
}

fn pin_name(pins: &[(Dimension, Label)]) -> String {
    pins.iter()
        .map(|(d, l)| format!("{d}-{}", l.name()))
        .collect::<Vec<_>>()
        .join("_")
}

fn pin_long_name(pins: &[(Dimension, Label)]) -> String {
    pins.iter()
        .map(|(d, l)| format!("{d} {}", l.long_name()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        dataset::tests::{init_time, sample_dataset},
        variable::Variable,
    };

    fn root() -> View {
        View::root(Arc::new(sample_dataset()), "icon_eu")
    }

    fn named(name: &str, pins: &[(Dimension, Label)]) -> QuerySpec {
        QuerySpec {
            name: Some(name.to_string()),
            pins: pins.iter().cloned().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn should_yield_self_for_empty_queries() {
        let view = root();
        let children = view.for_queries(&[]).unwrap();
        assert_eq!(children.len(), 1);
        assert!(children[0].same(&view));
        assert_eq!(children[0].name(), Some("icon_eu"));
        assert!(children[0].query().is_empty());
    }

    #[test]
    fn should_yield_self_for_empty_dimensions() {
        let view = root();
        let children = view.along_dimensions(&[]).unwrap();
        assert_eq!(children.len(), 1);
        assert!(children[0].same(&view));
        assert_eq!(children[0].full_name(), "icon_eu");
        assert!(children[0].query().is_empty());
    }

    #[test]
    fn should_expand_time_in_stored_order() {
        let children = root().along_dimensions(&[Dimension::Time]).unwrap();
        assert_eq!(children.len(), 3);
        for (h, child) in children.iter().enumerate() {
            let expected = init_time() + Duration::hours(3 * h as i64);
            assert_eq!(child.query().pins(), &[(Dimension::Time, Label::Time(expected))]);
        }
        assert_eq!(children[1].name(), Some("time-2024-03-01T0300Z"));
        assert_eq!(children[1].long_name(), Some("time 01 Mar 2024 03:00 UTC"));
    }

    #[test]
    fn should_vary_first_dimension_slowest() {
        let times = (0..2)
            .map(|h| Label::Time(init_time() + Duration::hours(3 * h)))
            .collect();
        let dataset = Dataset::new()
            .with_coord(Dimension::Time, times)
            .with_coord(
                Dimension::Pressure,
                vec![850.0.into(), 700.0.into(), 500.0.into()],
            )
            .with_variable(
                Variable::Humidity3d,
                vec![Dimension::Time, Dimension::Pressure],
                ndarray::Array::zeros(ndarray::IxDyn(&[2, 3])),
            )
            .unwrap();
        let view = View::root(Arc::new(dataset), "icon_eu");

        let children = view
            .along_dimensions(&[Dimension::Pressure, Dimension::Time])
            .unwrap();
        assert_eq!(children.len(), 6);

        let pressures: Vec<f64> = children
            .iter()
            .map(|c| c.query().get(Dimension::Pressure).unwrap().as_number().unwrap())
            .collect();
        assert_eq!(pressures, vec![850.0, 850.0, 700.0, 700.0, 500.0, 500.0]);

        let hours: Vec<i64> = children
            .iter()
            .map(|c| (c.query().get(Dimension::Time).unwrap().as_time().unwrap() - init_time()).num_hours())
            .collect();
        assert_eq!(hours, vec![0, 3, 0, 3, 0, 3]);
        assert_eq!(
            children[1].full_name(),
            "icon_eu_pressure-850.00_time-2024-03-01T0300Z"
        );
    }

    #[test]
    fn should_expand_repeated_labels_once() {
        let t0 = Label::Time(init_time());
        let t3 = Label::Time(init_time() + Duration::hours(3));
        let dataset = Dataset::new()
            .with_coord(Dimension::Time, vec![t0, t3, t3])
            .with_variable(
                Variable::PressureSeaLevel,
                vec![Dimension::Time],
                ndarray::Array::zeros(ndarray::IxDyn(&[3])),
            )
            .unwrap();
        let view = View::root(Arc::new(dataset), "icon_eu");

        let names: Vec<String> = view
            .along_dimensions(&[Dimension::Time])
            .unwrap()
            .iter()
            .map(View::full_name)
            .collect();
        assert_eq!(
            names,
            vec!["icon_eu_time-2024-03-01T0000Z", "icon_eu_time-2024-03-01T0300Z"]
        );
    }

    #[test]
    fn should_resolve_without_copying_values() {
        let root = root();
        let root_values = &root
            .dataset()
            .variable(Variable::Temperature3d)
            .unwrap()
            .values;
        let start = root_values.as_ptr() as usize;
        let end = start + root_values.len() * std::mem::size_of::<f32>();

        let level = root
            .for_queries(&[named("500", &[(Dimension::Pressure, Label::Number(500.0))])])
            .unwrap()
            .remove(0);
        let leaf = level.along_dimensions(&[Dimension::Time]).unwrap().remove(1);
        let resolved = leaf.resolve().unwrap();
        let t = resolved.variable(Variable::Temperature3d).unwrap();

        let at = t.values.as_ptr() as usize;
        assert!(start <= at && at < end);
        assert_eq!(t.values[[1, 1]], 1211.0);
    }

    #[test]
    fn should_yield_nothing_for_empty_axis() {
        let empty = Dataset::new().with_coord(Dimension::Time, vec![]);
        let view = View::root(Arc::new(empty), "empty");
        assert!(view.along_dimensions(&[Dimension::Time]).unwrap().is_empty());
    }

    #[test]
    fn should_reject_unknown_dimension() {
        let err = root().along_dimensions(&[Dimension::Height]).unwrap_err();
        assert!(matches!(err, Error::Selection { dimension: Dimension::Height, .. }));
    }

    #[test]
    fn should_join_names_root_first() {
        let root = View::root(Arc::new(sample_dataset()), "root");
        let loc = root
            .for_queries(&[named("loc-A", &[(Dimension::Latitude, Label::Number(47.0))])])
            .unwrap()
            .remove(0);
        let time = loc
            .for_queries(&[named("time-0600", &[(Dimension::Time, Label::Time(init_time() + Duration::hours(6)))])])
            .unwrap()
            .remove(0);

        assert_eq!(time.full_name(), "root_loc-A_time-0600");
        assert_eq!(time.full_long_name(), "root loc-A time-0600");
        assert!(time.parent().unwrap().same(&loc));
    }

    #[test]
    fn should_resolve_only_own_query() {
        let root = root();
        let level = root
            .for_queries(&[named("850", &[(Dimension::Pressure, Label::Number(850.0))])])
            .unwrap()
            .remove(0);
        let point = level
            .for_queries(&[named("p", &[(Dimension::Latitude, Label::Number(48.0))])])
            .unwrap()
            .remove(0);

        // the child holds the parent's already-selected dataset
        assert!(point.dataset().coord(Dimension::Pressure).is_none());

        let resolved = point.resolve().unwrap();
        let t = resolved.variable(Variable::Temperature3d).unwrap();
        assert_eq!(t.dims, vec![Dimension::Time, Dimension::Longitude]);
        assert_eq!(resolved.scalar(Dimension::Pressure), Some(Label::Number(850.0)));
    }

    #[test]
    fn should_derive_names_for_unnamed_queries() {
        let spec = QuerySpec {
            pins: [(Dimension::Pressure, Label::Number(500.0))].into_iter().collect(),
            ..Default::default()
        };
        let child = root().for_queries(&[spec]).unwrap().remove(0);
        assert_eq!(child.name(), Some("pressure-500.00"));
        assert_eq!(child.full_name(), "icon_eu_pressure-500.00");
    }

    #[test]
    fn should_parse_query_spec_from_yaml() {
        let spec: QuerySpec = serde_yaml::from_str(
            "{ name: munich, long_name: Munich, latitude: 48.14, longitude: 11.58, method: nearest }",
        )
        .unwrap();
        assert_eq!(spec.name.as_deref(), Some("munich"));
        assert_eq!(spec.method, SelectMethod::Nearest);
        assert_eq!(spec.pins.len(), 2);
        assert_eq!(spec.pins[&Dimension::Latitude], Label::Number(48.14));
    }
}
