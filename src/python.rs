use numpy::{IntoPyArray, PyArray1, PyReadonlyArray2};
use pyo3::exceptions::{PyKeyError, PyValueError};
use pyo3::prelude::*;

use crate::apriori::{apriori, FrequentItemsets};
use crate::association_rules::association_rules;
use crate::config::{EmptyTransactionPolicy, Metric};
use crate::encoder::encode;
use crate::error::MiningError;
use crate::itemset::Itemset;
use crate::membership::Representation;

impl From<MiningError> for PyErr {
    fn from(err: MiningError) -> PyErr {
        match err {
            MiningError::MissingSupport { .. } => PyKeyError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

/// Flatten `(itemset, support)` pairs into CSR-style arrays.
fn flatten_results(results: Vec<(Vec<u32>, f64)>) -> (Vec<f64>, Vec<u32>, Vec<u32>) {
    let mut supports = Vec::with_capacity(results.len());
    let mut offsets = Vec::with_capacity(results.len() + 1);
    let total_items: usize = results.iter().map(|(items, _)| items.len()).sum();
    let mut all_items = Vec::with_capacity(total_items);

    offsets.push(0);
    for (mut items, support) in results {
        supports.push(support);
        all_items.append(&mut items);
        offsets.push(all_items.len() as u32);
    }
    (supports, offsets, all_items)
}

/// Apriori over a one-hot `(n_transactions, n_items)` matrix. All-zero rows
/// count as transactions, matching a one-hot DataFrame's row count.
#[pyfunction]
#[pyo3(signature = (data, min_support, max_len=None))]
pub fn apriori_from_dense<'py>(
    py: Python<'py>,
    data: PyReadonlyArray2<'py, u8>,
    min_support: f64,
    max_len: Option<usize>,
) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<u32>>, Bound<'py, PyArray1<u32>>)> {
    let arr = data.as_array();
    let transactions: Vec<Vec<u32>> = arr
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|&(_, &v)| v != 0)
                .map(|(col, _)| col as u32)
                .collect()
        })
        .collect();

    let results = py.allow_threads(move || -> Result<Vec<(Vec<u32>, f64)>, MiningError> {
        let encoded = encode(transactions, Representation::Auto, EmptyTransactionPolicy::Keep)?;
        let frequent = apriori(&encoded, min_support, max_len)?;
        Ok(frequent
            .iter()
            .map(|f| (f.itemset.into_vec(), f.support))
            .collect())
    })?;

    let (supports, offsets, items) = flatten_results(results);
    Ok((
        supports.into_pyarray(py),
        offsets.into_pyarray(py),
        items.into_pyarray(py),
    ))
}

/// Rules from column-id itemsets and their supports. Returns antecedents,
/// consequents and the metric columns `[antecedent support, consequent
/// support, support, confidence, lift, leverage, conviction]`.
#[pyfunction]
#[pyo3(signature = (itemsets, supports, num_itemsets, metric="lift", min_threshold=0.8))]
pub fn association_rules_inner(
    py: Python<'_>,
    itemsets: Vec<Vec<u32>>,
    supports: Vec<f64>,
    num_itemsets: usize,
    metric: &str,
    min_threshold: f64,
) -> PyResult<(Vec<Vec<u32>>, Vec<Vec<u32>>, Vec<Vec<f64>>)> {
    if itemsets.len() != supports.len() {
        return Err(PyValueError::new_err("itemsets and supports must have the same length"));
    }
    let metric: Metric = metric.parse()?;

    let rules = py.allow_threads(move || -> Result<_, MiningError> {
        let collection = FrequentItemsets::from_supports(
            itemsets.into_iter().map(Itemset::new).zip(supports),
            num_itemsets,
        )?;
        association_rules(&collection, metric, min_threshold)
    })?;

    let mut ant_out = Vec::with_capacity(rules.len());
    let mut con_out = Vec::with_capacity(rules.len());
    let mut metric_cols: Vec<Vec<f64>> = vec![Vec::with_capacity(rules.len()); 7];
    for rule in rules {
        let m = rule.metrics;
        let vals = [
            m.antecedent_support,
            m.consequent_support,
            m.support,
            m.confidence,
            m.lift,
            m.leverage,
            m.conviction,
        ];
        for (col, v) in metric_cols.iter_mut().zip(vals) {
            col.push(v);
        }
        ant_out.push(rule.antecedent.into_vec());
        con_out.push(rule.consequent.into_vec());
    }
    Ok((ant_out, con_out, metric_cols))
}

#[pymodule]
fn _rulemine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(apriori_from_dense, m)?)?;
    m.add_function(wrap_pyfunction!(association_rules_inner, m)?)?;
    Ok(())
}
