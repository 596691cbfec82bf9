use {
    std::{
        collections::BTreeMap,
        sync::Arc
    },
    sprs::{CsMat, TriMat},
    super::{
        catalog::{Catalog, CompositeIndex},
        error::ModelError
    }
};

/// Coordinate format data as delivered by the input layer, 0-based.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Triplets{
    pub shape: (usize, usize),
    pub entries: Vec<(usize, usize, f64)>
}

impl Triplets{
    pub fn new(rows: usize, cols: usize) -> Self
    {
        Self { shape: (rows, cols), entries: Vec::new() }
    }

    /// Column vector from dense values
    #[cfg(test)]
    pub fn column(values: &[f64]) -> Self
    {
        let entries = values.iter()
            .enumerate()
            .map(|(row, &v)| (row, 0, v))
            .collect();
        Self { shape: (values.len(), 1), entries }
    }

    pub fn push(&mut self, row: usize, col: usize, value: f64)
    {
        self.entries.push((row, col, value));
    }

    /// Checks the shape, sums duplicates and drops explicit zeros.
    fn into_clean_entries(
        self,
        operator: &str,
        expected: (usize, usize)
    ) -> Result<BTreeMap<(usize, usize), f64>, ModelError>
    {
        if self.shape != expected {
            return Err(
                ModelError::ShapeMismatch {
                    operator: operator.to_owned(),
                    expected,
                    found: self.shape
                }
            );
        }
        let mut summed: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for (row, col, value) in self.entries {
            if row >= expected.0 || col >= expected.1 {
                return Err(
                    ModelError::EntryOutOfBounds {
                        operator: operator.to_owned(),
                        row,
                        col,
                        shape: expected
                    }
                );
            }
            *summed.entry((row, col)).or_insert(0.0) += value;
        }
        summed.retain(|_, v| *v != 0.0);
        Ok(summed)
    }
}

/// Dense vector over a composite domain
#[derive(Clone, Debug, PartialEq)]
pub struct DomainVector{
    index: Arc<CompositeIndex>,
    values: Vec<f64>
}

/// Quantity of every (country, item) at one simulation step
pub type FlowVector = DomainVector;

impl DomainVector{
    pub fn new(index: &Arc<CompositeIndex>, values: Vec<f64>) -> Result<Self, ModelError>
    {
        if values.len() != index.len(){
            return Err(
                ModelError::ShapeMismatch {
                    operator: "vector".to_owned(),
                    expected: (index.len(), 1),
                    found: (values.len(), 1)
                }
            );
        }
        Ok(Self { index: index.clone(), values })
    }

    #[cfg(test)]
    pub fn zeros(index: &Arc<CompositeIndex>) -> Self
    {
        Self { index: index.clone(), values: vec![0.0; index.len()] }
    }

    /// Expects an `n x 1` matrix with `n` the extent of `index`
    pub fn from_triplets(
        name: &str,
        index: &Arc<CompositeIndex>,
        triplets: Triplets
    ) -> Result<Self, ModelError>
    {
        let entries = triplets.into_clean_entries(name, (index.len(), 1))?;
        let mut values = vec![0.0; index.len()];
        for ((row, _), v) in entries {
            values[row] = v;
        }
        Ok(Self { index: index.clone(), values })
    }

    pub fn index(&self) -> &Arc<CompositeIndex>
    {
        &self.index
    }

    pub fn as_slice(&self) -> &[f64]
    {
        &self.values
    }

    pub fn len(&self) -> usize
    {
        self.values.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool
    {
        self.values.is_empty()
    }

    pub fn nnz(&self) -> usize
    {
        self.values.iter().filter(|v| **v != 0.0).count()
    }
}

/// CSR matrix mapping the `cols` domain onto the `rows` domain
#[derive(Clone, Debug)]
pub struct SparseOperator{
    name: String,
    rows: Arc<CompositeIndex>,
    cols: Arc<CompositeIndex>,
    matrix: CsMat<f64>
}

impl SparseOperator{
    pub fn from_triplets(
        name: &str,
        rows: &Arc<CompositeIndex>,
        cols: &Arc<CompositeIndex>,
        triplets: Triplets
    ) -> Result<Self, ModelError>
    {
        let shape = (rows.len(), cols.len());
        let entries = triplets.into_clean_entries(name, shape)?;
        let mut tri = TriMat::with_capacity(shape, entries.len());
        for ((row, col), v) in entries {
            tri.add_triplet(row, col, v);
        }
        Ok(
            Self {
                name: name.to_owned(),
                rows: rows.clone(),
                cols: cols.clone(),
                matrix: tri.to_csr()
            }
        )
    }

    pub fn name(&self) -> &str
    {
        &self.name
    }

    pub fn rows(&self) -> &Arc<CompositeIndex>
    {
        &self.rows
    }

    pub fn cols(&self) -> &Arc<CompositeIndex>
    {
        &self.cols
    }

    pub fn nnz(&self) -> usize
    {
        self.matrix.nnz()
    }

    /// `out[r] += sum_c M[r, c] * x[c]`
    #[inline]
    pub fn mul_acc(&self, x: &[f64], out: &mut [f64])
    {
        debug_assert_eq!(x.len(), self.matrix.cols());
        debug_assert_eq!(out.len(), self.matrix.rows());
        for (row, vec) in self.matrix.outer_iterator().enumerate(){
            let dot = vec.iter()
                .fold(0.0, |acc, (col, v)| acc + v * x[col]);
            out[row] += dot;
        }
    }

    /// `M * 1`
    pub fn row_sums(&self) -> Vec<f64>
    {
        self.matrix
            .outer_iterator()
            .map(|vec| vec.iter().fold(0.0, |acc, (_, v)| acc + v))
            .collect()
    }
}

/// Raw operator input, aligned to the catalog by position only.
#[derive(Clone, Debug, Default)]
pub struct RawOperators{
    pub x0: Triplets,
    pub start_stock: Triplets,
    pub eta_prod: Triplets,
    pub eta_exp: Triplets,
    pub nu: Triplets,
    pub alpha: Triplets,
    pub beta: Triplets,
    pub trade: Triplets
}

/// Typed operators, each already bound to a composite index.
#[derive(Clone, Debug)]
pub struct OperatorParts{
    pub x0: DomainVector,
    pub start_stock: DomainVector,
    pub eta_prod: DomainVector,
    pub eta_exp: DomainVector,
    pub nu: SparseOperator,
    pub alpha: SparseOperator,
    pub beta: SparseOperator,
    pub trade: SparseOperator
}

/// Fixed linear maps and vectors of one simulation step.
///
/// Every part shares the composite indices of one catalog.
#[derive(Clone, Debug)]
pub struct NetworkOperators{
    index: Arc<CompositeIndex>,
    process_index: Arc<CompositeIndex>,
    x0: DomainVector,
    start_stock: DomainVector,
    eta_prod: DomainVector,
    eta_exp: DomainVector,
    nu: SparseOperator,
    alpha: SparseOperator,
    beta: SparseOperator,
    trade: SparseOperator,
    /// `beta * one_vec`, constant output of the non-converting processes
    beta_output: Vec<f64>
}

fn check_vector(name: &str, v: &DomainVector, index: &CompositeIndex) -> Result<(), ModelError>
{
    if v.index().is_compatible(index){
        Ok(())
    } else {
        Err(ModelError::IndexMismatch { operator: name.to_owned() })
    }
}

fn check_operator(
    op: &SparseOperator,
    rows: &CompositeIndex,
    cols: &CompositeIndex
) -> Result<(), ModelError>
{
    if op.rows().is_compatible(rows) && op.cols().is_compatible(cols){
        Ok(())
    } else {
        Err(ModelError::IndexMismatch { operator: op.name().to_owned() })
    }
}

impl NetworkOperators{
    pub fn from_raw(catalog: &Catalog, raw: RawOperators) -> Result<Self, ModelError>
    {
        let ci = catalog.country_item();
        let cp = catalog.country_process();
        let parts = OperatorParts{
            x0: DomainVector::from_triplets("x0", ci, raw.x0)?,
            start_stock: DomainVector::from_triplets("xstartstock", ci, raw.start_stock)?,
            eta_prod: DomainVector::from_triplets("eta_prod", ci, raw.eta_prod)?,
            eta_exp: DomainVector::from_triplets("eta_exp", ci, raw.eta_exp)?,
            nu: SparseOperator::from_triplets("nu", cp, ci, raw.nu)?,
            alpha: SparseOperator::from_triplets("alpha", ci, cp, raw.alpha)?,
            beta: SparseOperator::from_triplets("beta", ci, cp, raw.beta)?,
            trade: SparseOperator::from_triplets("trade", ci, ci, raw.trade)?
        };
        Self::new(catalog, parts)
    }

    /// Rejects parts that were built against another catalog ordering
    pub fn new(catalog: &Catalog, parts: OperatorParts) -> Result<Self, ModelError>
    {
        let ci = catalog.country_item();
        let cp = catalog.country_process();

        check_vector("x0", &parts.x0, ci)?;
        check_vector("xstartstock", &parts.start_stock, ci)?;
        check_vector("eta_prod", &parts.eta_prod, ci)?;
        check_vector("eta_exp", &parts.eta_exp, ci)?;
        check_operator(&parts.nu, cp, ci)?;
        check_operator(&parts.alpha, ci, cp)?;
        check_operator(&parts.beta, ci, cp)?;
        check_operator(&parts.trade, ci, ci)?;

        let beta_output = parts.beta.row_sums();

        Ok(
            Self {
                index: ci.clone(),
                process_index: cp.clone(),
                x0: parts.x0,
                start_stock: parts.start_stock,
                eta_prod: parts.eta_prod,
                eta_exp: parts.eta_exp,
                nu: parts.nu,
                alpha: parts.alpha,
                beta: parts.beta,
                trade: parts.trade,
                beta_output
            }
        )
    }

    pub fn index(&self) -> &Arc<CompositeIndex>
    {
        &self.index
    }

    pub fn process_index(&self) -> &Arc<CompositeIndex>
    {
        &self.process_index
    }

    pub fn x0(&self) -> &DomainVector
    {
        &self.x0
    }

    pub fn start_stock(&self) -> &DomainVector
    {
        &self.start_stock
    }

    pub fn eta_prod(&self) -> &DomainVector
    {
        &self.eta_prod
    }

    pub fn eta_exp(&self) -> &DomainVector
    {
        &self.eta_exp
    }

    pub fn nu(&self) -> &SparseOperator
    {
        &self.nu
    }

    pub fn alpha(&self) -> &SparseOperator
    {
        &self.alpha
    }

    pub fn trade(&self) -> &SparseOperator
    {
        &self.trade
    }

    pub fn beta_output(&self) -> &[f64]
    {
        &self.beta_output
    }

    /// Non-zero counts of all sparse parts, for reporting
    pub fn nnz_summary(&self) -> [(&str, usize); 8]
    {
        [
            ("x0", self.x0.nnz()),
            ("xstartstock", self.start_stock.nnz()),
            ("eta_prod", self.eta_prod.nnz()),
            ("eta_exp", self.eta_exp.nnz()),
            (self.nu.name(), self.nu.nnz()),
            (self.alpha.name(), self.alpha.nnz()),
            (self.beta.name(), self.beta.nnz()),
            (self.trade.name(), self.trade.nnz())
        ]
    }

    /// True for every (country, item) with `(alpha * 1 + beta * 1) > 0`
    pub fn producer_flag(&self) -> Vec<bool>
    {
        self.alpha
            .row_sums()
            .into_iter()
            .zip(self.beta_output.iter())
            .map(|(a, b)| a + b > 0.0)
            .collect()
    }

    /// Whether any item of `country` has a positive producer flag
    pub fn is_producer(&self, producer_flag: &[bool], country: usize) -> bool
    {
        producer_flag[self.index.country_range(country)]
            .iter()
            .any(|&p| p)
    }
}
