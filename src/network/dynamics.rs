use {
    std::ops::Range,
    super::{
        catalog::Catalog,
        error::ModelError,
        operators::{DomainVector, FlowVector, NetworkOperators}
    }
};

/// Default number of iterations
pub const DEFAULT_TAU: usize = 10;

/// Whether the one-time start stock is injected in this step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepPhase{
    FirstStep,
    SubsequentStep
}

impl StepPhase{
    pub fn of_step(t: usize) -> Self
    {
        if t == 0 {
            Self::FirstStep
        } else {
            Self::SubsequentStep
        }
    }

    pub fn injects_start_stock(self) -> bool
    {
        matches!(self, Self::FirstStep)
    }
}

/// Total loss of the production capacity of one country
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shock{
    country: usize,
    range: Range<usize>
}

impl Shock{
    #[cfg(test)]
    pub fn new(catalog: &Catalog, country: &str) -> Result<Self, ModelError>
    {
        let idx = catalog.country_index(country)?;
        Ok(Self::from_index(catalog, idx))
    }

    pub fn from_index(catalog: &Catalog, country: usize) -> Self
    {
        Self{
            country,
            range: catalog.country_item().country_range(country)
        }
    }

    pub fn country(&self) -> usize
    {
        self.country
    }

    /// Positions `(country, *)` forced to zero
    pub fn range(&self) -> Range<usize>
    {
        self.range.clone()
    }
}

/// Scratch buffers reused across steps of one run
struct Workspace{
    allocated: Vec<f64>,
    process_input: Vec<f64>
}

/// Iterates the production and trade dynamics on shared, read-only operators.
///
/// One step is
/// `o = alpha * (nu * (eta_prod . x)) + beta * 1`, start stock added in the first step,
/// the shocked range of `o` set to zero, and finally `x' = o + T * (eta_exp . x)`.
#[derive(Clone, Copy)]
pub struct Dynamics<'a>{
    operators: &'a NetworkOperators
}

impl<'a> Dynamics<'a>{
    pub fn new(operators: &'a NetworkOperators) -> Self
    {
        Self { operators }
    }

    fn workspace(&self) -> Workspace
    {
        Workspace {
            allocated: vec![0.0; self.operators.index().len()],
            process_input: vec![0.0; self.operators.process_index().len()]
        }
    }

    /// Single step from `x` into `next`, which gets overwritten
    fn step_into(
        &self,
        x: &[f64],
        next: &mut [f64],
        phase: StepPhase,
        shock: Option<&Shock>,
        ws: &mut Workspace
    )
    {
        let ops = self.operators;

        // production
        ws.allocated
            .iter_mut()
            .zip(ops.eta_prod().as_slice())
            .zip(x)
            .for_each(|((a, eta), x)| *a = eta * x);
        ws.process_input.fill(0.0);
        ops.nu().mul_acc(&ws.allocated, &mut ws.process_input);

        next.copy_from_slice(ops.beta_output());
        ops.alpha().mul_acc(&ws.process_input, next);

        if phase.injects_start_stock(){
            next.iter_mut()
                .zip(ops.start_stock().as_slice())
                .for_each(|(n, s)| *n += s);
        }

        if let Some(shock) = shock{
            next[shock.range()].fill(0.0);
        }

        // trade
        ws.allocated
            .iter_mut()
            .zip(ops.eta_exp().as_slice())
            .zip(x)
            .for_each(|((a, eta), x)| *a = eta * x);
        ops.trade().mul_acc(&ws.allocated, next);
    }

    /// One application of the step function
    #[allow(dead_code)]
    pub fn step(
        &self,
        x: &FlowVector,
        phase: StepPhase,
        shock: Option<&Shock>
    ) -> Result<FlowVector, ModelError>
    {
        if !x.index().is_compatible(self.operators.index()){
            return Err(ModelError::IndexMismatch { operator: "flow vector".to_owned() });
        }
        let mut ws = self.workspace();
        let mut next = vec![0.0; x.len()];
        self.step_into(x.as_slice(), &mut next, phase, shock, &mut ws);
        DomainVector::new(x.index(), next)
    }

    /// Flow vector after exactly `tau` steps starting from `x0`
    pub fn run_from(
        &self,
        x0: &FlowVector,
        tau: usize,
        shock: Option<&Shock>
    ) -> Result<FlowVector, ModelError>
    {
        if !x0.index().is_compatible(self.operators.index()){
            return Err(ModelError::IndexMismatch { operator: "initial condition".to_owned() });
        }
        if let Some(shock) = shock{
            tracing::debug!(country = shock.country(), tau, "shocked run");
        }
        let mut ws = self.workspace();
        let mut current = x0.as_slice().to_vec();
        let mut next = vec![0.0; current.len()];
        for t in 0..tau{
            self.step_into(&current, &mut next, StepPhase::of_step(t), shock, &mut ws);
            std::mem::swap(&mut current, &mut next);
        }
        DomainVector::new(x0.index(), current)
    }

    /// Flow vector after `tau` steps starting from the stored initial condition
    pub fn run(&self, tau: usize, shock: Option<&Shock>) -> Result<FlowVector, ModelError>
    {
        self.run_from(self.operators.x0(), tau, shock)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::network::{
        catalog::tests::{info, strings},
        operators::{Triplets, RawOperators, tests::identity}
    };

    /// Two countries, one item, one process.
    /// A feeds itself through process 0, B has no production and no trade edge.
    pub fn two_country_model() -> (Catalog, NetworkOperators)
    {
        let catalog = Catalog::new(
            strings(&["A", "B"]),
            strings(&["Grain"]),
            strings(&["Farm"]),
            vec![info("A", "North", "AAA"), info("B", "South", "BBB")]
        ).unwrap();
        let mut alpha = Triplets::new(2, 2);
        alpha.push(0, 0, 1.0);
        let mut nu = Triplets::new(2, 2);
        nu.push(0, 0, 1.0);
        let raw = RawOperators{
            x0: Triplets::column(&[10.0, 0.0]),
            start_stock: Triplets::new(2, 1),
            eta_prod: Triplets::column(&[1.0, 0.0]),
            eta_exp: Triplets::new(2, 1),
            nu,
            alpha,
            beta: Triplets::new(2, 2),
            trade: identity(2)
        };
        let ops = NetworkOperators::from_raw(&catalog, raw).unwrap();
        (catalog, ops)
    }

    /// Three countries, two items, with trade, a non-converting process and start stock.
    pub fn trading_model() -> (Catalog, NetworkOperators)
    {
        let catalog = Catalog::new(
            strings(&["A", "B", "C"]),
            strings(&["Wheat", "Flour"]),
            strings(&["Mill", "Field"]),
            vec![
                info("A", "Europe", "AAA"),
                info("B", "Europe", "BBB"),
                info("C", "Asia", "CCC")
            ]
        ).unwrap();
        // process positions: A.Mill 0, A.Field 1, B.Mill 2, B.Field 3, C.Mill 4, C.Field 5
        // item positions: A.Wheat 0, A.Flour 1, B.Wheat 2, B.Flour 3, C.Wheat 4, C.Flour 5
        let mut nu = Triplets::new(6, 6);
        nu.push(0, 0, 0.5);
        nu.push(2, 2, 0.5);
        nu.push(4, 4, 0.5);
        let mut alpha = Triplets::new(6, 6);
        alpha.push(1, 0, 0.8);
        alpha.push(3, 2, 0.8);
        alpha.push(5, 4, 0.8);
        let mut beta = Triplets::new(6, 6);
        beta.push(0, 1, 4.0);
        beta.push(4, 5, 1.0);
        let mut trade = Triplets::new(6, 6);
        // A exports wheat to B and C, B exports flour to C
        trade.push(2, 0, 0.6);
        trade.push(4, 0, 0.4);
        trade.push(5, 3, 1.0);
        let raw = RawOperators{
            x0: Triplets::column(&[4.0, 1.0, 2.0, 0.5, 1.0, 0.0]),
            start_stock: Triplets::column(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            eta_prod: Triplets::column(&[0.5, 0.0, 1.0, 0.0, 1.0, 0.0]),
            eta_exp: Triplets::column(&[0.5, 0.0, 0.0, 1.0, 0.0, 0.0]),
            nu,
            alpha,
            beta,
            trade
        };
        let ops = NetworkOperators::from_raw(&catalog, raw).unwrap();
        (catalog, ops)
    }

    #[test]
    fn self_sustaining_loop()
    {
        let (catalog, ops) = two_country_model();
        let dynamics = Dynamics::new(&ops);
        for tau in 1..=3 {
            let x = dynamics.run(tau, None).unwrap();
            assert_eq!(x.as_slice(), &[10.0, 0.0]);
        }

        let shock = Shock::new(&catalog, "A").unwrap();
        for tau in 1..=3 {
            let x = dynamics.run(tau, Some(&shock)).unwrap();
            assert_eq!(x.as_slice(), &[0.0, 0.0]);
        }
    }

    #[test]
    fn zero_steps_return_initial_condition()
    {
        let (catalog, ops) = trading_model();
        let dynamics = Dynamics::new(&ops);
        let shock = Shock::new(&catalog, "B").unwrap();
        assert_eq!(&dynamics.run(0, None).unwrap(), ops.x0());
        assert_eq!(&dynamics.run(0, Some(&shock)).unwrap(), ops.x0());
    }

    #[test]
    fn single_step_by_hand()
    {
        let (_, ops) = trading_model();
        let dynamics = Dynamics::new(&ops);
        let x = dynamics.step(ops.x0(), StepPhase::FirstStep, None).unwrap();
        // A.Wheat: beta 4 + start stock 1
        // A.Flour: 0.8 * 0.5 * (0.5 * 4)
        // B.Wheat: trade 0.6 * 0.5 * 4
        // B.Flour: 0.8 * 0.5 * 2
        // C.Wheat: beta 1 + trade 0.4 * 0.5 * 4
        // C.Flour: 0.8 * 0.5 * 1 + B.Flour export 0.5
        let expected = [5.0, 0.8, 1.2, 0.8, 1.8, 0.9];
        for (got, want) in x.as_slice().iter().zip(expected){
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }

        let later = dynamics.step(ops.x0(), StepPhase::SubsequentStep, None).unwrap();
        assert!((later.as_slice()[0] - 4.0).abs() < 1e-12);
        assert_eq!(&later.as_slice()[1..], &x.as_slice()[1..]);
    }

    #[test]
    fn shock_zeroes_production_but_not_trade()
    {
        let (catalog, ops) = trading_model();
        let dynamics = Dynamics::new(&ops);
        let shock = Shock::new(&catalog, "C").unwrap();
        let x = dynamics.step(ops.x0(), StepPhase::FirstStep, Some(&shock)).unwrap();
        // C keeps only what is imported
        assert!((x.as_slice()[4] - 0.8).abs() < 1e-12);
        assert!((x.as_slice()[5] - 0.5).abs() < 1e-12);
        let unshocked = dynamics.step(ops.x0(), StepPhase::FirstStep, None).unwrap();
        assert_eq!(&x.as_slice()[..4], &unshocked.as_slice()[..4]);
    }

    #[test]
    fn start_stock_is_injected_once()
    {
        let (_, ops) = trading_model();
        let dynamics = Dynamics::new(&ops);
        let mut manual = ops.x0().clone();
        for t in 0..4 {
            manual = dynamics.step(&manual, StepPhase::of_step(t), None).unwrap();
        }
        assert_eq!(manual, dynamics.run(4, None).unwrap());
        assert_eq!(manual, dynamics.run_from(ops.x0(), 4, None).unwrap());
    }

    #[test]
    fn repeated_runs_are_identical()
    {
        let (catalog, ops) = trading_model();
        let dynamics = Dynamics::new(&ops);
        assert_eq!(dynamics.run(1, None).unwrap(), dynamics.run(1, None).unwrap());
        let shock = Shock::new(&catalog, "A").unwrap();
        assert_eq!(dynamics.run(7, Some(&shock)).unwrap(), dynamics.run(7, Some(&shock)).unwrap());
    }

    #[test]
    fn shocking_a_non_producer_changes_nothing()
    {
        let (catalog, ops) = trading_model();
        let flags = ops.producer_flag();
        let b = catalog.country_index("B").unwrap();
        // B has neither alpha nor beta output for wheat, but mills flour
        assert!(ops.is_producer(&flags, b));

        let (catalog, ops) = two_country_model();
        let flags = ops.producer_flag();
        let b = catalog.country_index("B").unwrap();
        assert!(!ops.is_producer(&flags, b));
        let dynamics = Dynamics::new(&ops);
        let shock = Shock::from_index(&catalog, b);
        for tau in 0..6 {
            let plain = dynamics.run(tau, None).unwrap();
            let shocked = dynamics.run(tau, Some(&shock)).unwrap();
            assert!(
                plain.as_slice()
                    .iter()
                    .zip(shocked.as_slice())
                    .all(|(a, b)| a.to_bits() == b.to_bits())
            );
        }
    }

    #[test]
    fn foreign_initial_condition_is_rejected()
    {
        let (_, ops) = trading_model();
        let (other_catalog, _) = two_country_model();
        let dynamics = Dynamics::new(&ops);
        let x = DomainVector::zeros(other_catalog.country_item());
        assert!(matches!(
            dynamics.run_from(&x, 2, None),
            Err(ModelError::IndexMismatch { .. })
        ));
    }

    #[test]
    fn unknown_shock_country()
    {
        let (catalog, _) = two_country_model();
        assert!(Shock::new(&catalog, "Atlantis").unwrap_err().is_data_integrity());
    }
}
