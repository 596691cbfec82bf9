use {
    indicatif::ProgressBar,
    rayon::prelude::*,
    serde::{Serialize, Deserialize},
    super::{
        catalog::Catalog,
        dynamics::{Dynamics, Shock},
        error::ModelError,
        operators::{FlowVector, NetworkOperators}
    }
};

/// Terminal flow of one shock-origin country
#[derive(Clone, Debug, PartialEq)]
pub enum ShockOutcome{
    /// The iteration ran with the country's production zeroed
    Simulated(FlowVector),
    /// The country produces nothing, the shocked flow is the baseline flow
    EqualsBaseline
}

impl ShockOutcome{
    pub fn is_simulated(&self) -> bool
    {
        matches!(self, Self::Simulated(_))
    }

    /// The flow vector this outcome stands for
    pub fn resolve<'a>(&'a self, baseline: &'a FlowVector) -> &'a FlowVector
    {
        match self{
            Self::Simulated(flow) => flow,
            Self::EqualsBaseline => baseline
        }
    }
}

/// Baseline flow plus one outcome per shock-origin country, in catalog order
#[derive(Clone, Debug)]
pub struct CampaignResult{
    pub baseline: FlowVector,
    pub shocks: Vec<(usize, ShockOutcome)>
}

impl CampaignResult{
    #[cfg(test)]
    pub fn outcome(&self, country: usize) -> Option<&ShockOutcome>
    {
        self.shocks
            .iter()
            .find(|(c, _)| *c == country)
            .map(|(_, o)| o)
    }

    /// Shocked flow vector of `country`, baseline if it was skipped
    #[cfg(test)]
    pub fn shocked_flow(&self, country: usize) -> Option<&FlowVector>
    {
        self.outcome(country)
            .map(|o| o.resolve(&self.baseline))
    }

    pub fn to_dump(&self, catalog: &Catalog, tau: usize) -> CampaignDump
    {
        let shocks = self.shocks
            .iter()
            .map(
                |(c, outcome)|
                {
                    let stored = match outcome{
                        ShockOutcome::Simulated(flow) => StoredOutcome::Simulated(flow.as_slice().to_vec()),
                        ShockOutcome::EqualsBaseline => StoredOutcome::EqualsBaseline
                    };
                    (catalog.countries()[*c].clone(), stored)
                }
            ).collect();
        CampaignDump {
            version: crate::misc::VERSION.to_owned(),
            tau,
            countries: catalog.countries().to_vec(),
            items: catalog.items().to_vec(),
            baseline: self.baseline.as_slice().to_vec(),
            shocks
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum StoredOutcome{
    Simulated(Vec<f64>),
    EqualsBaseline
}

/// Serializable form of a whole campaign, labels included
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CampaignDump{
    pub version: String,
    pub tau: usize,
    pub countries: Vec<String>,
    pub items: Vec<String>,
    pub baseline: Vec<f64>,
    pub shocks: Vec<(String, StoredOutcome)>
}

/// Runs one baseline simulation and one shocked simulation per country.
pub struct Campaign<'a>{
    catalog: &'a Catalog,
    operators: &'a NetworkOperators,
    tau: usize,
    producer_flag: Vec<bool>
}

impl<'a> Campaign<'a>{
    pub fn new(catalog: &'a Catalog, operators: &'a NetworkOperators, tau: usize) -> Self
    {
        Self {
            catalog,
            operators,
            tau,
            producer_flag: operators.producer_flag()
        }
    }

    pub fn tau(&self) -> usize
    {
        self.tau
    }

    pub fn is_producer(&self, country: usize) -> bool
    {
        self.operators.is_producer(&self.producer_flag, country)
    }

    pub fn baseline(&self) -> Result<FlowVector, ModelError>
    {
        Dynamics::new(self.operators).run(self.tau, None)
    }

    /// A country without any production is never simulated, its outcome is the baseline.
    ///
    /// Running the engine anyway would not be shock-free for such a country:
    /// the shock zeroes its output range at every step, including the start stock
    /// added in the first step, so a non-zero start stock would be lost.
    pub fn shock(&self, country: usize) -> Result<ShockOutcome, ModelError>
    {
        if !self.is_producer(country){
            return Ok(ShockOutcome::EqualsBaseline);
        }
        let shock = Shock::from_index(self.catalog, country);
        Dynamics::new(self.operators)
            .run(self.tau, Some(&shock))
            .map(ShockOutcome::Simulated)
    }

    /// Baseline and shocks for `countries`.
    ///
    /// Shock runs are independent and executed on the current rayon pool,
    /// the result keeps the order of `countries`.
    pub fn run(&self, countries: &[usize], bar: Option<&ProgressBar>) -> Result<CampaignResult, ModelError>
    {
        let baseline = self.baseline()?;
        tracing::info!(tau = self.tau, "baseline scenario done");

        let shocks = countries
            .par_iter()
            .map(
                |&country|
                {
                    let outcome = self.shock(country);
                    if let Some(bar) = bar{
                        bar.inc(1);
                    }
                    outcome.map(|o| (country, o))
                }
            ).collect::<Result<Vec<_>, _>>()?;

        let simulated = shocks.iter()
            .filter(|(_, o)| o.is_simulated())
            .count();
        tracing::info!(
            simulated,
            skipped = shocks.len() - simulated,
            "shocked scenarios done"
        );

        Ok(CampaignResult { baseline, shocks })
    }

    /// Every country of the catalog as shock origin
    pub fn run_all(&self, bar: Option<&ProgressBar>) -> Result<CampaignResult, ModelError>
    {
        let all: Vec<usize> = (0..self.catalog.countries().len()).collect();
        self.run(&all, bar)
    }
}
