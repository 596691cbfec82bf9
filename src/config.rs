use std::num::NonZeroUsize;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use derivative::Derivative;
use serde::{Serialize, Deserialize};
use strum::{EnumString, Display};
use crate::network::{RegionExclusion, DEFAULT_TAU};

/// How the whole campaign result is additionally stored
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
pub enum DumpFormat{
    #[default]
    #[strum(ascii_case_insensitive)]
    None,
    #[strum(ascii_case_insensitive)]
    Json,
    #[strum(ascii_case_insensitive)]
    Bincode
}

/// Names of the input files inside the input folder
#[derive(Debug, Clone, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct InputFiles{
    #[derivative(Default(value = "\"country-index.csv\".into()"))]
    pub countries: String,

    #[derivative(Default(value = "\"item-index.csv\".into()"))]
    pub items: String,

    #[derivative(Default(value = "\"process-index.csv\".into()"))]
    pub processes: String,

    #[derivative(Default(value = "\"country-information.csv\".into()"))]
    pub country_information: String,

    /// Column of the country name in the country information table, 0 based
    #[derivative(Default(value = "2"))]
    pub country_name_column: usize,

    #[derivative(Default(value = "\"sparse_x0.mtx\".into()"))]
    pub x0: String,

    #[derivative(Default(value = "\"sparse_startstock.mtx\".into()"))]
    pub start_stock: String,

    #[derivative(Default(value = "\"sparse_eta_prod.mtx\".into()"))]
    pub eta_prod: String,

    #[derivative(Default(value = "\"sparse_eta_exp.mtx\".into()"))]
    pub eta_exp: String,

    #[derivative(Default(value = "\"sparse_nu.mtx\".into()"))]
    pub nu: String,

    #[derivative(Default(value = "\"sparse_alpha.mtx\".into()"))]
    pub alpha: String,

    #[derivative(Default(value = "\"sparse_beta.mtx\".into()"))]
    pub beta: String,

    #[derivative(Default(value = "\"sparse_trade.mtx\".into()"))]
    pub trade: String
}

/// Everything a simulation or relative loss run needs to know
#[derive(Debug, Clone, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct SimulationJob{
    /// Folder containing the index tables and the sparse operators
    #[derivative(Default(value = "\"./input/\".into()"))]
    pub input_folder: Utf8PathBuf,

    /// Folder the flow tables are written to and read from
    #[derivative(Default(value = "\"./complete/\".into()"))]
    pub simulation_folder: Utf8PathBuf,

    /// Folder the relative loss tables are written to
    #[derivative(Default(value = "\"./relative_loss/complete/\".into()"))]
    pub relative_loss_folder: Utf8PathBuf,

    pub input_files: InputFiles,

    /// Number of iterations of the dynamics
    #[derivative(Default(value = "DEFAULT_TAU"))]
    pub tau: usize,

    /// Shock country of the `relative-loss` command
    #[derivative(Default(value = "\"Ukraine\".into()"))]
    pub shock_country: String,

    /// Restrict `run` to these shock countries, all if not given
    pub shock_countries: Option<Vec<String>>,

    /// Label of the shocked item category
    #[derivative(Default(value = "\"complete\".into()"))]
    pub item_category: String,

    /// Which region is not a receiving region
    pub region_exclusion: RegionExclusion,

    /// Size of the rayon pool, rayon decides if not given
    pub threads: Option<NonZeroUsize>,

    /// Store the whole campaign in one additional file
    pub dump: DumpFormat
}

impl SimulationJob{
    pub fn input_path(&self, file: &str) -> Utf8PathBuf
    {
        self.input_folder.join(file)
    }

    pub fn baseline_path(&self) -> Utf8PathBuf
    {
        self.simulation_folder.join("base.csv")
    }

    pub fn shock_path(&self, code: &str) -> Utf8PathBuf
    {
        self.simulation_folder.join(format!("{code}.csv"))
    }

    pub fn relative_loss_path(&self, code: &str) -> Utf8PathBuf
    {
        self.relative_loss_folder.join(format!("RL-{code}.csv"))
    }

    pub fn dump_path(&self) -> Option<Utf8PathBuf>
    {
        let name = match self.dump{
            DumpFormat::None => return None,
            DumpFormat::Json => "campaign.json",
            DumpFormat::Bincode => "campaign.bincode"
        };
        Some(self.simulation_folder.join(name))
    }
}

#[derive(Parser, Debug)]
pub struct JobOpt{
    #[arg(short, long)]
    /// Json file describing the job. Defaults are used if not given
    pub json: Option<Utf8PathBuf>,

    #[arg(long)]
    /// Overwrite the number of iterations
    pub tau: Option<usize>,

    #[arg(short, long)]
    /// Overwrite the number of threads
    pub threads: Option<NonZeroUsize>,

    #[arg(short, long)]
    /// Only print warnings, no progress bar
    pub quiet: bool
}

#[derive(Parser, Debug)]
pub struct RelativeLossOpt{
    #[command(flatten)]
    pub job: JobOpt,

    #[arg(short, long)]
    /// Overwrite the shock country
    pub shock_country: Option<String>,

    #[arg(long)]
    /// Overwrite the region exclusion: last-unique, keep or a region label
    pub region_exclusion: Option<RegionExclusion>
}

#[derive(Parser, Debug)]
pub struct DefaultConfigOpt{
    /// Where to write the default job file
    #[arg(default_value = "job.json")]
    pub out: Utf8PathBuf
}

/// Propagation of a total production shock through the food production and trade network
#[derive(Parser)]
#[command(author, version, about)]
pub enum CmdChooser{
    /// Baseline and one shocked simulation per country, flow tables are written
    Simulate(JobOpt),
    /// Relative loss of one shock country from stored flow tables
    RelativeLoss(RelativeLossOpt),
    /// Simulate and write the relative loss of every shock country
    Run(JobOpt),
    /// Load and validate the input, print some statistics
    Info(JobOpt),
    /// Write a job file with default values
    DefaultConfig(DefaultConfigOpt)
}

impl CmdChooser{
    pub fn quiet(&self) -> bool
    {
        match self{
            Self::Simulate(o) | Self::Run(o) | Self::Info(o) => o.quiet,
            Self::RelativeLoss(o) => o.job.quiet,
            Self::DefaultConfig(_) => false
        }
    }
}

impl JobOpt{
    /// Job file (or defaults) with the command line overwrites applied
    pub fn load(&self) -> anyhow::Result<SimulationJob>
    {
        let mut job: SimulationJob = match self.json.as_deref(){
            Some(path) => read_job(path)?,
            None => SimulationJob::default()
        };
        if let Some(tau) = self.tau{
            job.tau = tau;
        }
        if self.threads.is_some(){
            job.threads = self.threads;
        }
        Ok(job)
    }
}

fn read_job(path: &Utf8Path) -> anyhow::Result<SimulationJob>
{
    crate::misc::read_or_create(path)
}
